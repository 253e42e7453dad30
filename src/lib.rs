//! Data pipeline behind the migration dashboard.
//!
//! Each panel runs the same three stages against its own file:
//!
//! ```text
//!  CSV export ──► loader ──► Table ──► filter ──► FilteredSubset ──► reports ──► ChartRecord
//!                   ▲
//!                 cache (one load per file, shared by panels)
//! ```
//!
//! Rendering the records is left to the front end.

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod panel;
pub mod reports;
pub mod types;
pub mod util;

pub use cache::TableCache;
pub use config::{load_dashboard_config, DashboardConfig, PanelConfig};
pub use error::{DashboardError, LoadError, ShapeError};
pub use filter::{distinct_values, filter, FilteredSubset, Selection, Selector};
pub use loader::load_table;
pub use panel::{Dashboard, Panel, PanelOutcome, PanelStatus};
pub use reports::{shape, ChartSpec};
pub use types::{CellValue, ChartRecord, Row, Table, TableSchema};
