// Panel pipeline: load -> filter -> shape, one independent run per panel.
//
// A panel never propagates an error to its neighbours: every failure is
// turned into a `PanelStatus` the front end can show inline.
use crate::cache::TableCache;
use crate::config::{DashboardConfig, DimensionConfig, DimensionTarget, PanelConfig, SelectMode};
use crate::error::{DashboardError, ShapeError};
use crate::filter::{distinct_values, filter, Selection, Selector};
use crate::reports::shape;
use crate::types::{CellValue, ChartRecord, Table};
use crate::util::{natural_cmp, parse_cell};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PanelStatus {
    Rendered {
        chart: ChartRecord,
    },
    /// The selection matched nothing. `fallback` is what the chart shows
    /// anyway, when its spec defines a default.
    NoMatchingData {
        message: String,
        fallback: Option<ChartRecord>,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelOutcome {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub status: PanelStatus,
}

impl PanelOutcome {
    pub fn chart(&self) -> Option<&ChartRecord> {
        match &self.status {
            PanelStatus::Rendered { chart } => Some(chart),
            PanelStatus::NoMatchingData { fallback, .. } => fallback.as_ref(),
            PanelStatus::Failed { .. } => None,
        }
    }
}

/// One configured panel bound to its data directory.
#[derive(Debug, Clone)]
pub struct Panel<'a> {
    config: &'a PanelConfig,
    path: PathBuf,
}

impl<'a> Panel<'a> {
    pub fn new(config: &'a PanelConfig, data_dir: &std::path::Path) -> Self {
        Self {
            path: config.file_path(data_dir),
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    pub fn config(&self) -> &'a PanelConfig {
        self.config
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn load(&self, cache: &TableCache) -> Result<Arc<Table>, DashboardError> {
        Ok(cache.get_or_load(&self.path, &self.config.schema)?)
    }

    /// Values a user may choose for `dim`: the column's distinct values, or
    /// for a column-picking dimension the table's declared value columns.
    pub fn options(&self, table: &Table, dim: &DimensionConfig) -> Vec<CellValue> {
        match dim.target {
            DimensionTarget::Rows => distinct_values(table, &dim.name),
            DimensionTarget::Column => {
                let schema = &self.config.schema;
                let mut values: Vec<CellValue> = schema
                    .numeric_columns
                    .iter()
                    .chain(&schema.percentage_columns)
                    .filter(|c| table.has_column(c))
                    .map(|c| parse_cell(c))
                    .collect();
                values.sort_by(natural_cmp);
                values
            }
        }
    }

    /// Selection each dimension starts with before the user touches it.
    pub fn default_selection(&self, table: &Table) -> Selection {
        let mut selection = Selection::new();
        for dim in &self.config.dimensions {
            let options = self.options(table, dim);
            let selector = match (dim.default.as_deref(), dim.mode) {
                (Some("all"), _) | (None, SelectMode::Multi) => Selector::AnyOf(options),
                (Some("last"), SelectMode::Multi) => {
                    Selector::AnyOf(options.last().cloned().into_iter().collect())
                }
                (Some("first"), SelectMode::Multi) => {
                    Selector::AnyOf(options.first().cloned().into_iter().collect())
                }
                (Some("last"), SelectMode::Single) => match options.last() {
                    Some(v) => Selector::One(v.clone()),
                    None => continue,
                },
                (Some("first"), SelectMode::Single) | (None, SelectMode::Single) => {
                    match options.first() {
                        Some(v) => Selector::One(v.clone()),
                        None => continue,
                    }
                }
                (Some(literal), SelectMode::Single) => Selector::One(parse_cell(literal)),
                (Some(literal), SelectMode::Multi) => Selector::AnyOf(vec![parse_cell(literal)]),
            };
            selection.insert(dim.name.clone(), selector);
        }
        selection
    }

    /// The part of `selection` that filters rows (column-picking
    /// dimensions removed).
    pub fn row_selection(&self, selection: &Selection) -> Selection {
        selection
            .iter()
            .filter(|(name, _)| {
                self.config
                    .dimension(name)
                    .map(|d| d.target == DimensionTarget::Rows)
                    .unwrap_or(true)
            })
            .map(|(name, sel)| (name.clone(), sel.clone()))
            .collect()
    }

    /// Run the pipeline. Never fails: errors become [`PanelStatus::Failed`].
    pub fn render(&self, cache: &TableCache, selection: &Selection) -> PanelOutcome {
        let status = match self.run(cache, selection) {
            Ok(status) => status,
            Err(e) => {
                warn!("panel '{}' failed: {}", self.config.id, e);
                PanelStatus::Failed {
                    message: e.to_string(),
                }
            }
        };
        PanelOutcome {
            id: self.config.id.clone(),
            title: self.config.title.clone(),
            status,
        }
    }

    /// Render with each dimension at its default.
    pub fn render_default(&self, cache: &TableCache) -> PanelOutcome {
        match self.load(cache) {
            Ok(table) => {
                let selection = self.default_selection(&table);
                self.render(cache, &selection)
            }
            Err(e) => {
                warn!("panel '{}' failed: {}", self.config.id, e);
                PanelOutcome {
                    id: self.config.id.clone(),
                    title: self.config.title.clone(),
                    status: PanelStatus::Failed {
                        message: e.to_string(),
                    },
                }
            }
        }
    }

    fn run(&self, cache: &TableCache, selection: &Selection) -> Result<PanelStatus, DashboardError> {
        let table = self.load(cache)?;

        let mut vars = HashMap::new();
        for (name, selector) in selection {
            if let Some(value) = selector.single() {
                vars.insert(name.clone(), value.to_string());
            }
        }

        for dim in self.config.dimensions.iter().filter(|d| d.target == DimensionTarget::Column) {
            let column = vars
                .get(&dim.name)
                .ok_or_else(|| ShapeError::MissingSelection(dim.name.clone()))?;
            if !table.has_column(column) {
                return Ok(PanelStatus::NoMatchingData {
                    message: format!("Data for {} {} is not available.", dim.name, column),
                    fallback: None,
                });
            }
        }

        let spec = self.config.chart.with_vars(&vars);
        let rows = self.row_selection(selection);
        let subset = filter(&table, &rows);
        if subset.is_empty() {
            info!("panel '{}': no rows for {}", self.config.id, describe(&rows));
            return Ok(PanelStatus::NoMatchingData {
                message: format!("No data found for {}.", describe(&rows)),
                fallback: spec.empty_fallback(),
            });
        }

        let chart = shape(&subset, &spec)?;
        Ok(PanelStatus::Rendered { chart })
    }
}

fn describe(selection: &Selection) -> String {
    if selection.is_empty() {
        return "the current selection".to_string();
    }
    selection
        .iter()
        .map(|(name, selector)| match selector {
            Selector::One(v) => format!("{name} = {v}"),
            Selector::AnyOf(vs) => {
                let vs: Vec<String> = vs.iter().map(|v| v.to_string()).collect();
                format!("{name} in [{}]", vs.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every configured panel, rendered independently.
#[derive(Debug, Clone)]
pub struct Dashboard {
    config: DashboardConfig,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn panels(&self) -> Vec<Panel<'_>> {
        self.config
            .panels
            .iter()
            .map(|p| Panel::new(p, &self.config.data_dir))
            .collect()
    }

    pub fn panel(&self, id: &str) -> Option<Panel<'_>> {
        self.panels().into_iter().find(|p| p.id() == id)
    }

    /// Render each panel with its entry in `selections`, or with its
    /// defaults when it has none. One panel failing leaves the rest intact.
    pub fn render_all(
        &self,
        cache: &TableCache,
        selections: &HashMap<String, Selection>,
    ) -> Vec<PanelOutcome> {
        self.panels()
            .iter()
            .map(|panel| match selections.get(panel.id()) {
                Some(selection) => panel.render(cache, selection),
                None => panel.render_default(cache),
            })
            .collect()
    }
}
