use crate::error::DashboardError;
use crate::filter::FilteredSubset;
use crate::panel::{PanelOutcome, PanelStatus};
use crate::types::ChartRecord;
use crate::util::{format_number, format_percent};
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table};

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DashboardError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|source| DashboardError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Markdown table of the first `max_rows` rows of a subset.
pub fn preview_rows(subset: &FilteredSubset<'_>, max_rows: usize) -> String {
    if subset.is_empty() {
        return "(no rows)".to_string();
    }
    let columns = subset.table().columns();
    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in subset.rows().iter().take(max_rows) {
        builder.push_record(
            columns
                .iter()
                .map(|c| row.get(c).map(|v| v.to_string()).unwrap_or_default()),
        );
    }
    let mut rendered = builder.build().with(Style::markdown()).to_string();
    if subset.len() > max_rows {
        rendered.push_str(&format!("\n({} more rows)", subset.len() - max_rows));
    }
    rendered
}

/// Console rendering of one panel: its chart values, or the inline message.
pub fn render_outcome(outcome: &PanelOutcome) -> String {
    let mut out = format!("== {} [{}] ==\n", outcome.title, outcome.id);
    match &outcome.status {
        PanelStatus::Rendered { chart } => out.push_str(&render_chart(chart)),
        PanelStatus::NoMatchingData { message, fallback } => {
            out.push_str(&format!("No data: {message}\n"));
            if let Some(chart) = fallback {
                out.push_str(&render_chart(chart));
            }
        }
        PanelStatus::Failed { message } => out.push_str(&format!("Error: {message}\n")),
    }
    out
}

fn render_chart(chart: &ChartRecord) -> String {
    match chart {
        ChartRecord::StackedArea { groups, series } => {
            let mut builder = Builder::default();
            builder.push_record(
                std::iter::once("Group".to_string()).chain(series.iter().map(|s| s.name.clone())),
            );
            for (idx, group) in groups.iter().enumerate() {
                builder.push_record(
                    std::iter::once(group.clone())
                        .chain(series.iter().map(|s| format_number(s.values[idx], 0))),
                );
            }
            format!("{}\n", builder.build().with(Style::markdown()))
        }
        ChartRecord::ColumnMap { columns } => {
            let mut builder = Builder::default();
            builder.push_record(["Region", "Longitude", "Latitude", "Share"]);
            for c in columns {
                builder.push_record([
                    c.region.clone(),
                    format!("{:.4}", c.position[0]),
                    format!("{:.4}", c.position[1]),
                    format_percent(c.value),
                ]);
            }
            format!("{}\n", builder.build().with(Style::markdown()))
        }
        other => {
            let values = other.named_values();
            if values.is_empty() {
                return "(no values)\n".to_string();
            }
            format!("{}\n", Table::new(values).with(Style::markdown()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter, Selection};
    use crate::types::{CellValue, NamedValue, Row};

    #[test]
    fn test_preview_rows_lists_columns() {
        let mut row = Row::new();
        row.insert("Année", CellValue::Integer(2021));
        row.insert("Voyages", CellValue::Integer(42));
        let table = crate::types::Table::from_rows(vec![row.clone(), row]);
        let subset = filter(&table, &Selection::new());
        let text = preview_rows(&subset, 1);
        assert!(text.contains("Année"));
        assert!(text.contains("42"));
        assert!(text.contains("(1 more rows)"));
    }

    #[test]
    fn test_render_failed_outcome_shows_message() {
        let outcome = PanelOutcome {
            id: "trips".into(),
            title: "Trips".into(),
            status: PanelStatus::Failed {
                message: "cannot open voyagefr.csv".into(),
            },
        };
        let text = render_outcome(&outcome);
        assert!(text.contains("Error: cannot open voyagefr.csv"));
    }

    #[test]
    fn test_render_no_data_with_fallback() {
        let outcome = PanelOutcome {
            id: "trips".into(),
            title: "Trips".into(),
            status: PanelStatus::NoMatchingData {
                message: "No data found for Année = 1990.".into(),
                fallback: Some(ChartRecord::Gauge {
                    reading: NamedValue::new("Nombre de voyages", 0.0),
                }),
            },
        };
        let text = render_outcome(&outcome);
        assert!(text.contains("No data: No data found for Année = 1990."));
        assert!(text.contains("Nombre de voyages"));
    }

    #[test]
    fn test_write_json_reports_bad_path() {
        let err = write_json(Path::new("/nonexistent-dir/out.json"), &vec![1, 2]).unwrap_err();
        assert!(matches!(err, DashboardError::Write { .. }));
    }
}
