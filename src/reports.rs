use crate::error::ShapeError;
use crate::filter::FilteredSubset;
use crate::types::{CellValue, ChartRecord, MapColumn, NamedValue, Row, SeriesValues};
use crate::util::natural_cmp_keys;
use serde::Deserialize;
use std::collections::HashMap;

/// How a filtered subset is reduced for one chart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    /// One value from the first matching row (gauge).
    Scalar {
        column: String,
        #[serde(default)]
        label: Option<String>,
        /// Reading used when nothing matches or the cell is blank.
        #[serde(default)]
        default: f64,
    },
    /// Sum of each listed column over all rows (pie).
    CategoricalSums { columns: Vec<String> },
    /// Per-group sums, groups in chronological order (stacked area).
    GroupedSeries {
        group_by: Vec<String>,
        columns: Vec<String>,
    },
    /// One bar per row, labelled by `label_column`, sorted descending (bar).
    Ranking {
        label_column: String,
        value_column: String,
    },
    /// One column per region at its coordinates (geographic column map).
    ColumnMap {
        regions: Vec<RegionSpec>,
        #[serde(default = "default_elevation_scale")]
        elevation_scale: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

fn default_elevation_scale() -> f64 {
    1e4
}

impl ChartSpec {
    /// Copy of the spec with `${name}` placeholders in column names
    /// replaced from `vars`.
    pub fn with_vars(&self, vars: &HashMap<String, String>) -> ChartSpec {
        let expand = |s: &String| prepare_column(s, vars);
        match self {
            ChartSpec::Scalar {
                column,
                label,
                default,
            } => ChartSpec::Scalar {
                column: expand(column),
                label: label.clone(),
                default: *default,
            },
            ChartSpec::CategoricalSums { columns } => ChartSpec::CategoricalSums {
                columns: columns.iter().map(expand).collect(),
            },
            ChartSpec::GroupedSeries { group_by, columns } => ChartSpec::GroupedSeries {
                group_by: group_by.iter().map(expand).collect(),
                columns: columns.iter().map(expand).collect(),
            },
            ChartSpec::Ranking {
                label_column,
                value_column,
            } => ChartSpec::Ranking {
                label_column: expand(label_column),
                value_column: expand(value_column),
            },
            ChartSpec::ColumnMap { .. } => self.clone(),
        }
    }

    /// Every table column the spec reads.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            ChartSpec::Scalar { column, .. } => vec![column.as_str()],
            ChartSpec::CategoricalSums { columns } => columns.iter().map(String::as_str).collect(),
            ChartSpec::GroupedSeries { group_by, columns } => group_by
                .iter()
                .chain(columns)
                .map(String::as_str)
                .collect(),
            ChartSpec::Ranking {
                label_column,
                value_column,
            } => vec![label_column.as_str(), value_column.as_str()],
            ChartSpec::ColumnMap { regions, .. } => {
                regions.iter().map(|r| r.name.as_str()).collect()
            }
        }
    }

    /// Record shown when the selection matched nothing, for specs that
    /// define one (a scalar falls back to its default reading).
    pub fn empty_fallback(&self) -> Option<ChartRecord> {
        match self {
            ChartSpec::Scalar {
                column,
                label,
                default,
            } => Some(ChartRecord::Gauge {
                reading: NamedValue::new(label.clone().unwrap_or_else(|| column.clone()), *default),
            }),
            _ => None,
        }
    }
}

/// Replace `${name}` placeholders with values from `vars`.
pub fn prepare_column(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

/// Reduce a filtered subset into the record `spec` describes.
pub fn shape(subset: &FilteredSubset<'_>, spec: &ChartSpec) -> Result<ChartRecord, ShapeError> {
    let table = subset.table();
    if let Some(missing) = spec.columns().into_iter().find(|c| !table.has_column(c)) {
        return Err(ShapeError::MissingColumn(missing.to_string()));
    }

    match spec {
        ChartSpec::Scalar {
            column,
            label,
            default,
        } => {
            let name = label.clone().unwrap_or_else(|| column.clone());
            let value = match subset.rows().first() {
                Some(row) => numeric(row, column)?.unwrap_or(*default),
                None => *default,
            };
            Ok(ChartRecord::Gauge {
                reading: NamedValue::new(name.clone(), finite(&name, value)?),
            })
        }
        ChartSpec::CategoricalSums { columns } => {
            let slices = columns
                .iter()
                .map(|column| {
                    let total = sum_column(subset.rows(), column)?;
                    Ok(NamedValue::new(column.clone(), finite(column, total)?))
                })
                .collect::<Result<Vec<_>, ShapeError>>()?;
            Ok(ChartRecord::Pie { slices })
        }
        ChartSpec::GroupedSeries { group_by, columns } => grouped_series(subset, group_by, columns),
        ChartSpec::Ranking {
            label_column,
            value_column,
        } => {
            let mut bars = Vec::new();
            for row in subset.rows() {
                let Some(value) = numeric(row, value_column)? else {
                    continue;
                };
                let label = row.get(label_column).map(|v| v.to_string()).unwrap_or_default();
                let value = finite(&label, value)?;
                bars.push(NamedValue::new(label, value));
            }
            bars.sort_by(|a, b| {
                b.value
                    .total_cmp(&a.value)
                    .then_with(|| a.name.cmp(&b.name))
            });
            Ok(ChartRecord::Ranking { bars })
        }
        ChartSpec::ColumnMap {
            regions,
            elevation_scale,
        } => {
            let mut columns = Vec::new();
            if let Some(row) = subset.rows().first() {
                for region in regions {
                    let Some(value) = numeric(row, &region.name)? else {
                        continue;
                    };
                    columns.push(MapColumn {
                        region: region.name.clone(),
                        position: [region.lon, region.lat],
                        value: finite(&region.name, value)?,
                        elevation: finite(&region.name, value * elevation_scale)?,
                    });
                }
            }
            Ok(ChartRecord::ColumnMap { columns })
        }
    }
}

fn grouped_series(
    subset: &FilteredSubset<'_>,
    group_by: &[String],
    columns: &[String],
) -> Result<ChartRecord, ShapeError> {
    let mut groups: Vec<(Vec<CellValue>, Vec<f64>)> = Vec::new();
    for row in subset.rows() {
        let key: Vec<CellValue> = group_by
            .iter()
            .map(|g| row.get(g).cloned().unwrap_or(CellValue::Null))
            .collect();
        let idx = match groups.iter().position(|(k, _)| keys_match(k, &key)) {
            Some(idx) => idx,
            None => {
                groups.push((key, vec![0.0; columns.len()]));
                groups.len() - 1
            }
        };
        for (slot, column) in columns.iter().enumerate() {
            if let Some(v) = numeric(row, column)? {
                groups[idx].1[slot] += v;
            }
        }
    }
    groups.sort_by(|a, b| natural_cmp_keys(&a.0, &b.0));

    let labels = groups
        .iter()
        .map(|(key, _)| {
            key.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect();
    let series = columns
        .iter()
        .enumerate()
        .map(|(slot, column)| {
            let values = groups
                .iter()
                .map(|(_, sums)| finite(column, sums[slot]))
                .collect::<Result<Vec<_>, ShapeError>>()?;
            Ok(SeriesValues {
                name: column.clone(),
                values,
            })
        })
        .collect::<Result<Vec<_>, ShapeError>>()?;
    Ok(ChartRecord::StackedArea {
        groups: labels,
        series,
    })
}

fn keys_match(a: &[CellValue], b: &[CellValue]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
}

fn sum_column(rows: &[&Row], column: &str) -> Result<f64, ShapeError> {
    let mut total = 0.0;
    for row in rows {
        if let Some(v) = numeric(row, column)? {
            total += v;
        }
    }
    Ok(total)
}

/// Numeric content of a cell; `None` for blanks.
fn numeric(row: &Row, column: &str) -> Result<Option<f64>, ShapeError> {
    match row.get(column) {
        None | Some(CellValue::Null) => Ok(None),
        Some(CellValue::Text(s)) => Err(ShapeError::NonNumericCell {
            column: column.to_string(),
            value: s.clone(),
        }),
        Some(v) => Ok(v.as_f64()),
    }
}

fn finite(name: &str, value: f64) -> Result<f64, ShapeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ShapeError::NonFinite {
            name: name.to_string(),
            value,
        })
    }
}
