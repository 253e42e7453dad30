use crate::error::DashboardError;
use crate::reports::ChartSpec;
use crate::types::TableSchema;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub panels: Vec<PanelConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PanelConfig {
    pub id: String,
    pub title: String,
    /// File name, relative to `data_dir` unless absolute.
    pub file: PathBuf,
    #[serde(default)]
    pub schema: TableSchema,
    #[serde(default)]
    pub dimensions: Vec<DimensionConfig>,
    pub chart: ChartSpec,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DimensionConfig {
    pub name: String,
    #[serde(default)]
    pub mode: SelectMode,
    /// `first`, `last`, `all`, or a literal value.
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub target: DimensionTarget,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectMode {
    #[default]
    Single,
    Multi,
}

/// What a selected value picks: matching rows, or the value column itself
/// (a region-by-year grid where each year is a column).
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DimensionTarget {
    #[default]
    Rows,
    Column,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl PanelConfig {
    pub fn file_path(&self, data_dir: &Path) -> PathBuf {
        if self.file.is_absolute() {
            self.file.clone()
        } else {
            data_dir.join(&self.file)
        }
    }

    pub fn dimension(&self, name: &str) -> Option<&DimensionConfig> {
        self.dimensions.iter().find(|d| d.name == name)
    }
}

impl DashboardConfig {
    /// Reject configurations a panel could never render from.
    pub fn validate(&self) -> Result<(), DashboardError> {
        let mut ids = HashSet::new();
        for panel in &self.panels {
            let invalid = |reason: String| DashboardError::InvalidPanel {
                panel: panel.id.clone(),
                reason,
            };
            if !ids.insert(panel.id.as_str()) {
                return Err(invalid("duplicate panel id".to_string()));
            }
            for dim in &panel.dimensions {
                if dim.target == DimensionTarget::Column && dim.mode == SelectMode::Multi {
                    return Err(invalid(format!(
                        "dimension '{}' selects a column and must be single-select",
                        dim.name
                    )));
                }
            }
            if panel.chart.columns().is_empty() {
                return Err(invalid("chart reads no columns".to_string()));
            }
        }
        Ok(())
    }
}

/// Load the dashboard description from `path` (extension optional), with
/// `DASHBOARD_*` environment variables layered on top.
pub fn load_dashboard_config(path: &str) -> Result<DashboardConfig, DashboardError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(config::Environment::with_prefix("DASHBOARD"))
        .build()?;

    let dashboard: DashboardConfig = settings.try_deserialize()?;
    dashboard.validate()?;
    Ok(dashboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> DashboardConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    const GAUGE: &str = r#"
        data_dir = "fixtures"

        [[panels]]
        id = "trips"
        title = "Trips"
        file = "voyages.csv"
        schema = { required_columns = ["Année", "Mois"], numeric_columns = ["Voyages"] }
        dimensions = [{ name = "Année", default = "last" }, { name = "Mois" }]
        chart = { kind = "scalar", column = "Voyages", label = "Nombre de voyages", default = 0.0 }
    "#;

    #[test]
    fn test_parse_panel() {
        let cfg = parse(GAUGE);
        assert_eq!(cfg.data_dir, PathBuf::from("fixtures"));
        let panel = &cfg.panels[0];
        assert_eq!(panel.schema.numeric_columns, ["Voyages"]);
        assert_eq!(panel.dimensions[0].default.as_deref(), Some("last"));
        assert_eq!(panel.dimensions[1].mode, SelectMode::Single);
        assert_eq!(panel.dimensions[1].target, DimensionTarget::Rows);
        assert_eq!(
            panel.chart,
            ChartSpec::Scalar {
                column: "Voyages".into(),
                label: Some("Nombre de voyages".into()),
                default: 0.0,
            }
        );
        assert_eq!(
            panel.file_path(&cfg.data_dir),
            PathBuf::from("fixtures/voyages.csv")
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_duplicate_panel_ids_rejected() {
        let mut cfg = parse(GAUGE);
        cfg.panels.push(cfg.panels[0].clone());
        assert!(matches!(
            cfg.validate(),
            Err(DashboardError::InvalidPanel { .. })
        ));
    }

    #[test]
    fn test_multi_select_column_dimension_rejected() {
        let mut cfg = parse(GAUGE);
        cfg.panels[0].dimensions[0].target = DimensionTarget::Column;
        cfg.panels[0].dimensions[0].mode = SelectMode::Multi;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/dashboard");
        let cfg = load_dashboard_config(path.to_str().unwrap()).unwrap();
        let ids: Vec<&str> = cfg.panels.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["regions", "gender", "transport", "trips", "education", "map"]);
    }
}
