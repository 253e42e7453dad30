use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading one tabular file.
///
/// Everything except [`LoadError::NonNumericValue`] is a data source problem:
/// the file is missing, unreadable, or does not have the declared schema.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: column {index} has an empty name", path.display())]
    EmptyColumnName { path: PathBuf, index: usize },

    #[error("{}: duplicate column '{column}'", path.display())]
    DuplicateColumn { path: PathBuf, column: String },

    #[error("{}: missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("{}: row {row}, column '{column}': '{value}' is not {expected}", path.display())]
    NonNumericValue {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },
}

impl LoadError {
    /// `true` for the data-source kind (missing, unreadable, wrong schema).
    pub fn is_data_source(&self) -> bool {
        !matches!(self, LoadError::NonNumericValue { .. })
    }
}

/// Failure while reducing a filtered subset into a chart record.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("column '{0}' is not present in the table")]
    MissingColumn(String),

    #[error("column '{column}' holds non-numeric value '{value}'")]
    NonNumericCell { column: String, value: String },

    #[error("'{name}' evaluates to a non-finite number ({value})")]
    NonFinite { name: String, value: f64 },

    #[error("no value selected for '{0}'")]
    MissingSelection(String),
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid panel '{panel}': {reason}")]
    InvalidPanel { panel: String, reason: String },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
