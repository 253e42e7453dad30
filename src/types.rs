use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tabled::Tabled;

// ---------------------------------------------------------------------------
// CellValue - a single spreadsheet cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell. Integers and floats are one numeric domain:
/// `Integer(2021) == Float(2021.0)`, and ordering puts `Null` first, then
/// numbers, then text.
#[derive(Debug, Clone)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Selection equality: numbers compare numerically, text compares
    /// trimmed, and text that reads as a number matches that number.
    pub fn matches(&self, other: &CellValue) -> bool {
        match (self.numeric_view(), other.numeric_view()) {
            (Some(a), Some(b)) => a.total_cmp(&b) == Ordering::Equal,
            (None, None) => match (self, other) {
                (CellValue::Null, CellValue::Null) => true,
                (CellValue::Text(a), CellValue::Text(b)) => a.trim() == b.trim(),
                _ => false,
            },
            _ => false,
        }
    }

    fn numeric_view(&self) -> Option<f64> {
        match self {
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            other => other.as_f64(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Null => 0,
            CellValue::Integer(_) | CellValue::Float(_) => 1,
            CellValue::Text(_) => 2,
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        let (ra, rb) = (self.rank(), other.rank());
        if ra != rb {
            return ra.cmp(&rb);
        }
        match (self, other) {
            (CellValue::Integer(a), CellValue::Integer(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Null, CellValue::Null) => Ordering::Equal,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => Ordering::Equal,
            },
        }
    }
}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(_) | CellValue::Float(_) => {
                self.as_f64().unwrap_or(0.0).to_bits().hash(state)
            }
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Integer(i as i64)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

// ---------------------------------------------------------------------------
// Row / Table
// ---------------------------------------------------------------------------

/// One spreadsheet row: column name -> value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: BTreeMap<String, CellValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.cells.insert(column.into(), value);
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Declared shape of one input file. Percentage columns are named
/// explicitly rather than guessed from their position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub required_columns: Vec<String>,
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    #[serde(default)]
    pub percentage_columns: Vec<String>,
}

impl TableSchema {
    /// Every column the file must carry: required, numeric and percentage.
    pub fn all_columns(&self) -> impl Iterator<Item = &String> {
        self.required_columns
            .iter()
            .chain(&self.numeric_columns)
            .chain(&self.percentage_columns)
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == column)
    }

    pub fn is_percentage(&self, column: &str) -> bool {
        self.percentage_columns.iter().any(|c| c == column)
    }
}

/// Counters collected while loading a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub empty_cells: usize,
    pub percentage_cells: usize,
}

/// A loaded, normalized table. Read-only once built; shared as `Arc<Table>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    source: PathBuf,
    columns: Vec<String>,
    rows: Vec<Row>,
    report: LoadReport,
}

impl Table {
    pub fn new(source: impl Into<PathBuf>, columns: Vec<String>, rows: Vec<Row>, report: LoadReport) -> Self {
        Self {
            source: source.into(),
            columns,
            rows,
            report,
        }
    }

    /// Build an in-memory table. Columns are collected across the rows:
    /// a row lists its cells by name in sorted order, and a name seen
    /// first in a later row is appended after the earlier ones.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for name in row.cells.keys() {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }
        let report = LoadReport {
            total_rows: rows.len(),
            ..LoadReport::default()
        };
        Self::new(PathBuf::new(), columns, rows, report)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Chart records handed to the renderer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct NamedValue {
    pub name: String,
    pub value: f64,
}

impl NamedValue {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesValues {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapColumn {
    pub region: String,
    /// `[longitude, latitude]`
    pub position: [f64; 2],
    pub value: f64,
    pub elevation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartRecord {
    Pie { slices: Vec<NamedValue> },
    Gauge { reading: NamedValue },
    Ranking { bars: Vec<NamedValue> },
    StackedArea { groups: Vec<String>, series: Vec<SeriesValues> },
    ColumnMap { columns: Vec<MapColumn> },
}

impl ChartRecord {
    /// Flat `name -> value` view used for console summaries.
    pub fn named_values(&self) -> Vec<NamedValue> {
        match self {
            ChartRecord::Pie { slices } => slices.clone(),
            ChartRecord::Gauge { reading } => vec![reading.clone()],
            ChartRecord::Ranking { bars } => bars.clone(),
            ChartRecord::StackedArea { series, .. } => series
                .iter()
                .map(|s| NamedValue::new(s.name.clone(), s.values.iter().sum()))
                .collect(),
            ChartRecord::ColumnMap { columns } => columns
                .iter()
                .map(|c| NamedValue::new(c.region.clone(), c.value))
                .collect(),
        }
    }
}
