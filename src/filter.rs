use crate::types::{CellValue, Row, Table};
use crate::util::natural_cmp;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Selection: which values the user picked per dimension
// ---------------------------------------------------------------------------

/// A value picked by a single-select widget, or the set picked by a
/// multi-select one. An empty `AnyOf` matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    One(CellValue),
    AnyOf(Vec<CellValue>),
}

impl Selector {
    pub fn accepts(&self, value: &CellValue) -> bool {
        match self {
            Selector::One(wanted) => wanted.matches(value),
            Selector::AnyOf(wanted) => wanted.iter().any(|w| w.matches(value)),
        }
    }

    /// The single selected value, if this is a single-select.
    pub fn single(&self) -> Option<&CellValue> {
        match self {
            Selector::One(v) => Some(v),
            Selector::AnyOf(_) => None,
        }
    }
}

/// Dimension name -> selector. Every entry must hold for a row to pass.
pub type Selection = BTreeMap<String, Selector>;

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Rows of a table that satisfy a selection. Empty is a normal outcome.
#[derive(Debug, Clone)]
pub struct FilteredSubset<'a> {
    table: &'a Table,
    rows: Vec<&'a Row>,
}

impl<'a> FilteredSubset<'a> {
    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn rows(&self) -> &[&'a Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Keep the rows whose value in every selected dimension is accepted by
/// that dimension's selector. A dimension the table does not have matches
/// no row.
pub fn filter<'a>(table: &'a Table, selection: &Selection) -> FilteredSubset<'a> {
    let rows = table
        .rows()
        .iter()
        .filter(|row| {
            selection.iter().all(|(dimension, selector)| {
                row.get(dimension)
                    .map(|value| selector.accepts(value))
                    .unwrap_or(false)
            })
        })
        .collect();
    FilteredSubset { table, rows }
}

/// Distinct values of a column in natural order (numbers ascending, months
/// in calendar order, then text). Nulls are left out.
pub fn distinct_values(table: &Table, column: &str) -> Vec<CellValue> {
    let mut values: Vec<CellValue> = Vec::new();
    for value in table.rows().iter().filter_map(|row| row.get(column)) {
        if !value.is_null() && !values.iter().any(|v| v.matches(value)) {
            values.push(value.clone());
        }
    }
    values.sort_by(natural_cmp);
    values
}
