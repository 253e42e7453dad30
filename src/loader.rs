use crate::error::LoadError;
use crate::types::{CellValue, LoadReport, Row, Table, TableSchema};
use crate::util::{parse_cell, parse_numeric_cell, parse_percent};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

/// Read a CSV export of a spreadsheet and normalize it against `schema`.
///
/// - column names are trimmed and must be unique and non-empty;
/// - every column the schema names must be present;
/// - numeric columns accept thousands separators, blanks become `Null`;
/// - percentage columns drop a trailing `%` and are stored as fractions in `[0, 1]`;
/// - fully blank lines are skipped.
pub fn load_table(path: &Path, schema: &TableSchema) -> Result<Table, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);
    let csv_err = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let columns = normalize_headers(path, &headers)?;
    for required in schema.all_columns() {
        if !columns.contains(required) {
            return Err(LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: required.clone(),
            });
        }
    }

    let mut report = LoadReport::default();
    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(csv_err)?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let row_no = idx + 1;
        let mut row = Row::new();
        for (col_idx, column) in columns.iter().enumerate() {
            let raw = record.get(col_idx).unwrap_or("");
            let value = convert_cell(path, schema, row_no, column, raw)?;
            if value.is_null() {
                report.empty_cells += 1;
            } else if schema.is_percentage(column) {
                report.percentage_cells += 1;
            }
            row.insert(column.clone(), value);
        }
        rows.push(row);
    }
    report.total_rows = rows.len();

    info!(
        "loaded {} rows x {} columns from {}",
        report.total_rows,
        columns.len(),
        path.display()
    );
    debug!("load report for {}: {:?}", path.display(), report);
    Ok(Table::new(path, columns, rows, report))
}

fn normalize_headers(path: &Path, headers: &StringRecord) -> Result<Vec<String>, LoadError> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(headers.len());
    for (index, raw) in headers.iter().enumerate() {
        let name = raw.trim_start_matches('\u{feff}').trim().to_string();
        if name.is_empty() {
            return Err(LoadError::EmptyColumnName {
                path: path.to_path_buf(),
                index,
            });
        }
        if !seen.insert(name.clone()) {
            return Err(LoadError::DuplicateColumn {
                path: path.to_path_buf(),
                column: name,
            });
        }
        columns.push(name);
    }
    Ok(columns)
}

fn convert_cell(
    path: &Path,
    schema: &TableSchema,
    row: usize,
    column: &str,
    raw: &str,
) -> Result<CellValue, LoadError> {
    let invalid = |expected: &'static str| LoadError::NonNumericValue {
        path: path.to_path_buf(),
        row,
        column: column.to_string(),
        value: raw.to_string(),
        expected,
    };

    if schema.is_percentage(column) {
        if raw.trim().is_empty() {
            return Ok(CellValue::Null);
        }
        return parse_percent(raw)
            .map(CellValue::Float)
            .ok_or_else(|| invalid("a percentage between 0% and 100%"));
    }
    if schema.is_numeric(column) {
        return parse_numeric_cell(raw).ok_or_else(|| invalid("a number"));
    }
    Ok(parse_cell(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("test").join(name)
    }

    fn gender_schema() -> TableSchema {
        TableSchema {
            required_columns: vec!["Année".into(), "Mois".into()],
            numeric_columns: vec!["Enfants".into(), "Femmes".into(), "Hommes".into()],
            percentage_columns: vec![],
        }
    }

    #[test]
    fn test_headers_are_trimmed() {
        let table = load_table(&fixture("padded_headers.csv"), &gender_schema()).unwrap();
        assert_eq!(table.columns(), ["Année", "Mois", "Enfants", "Femmes", "Hommes"]);
        assert_eq!(table.len(), 3);
        let first = &table.rows()[0];
        assert_eq!(first.get("Année"), Some(&CellValue::Integer(2021)));
        assert_eq!(first.get("Hommes"), Some(&CellValue::Integer(1200)));
    }

    #[test]
    fn test_blank_numeric_cells_become_null() {
        let table = load_table(&fixture("padded_headers.csv"), &gender_schema()).unwrap();
        assert!(table.rows()[2].get("Femmes").unwrap().is_null());
        assert_eq!(table.report().empty_cells, 1);
    }

    #[test]
    fn test_percentage_columns_become_fractions() {
        let schema = TableSchema {
            required_columns: vec!["Année".into()],
            numeric_columns: vec![],
            percentage_columns: vec!["Bretagne".into(), "Occitanie".into()],
        };
        let table = load_table(&fixture("percentages.csv"), &schema).unwrap();
        for row in table.rows() {
            for col in ["Bretagne", "Occitanie"] {
                let v = row.get(col).and_then(CellValue::as_f64).unwrap();
                assert!((0.0..=1.0).contains(&v), "{col} = {v}");
            }
        }
        assert_eq!(table.rows()[0].get("Bretagne"), Some(&CellValue::Float(0.125)));
        assert_eq!(table.report().percentage_cells, 4);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_table(&fixture("does_not_exist.csv"), &gender_schema()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.is_data_source());
    }

    #[test]
    fn test_missing_required_column() {
        let schema = TableSchema {
            required_columns: vec!["Région".into()],
            ..gender_schema()
        };
        let err = load_table(&fixture("padded_headers.csv"), &schema).unwrap_err();
        match err {
            LoadError::MissingColumn { column, .. } => assert_eq!(column, "Région"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = load_table(&fixture("duplicate_columns.csv"), &TableSchema::default()).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateColumn { ref column, .. } if column == "Mois"));
    }

    #[test]
    fn test_non_numeric_cell_is_reported() {
        let err = load_table(&fixture("non_numeric.csv"), &gender_schema()).unwrap_err();
        assert!(!err.is_data_source());
        match err {
            LoadError::NonNumericValue { row, column, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "Femmes");
                assert_eq!(value, "beaucoup");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_range_percentage_is_rejected() {
        let schema = TableSchema {
            percentage_columns: vec!["Bretagne".into()],
            ..TableSchema::default()
        };
        let err = load_table(&fixture("bad_percentages.csv"), &schema).unwrap_err();
        assert!(matches!(err, LoadError::NonNumericValue { .. }));
    }

    #[test]
    fn test_empty_column_name_rejected() {
        let err = load_table(&fixture("empty_header.csv"), &TableSchema::default()).unwrap_err();
        assert!(err.is_data_source());
        assert!(matches!(err, LoadError::EmptyColumnName { index: 1, .. }), "{err}");
    }

    #[test]
    fn test_undecodable_row_is_csv_error() {
        let err = load_table(&fixture("invalid_utf8.csv"), &TableSchema::default()).unwrap_err();
        assert!(err.is_data_source());
        assert!(matches!(err, LoadError::Csv { .. }), "{err}");
        assert!(err.to_string().contains("invalid_utf8.csv"));
    }
}
