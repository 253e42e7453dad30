// Utility helpers for parsing cells and formatting numbers.
//
// This module centralizes the "dirty" spreadsheet handling (thousands
// separators, percent signs, month names) so the rest of the code can
// assume clean, typed values.
use crate::types::CellValue;
use chrono::Month;
use num_format::{Locale, ToFormattedString};
use std::cmp::Ordering;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (so `NaN`/`inf` never get in).
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_i64_safe(s: Option<&str>) -> Option<i64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.replace(',', "").parse::<i64>().ok()
}

/// Parse a cell of a declared numeric column. Blanks become `Null`;
/// `None` means the text is not a number.
pub fn parse_numeric_cell(raw: &str) -> Option<CellValue> {
    if raw.trim().is_empty() {
        return Some(CellValue::Null);
    }
    if let Some(i) = parse_i64_safe(Some(raw)) {
        return Some(CellValue::Integer(i));
    }
    parse_f64_safe(Some(raw)).map(CellValue::Float)
}

/// Best-effort typing for undeclared columns: integer, then float, else text.
pub fn parse_cell(raw: &str) -> CellValue {
    let s = raw.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => CellValue::Float(v),
        _ => CellValue::Text(s.to_string()),
    }
}

/// `"35%"`, `"35 %"` or `"35"` -> `0.35`. Only values in `[0, 1]` are accepted.
pub fn parse_percent(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let s = s.strip_suffix('%').unwrap_or(s);
    let fraction = parse_f64_safe(Some(s))? / 100.0;
    (0.0..=1.0).contains(&fraction).then_some(fraction)
}

/// Inverse of [`parse_percent`]: `0.125` -> `"12.5%"`.
pub fn format_percent(fraction: f64) -> String {
    let pct = format!("{:.10}", fraction * 100.0);
    let pct = pct.trim_end_matches('0').trim_end_matches('.');
    format!("{pct}%")
}

const FRENCH_MONTHS: [(&str, u32); 22] = [
    ("janvier", 1),
    ("janv", 1),
    ("février", 2),
    ("fevrier", 2),
    ("févr", 2),
    ("fevr", 2),
    ("mars", 3),
    ("avril", 4),
    ("avr", 4),
    ("mai", 5),
    ("juin", 6),
    ("juillet", 7),
    ("juil", 7),
    ("août", 8),
    ("aout", 8),
    ("septembre", 9),
    ("sept", 9),
    ("octobre", 10),
    ("novembre", 11),
    ("décembre", 12),
    ("decembre", 12),
    ("déc", 12),
];

/// Calendar position (1..=12) of a month cell: a number, an English name
/// or abbreviation, or a French name.
pub fn month_ordinal(value: &CellValue) -> Option<u32> {
    match value {
        CellValue::Integer(i) if (1..=12).contains(i) => Some(*i as u32),
        CellValue::Text(s) => {
            let lower = s.trim().trim_end_matches('.').to_lowercase();
            if let Ok(m) = lower.parse::<Month>() {
                return Some(m.number_from_month());
            }
            FRENCH_MONTHS
                .iter()
                .find(|(name, _)| *name == lower)
                .map(|(_, n)| *n)
        }
        _ => None,
    }
}

/// Chronological/natural ordering of cell values: month names by calendar
/// position, everything else by the value's own ordering.
pub fn natural_cmp(a: &CellValue, b: &CellValue) -> Ordering {
    let month_a = matches!(a, CellValue::Text(_)).then(|| month_ordinal(a)).flatten();
    let month_b = matches!(b, CellValue::Text(_)).then(|| month_ordinal(b)).flatten();
    match (month_a, month_b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Compare compound keys component by component with [`natural_cmp`].
pub fn natural_cmp_keys(a: &[CellValue], b: &[CellValue]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| natural_cmp(x, y))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places plus locale-aware thousands separators
    // (e.g., `1,234,567.89`). The sign is taken after rounding so that
    // `-0.4` shows as `0`.
    let s = format!("{:.*}", decimals, n.abs());
    let neg = n.is_sign_negative() && s.bytes().any(|b| matches!(b, b'1'..=b'9'));
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let mut res = match int_part.parse::<u128>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        Err(_) => int_part.to_string(),
    };
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_f64_safe_strips_thousands() {
        assert_eq!(parse_f64_safe(Some(" 12,345.5 ")), Some(12345.5));
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn test_parse_numeric_cell() {
        assert_eq!(parse_numeric_cell("1,200"), Some(CellValue::Integer(1200)));
        assert_eq!(parse_numeric_cell("2.5"), Some(CellValue::Float(2.5)));
        assert_eq!(parse_numeric_cell("  "), Some(CellValue::Null));
        assert!(parse_numeric_cell("twelve").is_none());
    }

    #[test]
    fn test_parse_cell_guesses_type() {
        assert_eq!(parse_cell("2021"), CellValue::Integer(2021));
        assert_eq!(parse_cell(" Jan "), CellValue::Text("Jan".into()));
        assert!(matches!(parse_cell("inf"), CellValue::Text(_)));
        assert!(parse_cell("").is_null());
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("35%"), Some(0.35));
        assert_eq!(parse_percent(" 12.5 % "), Some(0.125));
        assert_eq!(parse_percent("100"), Some(1.0));
        assert_eq!(parse_percent("140%"), None);
        assert_eq!(parse_percent("-3%"), None);
        assert_eq!(parse_percent("n/a"), None);
    }

    #[test]
    fn test_percent_round_trip() {
        for raw in ["0%", "3.25%", "12.5%", "47%", "99.99%", "100%", "12.3456789%", "0.0000123%"] {
            let fraction = parse_percent(raw).unwrap();
            let again = parse_percent(&format_percent(fraction)).unwrap();
            assert!((fraction - again).abs() < 1e-9, "{raw}");
        }
        assert_eq!(format_percent(0.125), "12.5%");
        assert_eq!(format_percent(0.0), "0%");
        assert_eq!(format_percent(0.27), "27%");
        assert_eq!(format_percent(0.123456789), "12.3456789%");
    }

    #[test]
    fn test_month_ordinal() {
        assert_eq!(month_ordinal(&CellValue::Text("Jan".into())), Some(1));
        assert_eq!(month_ordinal(&CellValue::Text("february".into())), Some(2));
        assert_eq!(month_ordinal(&CellValue::Text("Août".into())), Some(8));
        assert_eq!(month_ordinal(&CellValue::Text("Déc.".into())), Some(12));
        assert_eq!(month_ordinal(&CellValue::Integer(11)), Some(11));
        assert_eq!(month_ordinal(&CellValue::Integer(13)), None);
        assert_eq!(month_ordinal(&CellValue::Text("Bretagne".into())), None);
    }

    #[test]
    fn test_natural_cmp_orders_months_by_calendar() {
        let mut months: Vec<CellValue> = ["Mar", "Jan", "Feb", "Dec"]
            .iter()
            .map(|m| CellValue::Text(m.to_string()))
            .collect();
        months.sort_by(natural_cmp);
        let names: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        assert_eq!(names, ["Jan", "Feb", "Mar", "Dec"]);
    }

    #[test]
    fn test_natural_cmp_keys_year_then_month() {
        let a = [CellValue::Integer(2021), CellValue::Text("Feb".into())];
        let b = [CellValue::Integer(2021), CellValue::Text("Jan".into())];
        let c = [CellValue::Integer(2020), CellValue::Text("Dec".into())];
        assert_eq!(natural_cmp_keys(&a, &b), Ordering::Greater);
        assert_eq!(natural_cmp_keys(&c, &b), Ordering::Less);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.0, 0), "-42");
        assert_eq!(format_int(9855), "9,855");
    }

    #[test]
    fn test_format_number_sign_after_rounding() {
        assert_eq!(format_number(-0.4, 0), "0");
        assert_eq!(format_number(-0.6, 0), "-1");
        assert_eq!(format_number(-0.004, 2), "0.00");
        assert_eq!(format_number(1e20, 0), "100,000,000,000,000,000,000");
    }
}
