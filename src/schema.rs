//! Column-name resolution and date coercion.
//!
//! Sheets arrive with whatever headers their authors typed. Everything the
//! dashboard looks up by name goes through this module once, right after a
//! table is loaded: canonical names are matched case-insensitively with
//! whitespace trimmed and collapsed, configured synonyms are accepted, and the
//! matching column is renamed to its canonical name. Downstream code can then
//! use exact names.

use crate::error::{DashboardError, Result};
use crate::table::{CellValue, Table};
use chrono::{Days, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
    "%d-%b-%y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

/// Serial of 9999-12-31, the last day Excel can represent
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Lowercase, trim and collapse internal whitespace
pub fn normalize_name(name: &str) -> String {
    WHITESPACE
        .replace_all(name.trim(), " ")
        .to_lowercase()
}

/// A column the dashboard needs, with the other names it may appear under
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub canonical: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl ColumnMapping {
    pub fn new(canonical: &str, synonyms: &[&str]) -> Self {
        ColumnMapping {
            canonical: canonical.to_string(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn matches(&self, column: &str) -> bool {
        let column = normalize_name(column);
        normalize_name(&self.canonical) == column
            || self.synonyms.iter().any(|s| normalize_name(s) == column)
    }
}

/// Index of the first column matching `mapping`, if any
pub fn resolve_column(table: &Table, mapping: &ColumnMapping) -> Option<usize> {
    table
        .columns
        .iter()
        .position(|c| c == &mapping.canonical)
        .or_else(|| table.columns.iter().position(|c| mapping.matches(c)))
}

/// Rename every resolvable column to its canonical name
///
/// Returns the canonical names that could not be found. Columns that match
/// nothing pass through untouched.
pub fn apply_schema(table: &mut Table, mappings: &[ColumnMapping]) -> Vec<String> {
    let mut missing = Vec::new();
    for mapping in mappings {
        match resolve_column(table, mapping) {
            Some(index) => {
                if table.columns[index] != mapping.canonical {
                    debug!("mapping column \"{}\" to \"{}\"", table.columns[index], mapping.canonical);
                    table.columns[index] = mapping.canonical.clone();
                }
            }
            None => missing.push(mapping.canonical.clone()),
        }
    }
    missing
}

/// How to find the date column of a sales sheet
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateColumnRule {
    /// A column with exactly this name (after normalization)
    Exact(String),
    /// The first column whose lowercased name contains "date"
    Detect,
}

impl DateColumnRule {
    fn describe(&self) -> String {
        match self {
            DateColumnRule::Exact(name) => format!("\"{}\"", name),
            DateColumnRule::Detect => "any column containing \"date\"".to_string(),
        }
    }

    fn find(&self, table: &Table) -> Option<usize> {
        match self {
            DateColumnRule::Exact(name) => {
                let wanted = normalize_name(name);
                table.columns.iter().position(|c| normalize_name(c) == wanted)
            }
            DateColumnRule::Detect => table
                .columns
                .iter()
                .position(|c| c.to_lowercase().contains("date")),
        }
    }
}

/// Apply the rules in order and return the first matching column index
pub fn resolve_date_column(table: &Table, rules: &[DateColumnRule]) -> Result<usize> {
    rules
        .iter()
        .find_map(|rule| rule.find(table))
        .ok_or_else(|| DashboardError::MissingDateColumn {
            tried: rules
                .iter()
                .map(DateColumnRule::describe)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Convert an Excel serial day number (1900 date system) to a date
///
/// Only used for plain numbers in a date column. Cells calamine reports as
/// dates carry their workbook's epoch and are converted while loading.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    let origin = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    origin.checked_add_days(Days::new(serial.floor() as u64))
}

/// Parse a date typed as text in one of the common layouts
///
/// Month-first layouts are tried before day-first ones.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Coerce one cell to a date; anything unparseable becomes `None`
pub fn coerce_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Number(n) => excel_serial_to_date(*n),
        CellValue::Text(s) => parse_date_text(s),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

/// Rewrite a column so every cell is either a `Date` or `Empty`
pub fn coerce_dates(table: &mut Table, column: usize) {
    for row in &mut table.rows {
        if let Some(cell) = row.get_mut(column) {
            *cell = match coerce_date(cell) {
                Some(date) => CellValue::Date(date),
                None => CellValue::Empty,
            };
        }
    }
}

/// Earliest and latest date in a coerced column
pub fn date_bounds(table: &Table, column: usize) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = table.column(column).filter_map(CellValue::as_date);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn table_with(columns: &[&str]) -> Table {
        Table::new(columns.iter().map(|c| c.to_string()).collect(), vec![])
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_name("  Amount   in\tBHD "), "amount in bhd");
    }

    #[test]
    fn schema_renames_loose_matches_to_canonical() {
        let mut table = table_with(&["serial  no", "STATUS", "Notes"]);
        let mappings = vec![
            ColumnMapping::new("Serial No", &[]),
            ColumnMapping::new("Current Status", &["Status"]),
            ColumnMapping::new("Size", &[]),
        ];
        let missing = apply_schema(&mut table, &mappings);
        assert_eq!(table.columns, vec!["Serial No", "Current Status", "Notes"]);
        assert_eq!(missing, vec!["Size"]);
    }

    #[test]
    fn exact_date_rule_wins_over_detection() {
        let table = table_with(&["Update date", "Date"]);
        let rules = vec![DateColumnRule::Exact("Date".into()), DateColumnRule::Detect];
        assert_eq!(resolve_date_column(&table, &rules).unwrap(), 1);
    }

    #[test]
    fn detection_finds_sale_date() {
        let table = table_with(&["Items Details", "Sale Date", "Amount in BHD"]);
        let rules = vec![DateColumnRule::Exact("Date".into()), DateColumnRule::Detect];
        assert_eq!(resolve_date_column(&table, &rules).unwrap(), 1);
    }

    #[test]
    fn exact_rule_alone_does_not_detect() {
        let table = table_with(&["Sale Date"]);
        let err = resolve_date_column(&table, &[DateColumnRule::Exact("Date".into())]).unwrap_err();
        assert!(matches!(err, DashboardError::MissingDateColumn { .. }));
    }

    #[test]
    fn excel_serials_convert() {
        assert_eq!(excel_serial_to_date(45901.0), Some(ymd(2025, 9, 1)));
        assert_eq!(excel_serial_to_date(45901.75), Some(ymd(2025, 9, 1)));
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn text_dates_parse_in_common_layouts() {
        assert_eq!(parse_date_text("2025-09-15"), Some(ymd(2025, 9, 15)));
        assert_eq!(parse_date_text("09/15/2025"), Some(ymd(2025, 9, 15)));
        assert_eq!(parse_date_text("15/09/2025"), Some(ymd(2025, 9, 15)));
        assert_eq!(parse_date_text("15 September 2025"), Some(ymd(2025, 9, 15)));
        assert_eq!(parse_date_text("2025-09-15 13:45:00"), Some(ymd(2025, 9, 15)));
        assert_eq!(parse_date_text("pending"), None);
    }

    #[test]
    fn coercion_turns_garbage_into_empty() {
        let mut table = Table::new(
            vec!["Date".into()],
            vec![
                vec![text("2025-09-01")],
                vec![CellValue::Number(45915.0)],
                vec![text("n/a")],
                vec![CellValue::Bool(true)],
            ],
        );
        coerce_dates(&mut table, 0);
        let cells: Vec<_> = table.column(0).cloned().collect();
        assert_eq!(
            cells,
            vec![
                CellValue::Date(ymd(2025, 9, 1)),
                CellValue::Date(ymd(2025, 9, 15)),
                CellValue::Empty,
                CellValue::Empty,
            ]
        );
        assert_eq!(date_bounds(&table, 0), Some((ymd(2025, 9, 1), ymd(2025, 9, 15))));
    }
}
