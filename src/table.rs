use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

/// A single cell after it has been read out of a workbook
///
/// Values keep just enough type information for filtering, date coercion
/// and summing. Everything else is rendered through `Display`.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl CellValue {
    /// Whether the cell holds nothing (blank text counts as nothing)
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_none(),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            other => serializer.collect_str(other),
        }
    }
}

/// A rectangular table: named columns and rows of cells
///
/// Every row holds exactly `columns.len()` cells.
#[derive(Clone, Debug, PartialEq, Default, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table, padding or truncating rows to the column count
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Table { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact lookup of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate the cells of one column
    pub fn column(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Keep only the rows for which `keep` returns true
    pub fn retain_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[CellValue]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|row| keep(row)).cloned().collect(),
        }
    }

    /// Distinct non-empty string values of a column, in first-appearance order
    pub fn distinct_values(&self, index: usize) -> Vec<String> {
        let mut seen = Vec::new();
        for cell in self.column(index) {
            if cell.is_empty() {
                continue;
            }
            let value = cell.to_string();
            if !seen.contains(&value) {
                seen.push(value);
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn numbers_render_without_trailing_fraction() {
        assert_eq!(CellValue::Number(12.0).to_string(), "12");
        assert_eq!(CellValue::Number(12.5).to_string(), "12.5");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn dates_render_iso() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(CellValue::Date(date).to_string(), "2025-09-01");
    }

    #[test]
    fn new_pads_short_rows() {
        let table = Table::new(
            vec!["A".into(), "B".into()],
            vec![vec![text("x")], vec![text("y"), text("z"), text("extra")]],
        );
        assert_eq!(table.rows[0], vec![text("x"), CellValue::Empty]);
        assert_eq!(table.rows[1].len(), 2);
    }

    #[test]
    fn distinct_values_keep_first_appearance() {
        let table = Table::new(
            vec!["Status".into()],
            vec![
                vec![text("Sold")],
                vec![text("In Stock")],
                vec![CellValue::Empty],
                vec![text("Sold")],
            ],
        );
        assert_eq!(table.distinct_values(0), vec!["Sold", "In Stock"]);
    }

    #[test]
    fn cells_serialize_as_plain_json() {
        let row = vec![CellValue::Empty, CellValue::Number(2.5), text("rug")];
        assert_eq!(serde_json::to_string(&row).unwrap(), "[null,2.5,\"rug\"]");
    }
}
