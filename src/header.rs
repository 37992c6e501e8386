//! Header row detection for sheets whose labels sit below row 0.
//!
//! Loading is split in two: the raw grid is scanned for the header index
//! first, then the table is built from that index.

use crate::error::{DashboardError, Result};
use crate::table::{CellValue, Table};

/// Index of the first row holding at least one non-empty cell
pub fn detect_header_row(grid: &[Vec<CellValue>], sheet: &str) -> Result<usize> {
    grid.iter()
        .position(|row| row.iter().any(|cell| !cell.is_empty()))
        .ok_or_else(|| DashboardError::EmptySheet {
            sheet: sheet.to_string(),
        })
}

/// Build a table using `header_index` as the header row
///
/// Headers are trimmed and blank ones become `Column N`. Rows above the
/// header are discarded, as are rows below it that are entirely empty.
pub fn table_from_grid(grid: &[Vec<CellValue>], header_index: usize) -> Table {
    let Some(header) = grid.get(header_index) else {
        return Table::default();
    };

    let width = grid
        .iter()
        .skip(header_index)
        .map(|row| row.len())
        .max()
        .unwrap_or(0);

    let columns = (0..width)
        .map(|i| {
            let name = header.get(i).map(|c| c.to_string()).unwrap_or_default();
            let name = name.trim();
            if name.is_empty() {
                format!("Column {}", i + 1)
            } else {
                name.to_string()
            }
        })
        .collect();

    let rows = grid
        .iter()
        .skip(header_index + 1)
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .cloned()
        .collect();

    Table::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn header_below_blank_rows_is_found() {
        let grid = vec![
            vec![CellValue::Empty, CellValue::Empty],
            vec![CellValue::Empty, text("   ")],
            vec![text("Date"), text("Items Details")],
            vec![text("2025-09-01"), text("Kashan rug")],
        ];
        assert_eq!(detect_header_row(&grid, "Sales").unwrap(), 2);
    }

    #[test]
    fn header_at_top_is_row_zero() {
        let grid = vec![vec![text("Serial No")], vec![text("A1")]];
        assert_eq!(detect_header_row(&grid, "Inventory").unwrap(), 0);
    }

    #[test]
    fn all_blank_grid_is_an_empty_sheet() {
        let grid = vec![vec![CellValue::Empty], vec![text("")]];
        let err = detect_header_row(&grid, "Sales").unwrap_err();
        assert!(matches!(err, DashboardError::EmptySheet { ref sheet } if sheet == "Sales"));

        assert!(detect_header_row(&[], "Sales").is_err());
    }

    #[test]
    fn table_trims_headers_and_names_blank_ones() {
        let grid = vec![
            vec![text(" Serial No "), CellValue::Empty, text("Size")],
            vec![text("A1"), text("x"), text("2x3")],
            vec![CellValue::Empty, CellValue::Empty, CellValue::Empty],
            vec![text("B2")],
        ];
        let table = table_from_grid(&grid, 0);
        assert_eq!(table.columns, vec!["Serial No", "Column 2", "Size"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1], vec![text("B2"), CellValue::Empty, CellValue::Empty]);
    }

    #[test]
    fn rows_above_detected_header_are_dropped() {
        let grid = vec![
            vec![CellValue::Empty],
            vec![text("Date"), text("Amount in BHD")],
            vec![text("2025-09-01"), CellValue::Number(10.0)],
        ];
        let index = detect_header_row(&grid, "Sales").unwrap();
        let table = table_from_grid(&grid, index);
        assert_eq!(table.columns, vec!["Date", "Amount in BHD"]);
        assert_eq!(table.rows, vec![vec![text("2025-09-01"), CellValue::Number(10.0)]]);
    }
}
