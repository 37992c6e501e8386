use crate::error::{DashboardError, Result};
use crate::header::{detect_header_row, table_from_grid};
use crate::schema::parse_date_text;
use crate::table::{CellValue, Table};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use log::debug;
use std::io::Cursor;

/// An uploaded workbook, parsed once into raw grids
///
/// Each sheet is kept as the grid calamine read, padded so that row and
/// column indices match the sheet itself. Tables are built from the grids on
/// demand, so the workbook never changes after the upload.
#[derive(Clone, Debug, Default)]
pub struct Workbook {
    sheets: Vec<(String, Vec<Vec<CellValue>>)>,
}

impl Workbook {
    /// Parse an uploaded workbook (xlsx, xlsm, xlsb, xls or ods)
    ///
    /// # Arguments
    /// * `bytes` - The raw file contents
    ///
    /// # Returns
    /// * `Result<Workbook>` - Every sheet as a raw grid, or a `Workbook` error
    ///
    /// # Examples
    /// ```no_run
    /// use carpet_dashboard::loader::Workbook;
    ///
    /// let bytes = std::fs::read("carpets.xlsx").unwrap();
    /// match Workbook::from_bytes(&bytes) {
    ///     Ok(book) => println!("Loaded {} sheets", book.sheet_names().len()),
    ///     Err(e) => eprintln!("Error loading workbook: {}", e),
    /// }
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Result<Workbook> {
        let mut reader = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        let mut sheets = Vec::new();
        for name in reader.sheet_names() {
            let range = reader.worksheet_range(&name)?;
            let (row_offset, col_offset) = range
                .start()
                .map(|(r, c)| (r as usize, c as usize))
                .unwrap_or((0, 0));

            let mut grid: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
            for row in range.rows() {
                let mut cells = vec![CellValue::Empty; col_offset];
                cells.extend(row.iter().map(convert_cell));
                grid.push(cells);
            }

            debug!("read sheet \"{}\" with {} rows", name, grid.len());
            sheets.push((name, grid));
        }

        Ok(Workbook { sheets })
    }

    /// Build a workbook from grids that are already in memory
    pub fn from_grids(sheets: Vec<(String, Vec<Vec<CellValue>>)>) -> Workbook {
        Workbook { sheets }
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn contains(&self, sheet: &str) -> bool {
        self.sheets.iter().any(|(name, _)| name == sheet)
    }

    /// The first of `candidates` present in the workbook
    pub fn first_present<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        candidates
            .iter()
            .map(String::as_str)
            .find(|candidate| self.contains(candidate))
    }

    /// The raw grid of a sheet, matched by exact name
    pub fn raw_grid(&self, sheet: &str) -> Result<&[Vec<CellValue>]> {
        self.sheets
            .iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, grid)| grid.as_slice())
            .ok_or_else(|| DashboardError::SheetNotFound {
                sheets: vec![sheet.to_string()],
            })
    }

    /// Load tables for every requested sheet, using row 0 as the header
    ///
    /// Fails with `SheetNotFound` naming all missing sheets if any is absent.
    pub fn load_sheets(&self, names: &[&str]) -> Result<Vec<Table>> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.contains(name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DashboardError::SheetNotFound { sheets: missing });
        }

        names
            .iter()
            .map(|name| Ok(table_from_grid(self.raw_grid(name)?, 0)))
            .collect()
    }

    /// Load one sheet, using the first non-empty row as the header
    pub fn load_sheet_detecting_header(&self, sheet: &str) -> Result<Table> {
        let grid = self.raw_grid(sheet)?;
        let header_index = detect_header_row(grid, sheet)?;
        debug!("sheet \"{}\" header row at index {}", sheet, header_index);
        Ok(table_from_grid(grid, header_index))
    }
}

/// Map a calamine cell onto the crate's cell type
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::Date(datetime.date()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match parse_date_text(s) {
            Some(date) => CellValue::Date(date),
            None => CellValue::Text(s.clone()),
        },
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn sample() -> Workbook {
        Workbook::from_grids(vec![
            (
                "Inventory - Aryana".to_string(),
                vec![
                    vec![text("Serial No "), text(" Current Status")],
                    vec![text("A1"), text("In Stock")],
                ],
            ),
            (
                "Asia Carpets Sales".to_string(),
                vec![
                    vec![],
                    vec![text("Date"), text("Amount in BHD")],
                    vec![text("2025-09-01"), CellValue::Number(10.0)],
                ],
            ),
        ])
    }

    #[test]
    fn load_sheets_trims_headers() {
        let tables = sample().load_sheets(&["Inventory - Aryana"]).unwrap();
        assert_eq!(tables[0].columns, vec!["Serial No", "Current Status"]);
        assert_eq!(tables[0].len(), 1);
    }

    #[test]
    fn load_sheets_names_every_missing_sheet() {
        let err = sample()
            .load_sheets(&["Inventory - Aryana", "Sales", "Stock"])
            .unwrap_err();
        match err {
            DashboardError::SheetNotFound { sheets } => assert_eq!(sheets, vec!["Sales", "Stock"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn sheet_names_are_case_sensitive() {
        assert!(sample().raw_grid("inventory - aryana").is_err());
    }

    #[test]
    fn detecting_header_skips_leading_blank_rows() {
        let table = sample()
            .load_sheet_detecting_header("Asia Carpets Sales")
            .unwrap();
        assert_eq!(table.columns, vec!["Date", "Amount in BHD"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn first_present_respects_candidate_order() {
        let candidates = vec![
            "Sales - September 2025 (MD Joz and Aryana )".to_string(),
            "Asia Carpets Sales".to_string(),
        ];
        assert_eq!(sample().first_present(&candidates), Some("Asia Carpets Sales"));
        assert_eq!(sample().first_present(&candidates[..1]), None);
    }

    fn date_cell(serial: f64, is_1904: bool) -> Data {
        Data::DateTime(ExcelDateTime::new(serial, ExcelDateTimeType::DateTime, is_1904))
    }

    fn ymd(y: i32, m: u32, d: u32) -> CellValue {
        CellValue::Date(chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn date_cells_follow_the_workbook_epoch() {
        assert_eq!(convert_cell(&date_cell(45901.0, false)), ymd(2025, 9, 1));
        assert_eq!(convert_cell(&date_cell(44439.0, true)), ymd(2025, 9, 1));
        assert_eq!(convert_cell(&date_cell(45915.75, false)), ymd(2025, 9, 15));
    }

    #[test]
    fn durations_stay_numeric() {
        let cell = Data::DateTime(ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false));
        assert_eq!(convert_cell(&cell), CellValue::Number(1.5));
    }

    #[test]
    fn garbage_bytes_are_a_workbook_error() {
        let err = Workbook::from_bytes(b"definitely not a spreadsheet").unwrap_err();
        assert!(matches!(err, DashboardError::Workbook(_)));
    }
}
