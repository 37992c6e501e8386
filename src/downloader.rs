use crate::error::Result;
use crate::table::{CellValue, Table};

/// Convert a table to CSV bytes
///
/// This function exports a filtered table as UTF-8 CSV:
/// - The first record holds the column names
/// - There is no index column
/// - Cells holding commas, quotes or newlines are wrapped in double quotes
///   with inner quotes doubled
///
/// # Arguments
/// * `table` - Reference to the table to convert
///
/// # Returns
/// * `Result<Vec<u8>>` - CSV content or an error
///
/// # Examples
/// ```
/// use carpet_dashboard::downloader::to_csv;
/// use carpet_dashboard::table::{CellValue, Table};
///
/// let table = Table::new(
///     vec!["Serial No".into()],
///     vec![vec![CellValue::Text("A1".into())]],
/// );
/// let csv = to_csv(&table).unwrap();
/// assert_eq!(String::from_utf8(csv).unwrap(), "Serial No\nA1\n");
/// ```
pub fn to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()).into())
}

/// Convert a table to XLSX bytes
///
/// This function exports a table as a single-sheet workbook using the
/// rust_xlsxwriter library. The header row is bold, numbers stay numeric and
/// everything else is written as text.
///
/// # Arguments
/// * `table` - Reference to the table to convert
/// * `sheet_name` - Name of the worksheet in the exported file
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content as bytes or an error
pub fn to_xlsx(table: &Table, sheet_name: &str) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(sheet_name)?;

    let bold = Format::new().set_bold();
    for (c, name) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, name, &bold)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let c = c as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                other => {
                    worksheet.write_string(r, c, &other.to_string())?;
                }
            }
        }
    }

    workbook.push_worksheet(worksheet);

    Ok(workbook.save_to_buffer()?)
}
