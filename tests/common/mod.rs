//! Fixture workbooks built in memory with rust_xlsxwriter.

#![allow(dead_code)]

use rust_xlsxwriter::{Format, Workbook};

pub const INVENTORY_SHEET: &str = "Inventory - Aryana";
pub const SALES_SHEET: &str = "Asia Carpets Sales";

/// The carpet workbook: an inventory sheet and, optionally, a sales sheet
///
/// The sales sheet starts with two blank rows, uses `Sale Date` for its date
/// column, and mixes text dates, a real Excel date and one unreadable date:
///
/// | Sale Date    | Items Details | Amount in BHD |
/// |--------------|---------------|---------------|
/// | 2025-09-01   | Kashan rug    | 10            |
/// | 2025-09-15 * | Tabriz runner | 20            |
/// | not recorded | Kashan rug    | 5             |
/// | 2025-09-05   | Qom silk      | 7.5           |
///
/// (* stored as a date-formatted serial number)
pub fn carpet_workbook(with_sales: bool) -> Vec<u8> {
    let mut workbook = Workbook::new();

    let inventory = workbook.add_worksheet();
    inventory.set_name(INVENTORY_SHEET).unwrap();
    let header = ["Serial No", "Carpet Origin & Manufacturer", "Size ", "Current Status", "Notes"];
    for (c, name) in header.iter().enumerate() {
        inventory.write_string(0, c as u16, *name).unwrap();
    }
    let items = [
        ["A1", "Iran - Kashan", "200x300", "In Stock", "hand-knotted, wool"],
        ["B2", "Afghanistan - Aryana", "170x240", "Sold", ""],
        ["C3", "Iran - Tabriz", "250x350", "Reserved", "silk \"Heriz\" pattern"],
    ];
    for (r, item) in items.iter().enumerate() {
        for (c, value) in item.iter().enumerate() {
            if !value.is_empty() {
                inventory.write_string((r + 1) as u32, c as u16, *value).unwrap();
            }
        }
    }

    if with_sales {
        let sales = workbook.add_worksheet();
        sales.set_name(SALES_SHEET).unwrap();
        for (c, name) in ["Sale Date", "Items Details", "Amount in BHD"].iter().enumerate() {
            sales.write_string(2, c as u16, *name).unwrap();
        }

        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        sales.write_string(3, 0, "2025-09-01").unwrap();
        sales.write_number_with_format(4, 0, 45915.0, &date_format).unwrap();
        sales.write_string(5, 0, "not recorded").unwrap();
        sales.write_string(6, 0, "2025-09-05").unwrap();

        let rows = [("Kashan rug", 10.0), ("Tabriz runner", 20.0), ("Kashan rug", 5.0), ("Qom silk", 7.5)];
        for (i, (item, amount)) in rows.iter().enumerate() {
            let r = (i + 3) as u32;
            sales.write_string(r, 1, *item).unwrap();
            sales.write_number(r, 2, *amount).unwrap();
        }
    }

    workbook.save_to_buffer().unwrap()
}

/// Wrap a file in a multipart/form-data body
pub fn multipart_body(boundary: &str, field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
