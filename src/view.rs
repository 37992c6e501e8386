//! The dashboard as a pure function of the workbook and the user's input.
//!
//! `render` loads each sheet, maps its columns, applies the filters and
//! aggregates, and returns a serializable `DashboardView`. The two panels are
//! computed independently: a failure in one becomes a message in that panel
//! while the other still renders.

use crate::aggregate::{ItemTotal, format_amount, sales_by_item, total_amount};
use crate::config::{
    AMOUNT_COLUMN, DashboardConfig, ITEM_COLUMN, ORIGIN_COLUMN, SERIAL_COLUMN, SIZE_COLUMN,
    STATUS_COLUMN,
};
use crate::downloader::{to_csv, to_xlsx};
use crate::error::{DashboardError, Result};
use crate::filter::{DateRange, FilterCriteria, StatusPredicate, TextPredicate, apply};
use crate::loader::Workbook;
use crate::schema::{apply_schema, coerce_dates, date_bounds, resolve_date_column};
use crate::table::Table;
use chrono::NaiveDate;
use log::warn;
use serde::Serialize;

pub const INVENTORY_EXPORT: &str = "filtered_inventory.csv";
pub const SALES_EXPORT: &str = "sales_report.csv";
pub const SALES_XLSX_EXPORT: &str = "sales_report.xlsx";

/// What the user typed and picked, before it is bound to real columns
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DashboardCriteria {
    pub serial: String,
    pub origin: String,
    pub size: String,
    pub statuses: Vec<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// One section of the dashboard, which either rendered or explains why not
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready(T),
    Unavailable { message: String },
}

impl<T> Panel<T> {
    fn from_result(panel: &str, result: Result<T>) -> Self {
        match result {
            Ok(view) => Panel::Ready(view),
            Err(e) => {
                warn!("{} panel unavailable: {}", panel, e);
                Panel::Unavailable {
                    message: e.to_string(),
                }
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(view) => Some(view),
            Panel::Unavailable { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InventoryView {
    pub sheet: String,
    pub status_options: Vec<String>,
    pub selected_statuses: Vec<String>,
    pub total_rows: usize,
    pub table: Table,
    pub notices: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SalesView {
    pub sheet: String,
    /// Column names as they appear in the sheet, before mapping
    pub columns: Vec<String>,
    pub date_column: Option<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub total_amount: Option<f64>,
    pub total_display: Option<String>,
    pub by_item: Vec<ItemTotal>,
    pub total_rows: usize,
    pub table: Table,
    pub notices: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardView {
    pub inventory: Panel<InventoryView>,
    pub sales: Panel<SalesView>,
}

/// Compute the whole dashboard for one request
pub fn render(
    workbook: &Workbook,
    criteria: &DashboardCriteria,
    config: &DashboardConfig,
) -> DashboardView {
    DashboardView {
        inventory: Panel::from_result("inventory", inventory_view(workbook, criteria, config)),
        sales: Panel::from_result("sales", sales_view(workbook, criteria, config)),
    }
}

/// Load, map and filter the inventory sheet
pub fn inventory_view(
    workbook: &Workbook,
    criteria: &DashboardCriteria,
    config: &DashboardConfig,
) -> Result<InventoryView> {
    let sheet = config.inventory_sheet.as_str();
    let mut table = workbook
        .load_sheets(&[sheet])?
        .pop()
        .unwrap_or_default();
    let missing = apply_schema(&mut table, &config.inventory_columns);

    let mut notices = Vec::new();
    let mut filter = FilterCriteria::default();

    for (column, needle) in [
        (SERIAL_COLUMN, &criteria.serial),
        (ORIGIN_COLUMN, &criteria.origin),
        (SIZE_COLUMN, &criteria.size),
    ] {
        if missing.iter().any(|m| m == column) {
            notices.push(missing_column_notice(column, sheet, "its search is unavailable"));
        } else {
            filter.text.push(TextPredicate::new(column, needle));
        }
    }

    let status_options = match table.column_index(STATUS_COLUMN) {
        Some(index) => {
            filter.status = Some(StatusPredicate {
                column: STATUS_COLUMN.to_string(),
                accepted: criteria.statuses.iter().cloned().collect(),
            });
            table.distinct_values(index)
        }
        None => {
            notices.push(missing_column_notice(
                STATUS_COLUMN,
                sheet,
                "the status filter is unavailable",
            ));
            Vec::new()
        }
    };

    Ok(InventoryView {
        sheet: sheet.to_string(),
        status_options,
        selected_statuses: criteria.statuses.clone(),
        total_rows: table.len(),
        table: apply(&table, &filter),
        notices,
    })
}

/// Load, map, date-filter and aggregate the sales sheet
///
/// A missing date column does not fail the panel: the table, the total and
/// the per-item sums are still produced over all rows, and a notice says the
/// date range is unavailable.
pub fn sales_view(
    workbook: &Workbook,
    criteria: &DashboardCriteria,
    config: &DashboardConfig,
) -> Result<SalesView> {
    let sheet = workbook
        .first_present(&config.sales_sheets)
        .ok_or_else(|| DashboardError::SheetNotFound {
            sheets: config.sales_sheets.clone(),
        })?;

    let mut table = workbook.load_sheet_detecting_header(sheet)?;
    let columns = table.columns.clone();
    apply_schema(&mut table, &config.sales_columns);

    let mut notices = Vec::new();
    let mut filter = FilterCriteria::default();
    let mut view_dates = (None, None, None, None);
    let mut date_column = None;

    match resolve_date_column(&table, &config.date_rules) {
        Ok(index) => {
            coerce_dates(&mut table, index);
            let name = table.columns[index].clone();
            let bounds = date_bounds(&table, index);
            let (min_date, max_date) = (bounds.map(|b| b.0), bounds.map(|b| b.1));

            let start = criteria.start.or(min_date);
            let end = criteria.end.or(max_date);
            match (start, end) {
                (Some(start), Some(end)) => {
                    let (start, end) = if start <= end { (start, end) } else { (end, start) };
                    filter.date_range = Some(DateRange {
                        column: name.clone(),
                        start,
                        end,
                    });
                    view_dates = (min_date, max_date, Some(start), Some(end));
                }
                _ => notices.push(format!(
                    "No readable dates in column \"{}\"; the date range is unavailable",
                    name
                )),
            }
            date_column = Some(name);
        }
        Err(e) => {
            warn!("sales sheet \"{}\": {}", sheet, e);
            notices.push(format!("{}. The date range filter is unavailable.", capitalize(&e.to_string())));
        }
    }

    let filtered = apply(&table, &filter);

    let amount_index = filtered.column_index(AMOUNT_COLUMN);
    let item_index = filtered.column_index(ITEM_COLUMN);
    if amount_index.is_none() {
        notices.push(missing_column_notice(AMOUNT_COLUMN, sheet, "totals are unavailable"));
    }
    if item_index.is_none() {
        notices.push(missing_column_notice(
            ITEM_COLUMN,
            sheet,
            "sales by item are unavailable",
        ));
    }

    let total = amount_index.map(|a| total_amount(&filtered, a));
    let by_item = match (item_index, amount_index) {
        (Some(i), Some(a)) => sales_by_item(&filtered, i, a),
        _ => Vec::new(),
    };

    let (min_date, max_date, start, end) = view_dates;
    Ok(SalesView {
        sheet: sheet.to_string(),
        columns,
        date_column,
        min_date,
        max_date,
        start,
        end,
        total_amount: total,
        total_display: total.map(format_amount),
        by_item,
        total_rows: table.len(),
        table: filtered,
        notices,
    })
}

/// The filtered inventory as `filtered_inventory.csv`
pub fn inventory_csv(
    workbook: &Workbook,
    criteria: &DashboardCriteria,
    config: &DashboardConfig,
) -> Result<Vec<u8>> {
    to_csv(&inventory_view(workbook, criteria, config)?.table)
}

/// The filtered sales records as `sales_report.csv`
pub fn sales_csv(
    workbook: &Workbook,
    criteria: &DashboardCriteria,
    config: &DashboardConfig,
) -> Result<Vec<u8>> {
    to_csv(&sales_view(workbook, criteria, config)?.table)
}

/// The filtered sales records as `sales_report.xlsx`
pub fn sales_xlsx(
    workbook: &Workbook,
    criteria: &DashboardCriteria,
    config: &DashboardConfig,
) -> Result<Vec<u8>> {
    to_xlsx(&sales_view(workbook, criteria, config)?.table, "Sales Report")
}

fn missing_column_notice(column: &str, sheet: &str, consequence: &str) -> String {
    let err = DashboardError::MissingColumn {
        column: column.to_string(),
        sheet: sheet.to_string(),
    };
    format!("{}; {}", capitalize(&err.to_string()), consequence)
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
