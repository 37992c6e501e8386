use crate::table::{CellValue, Table};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref AMOUNT_NOISE: Regex = Regex::new(r"(?i)bhd|[,\s]").unwrap();
}

/// Summed amount for one item label
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemTotal {
    pub item: String,
    pub amount: f64,
}

/// Read a currency cell as a number
///
/// Text like `"1,250.500 BHD"` is accepted. Anything unreadable counts as
/// nothing and is skipped by the sums.
pub fn parse_amount(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => AMOUNT_NOISE
            .replace_all(s, "")
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Sum of the amount column over the whole table
pub fn total_amount(table: &Table, amount_col: usize) -> f64 {
    table.column(amount_col).filter_map(parse_amount).sum()
}

/// Group rows by item label, sum each group, sort by sum descending
///
/// Groups start out in the order their labels first appear; the sort is
/// stable, so equal sums keep that order. Rows without a label are grouped
/// under the empty label so the group sums always add up to the table total.
pub fn sales_by_item(table: &Table, item_col: usize, amount_col: usize) -> Vec<ItemTotal> {
    let mut groups: Vec<ItemTotal> = Vec::new();

    for row in &table.rows {
        let item = row
            .get(item_col)
            .map(|cell| cell.to_string().trim().to_string())
            .unwrap_or_default();
        let amount = row.get(amount_col).and_then(parse_amount).unwrap_or(0.0);

        match groups.iter_mut().find(|g| g.item == item) {
            Some(group) => group.amount += amount,
            None => groups.push(ItemTotal { item, amount }),
        }
    }

    groups.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    groups
}

/// Format an amount with thousands separators and two decimals
pub fn format_amount(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}
