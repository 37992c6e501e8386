//! Multi-criteria row filtering.
//!
//! A `FilterCriteria` is a conjunction of predicates. Inactive predicates
//! (blank text, empty status set) are skipped, so default criteria return
//! the table unchanged.

use crate::table::{CellValue, Table};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// Case-insensitive substring match on one column
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextPredicate {
    pub column: String,
    pub needle: String,
}

impl TextPredicate {
    pub fn new(column: &str, needle: &str) -> Self {
        TextPredicate {
            column: column.to_string(),
            needle: needle.to_string(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.needle.trim().is_empty()
    }

    fn matches(&self, cell: &CellValue) -> bool {
        if cell.is_empty() {
            return false;
        }
        cell.to_string()
            .to_lowercase()
            .contains(&self.needle.trim().to_lowercase())
    }
}

/// Row's value must be one of the accepted values
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusPredicate {
    pub column: String,
    pub accepted: BTreeSet<String>,
}

impl StatusPredicate {
    pub fn is_active(&self) -> bool {
        !self.accepted.is_empty()
    }

    fn matches(&self, cell: &CellValue) -> bool {
        !cell.is_empty() && self.accepted.contains(&cell.to_string())
    }
}

/// Inclusive date interval on an already coerced date column
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DateRange {
    pub column: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    fn matches(&self, cell: &CellValue) -> bool {
        match cell.as_date() {
            Some(date) => self.start <= date && date <= self.end,
            None => false,
        }
    }
}

/// All predicates for one render pass
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FilterCriteria {
    pub text: Vec<TextPredicate>,
    pub status: Option<StatusPredicate>,
    pub date_range: Option<DateRange>,
}

impl FilterCriteria {
    pub fn is_active(&self) -> bool {
        self.text.iter().any(TextPredicate::is_active)
            || self.status.as_ref().is_some_and(StatusPredicate::is_active)
            || self.date_range.is_some()
    }
}

/// Return the rows of `table` that satisfy every active predicate
///
/// A predicate naming a column the table does not have matches nothing.
pub fn apply(table: &Table, criteria: &FilterCriteria) -> Table {
    if !criteria.is_active() {
        return table.clone();
    }

    let mut checks: Vec<Box<dyn Fn(&[CellValue]) -> bool + '_>> = Vec::new();

    for predicate in criteria.text.iter().filter(|p| p.is_active()) {
        let index = table.column_index(&predicate.column);
        checks.push(Box::new(move |row: &[CellValue]| {
            index.and_then(|i| row.get(i)).is_some_and(|cell| predicate.matches(cell))
        }));
    }

    if let Some(predicate) = criteria.status.as_ref().filter(|p| p.is_active()) {
        let index = table.column_index(&predicate.column);
        checks.push(Box::new(move |row: &[CellValue]| {
            index.and_then(|i| row.get(i)).is_some_and(|cell| predicate.matches(cell))
        }));
    }

    if let Some(range) = &criteria.date_range {
        let index = table.column_index(&range.column);
        checks.push(Box::new(move |row: &[CellValue]| {
            index.and_then(|i| row.get(i)).is_some_and(|cell| range.matches(cell))
        }));
    }

    table.retain_rows(|row| checks.iter().all(|check| check(row)))
}
