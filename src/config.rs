//! Runtime configuration.
//!
//! Every field has a default matching the workbook the dashboard was built
//! for, so the server runs with no configuration at all. A JSON file can
//! override any subset of fields.

use crate::error::{DashboardError, Result};
use crate::schema::{ColumnMapping, DateColumnRule};
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_ENV: &str = "DASHBOARD_CONFIG";
pub const ADDR_ENV: &str = "DASHBOARD_ADDR";

pub const SERIAL_COLUMN: &str = "Serial No";
pub const ORIGIN_COLUMN: &str = "Carpet Origin & Manufacturer";
pub const SIZE_COLUMN: &str = "Size";
pub const STATUS_COLUMN: &str = "Current Status";
pub const ITEM_COLUMN: &str = "Items Details";
pub const AMOUNT_COLUMN: &str = "Amount in BHD";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Address the web server binds to
    pub bind_addr: String,
    /// Exact name of the inventory sheet
    pub inventory_sheet: String,
    /// Sales sheet names, tried in order
    pub sales_sheets: Vec<String>,
    pub inventory_columns: Vec<ColumnMapping>,
    pub sales_columns: Vec<ColumnMapping>,
    /// Date column rules, tried in order
    pub date_rules: Vec<DateColumnRule>,
    pub session_ttl_secs: u64,
    pub max_upload_bytes: usize,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            inventory_sheet: "Inventory - Aryana".to_string(),
            sales_sheets: vec![
                "Asia Carpets Sales".to_string(),
                "Sales - September 2025 (MD Joz and Aryana )".to_string(),
            ],
            inventory_columns: vec![
                ColumnMapping::new(SERIAL_COLUMN, &["Serial Number", "Serial"]),
                ColumnMapping::new(ORIGIN_COLUMN, &["Carpet Origin and Manufacturer", "Origin"]),
                ColumnMapping::new(SIZE_COLUMN, &[]),
                ColumnMapping::new(STATUS_COLUMN, &["Status"]),
            ],
            sales_columns: vec![
                ColumnMapping::new(ITEM_COLUMN, &["Item Details", "Items", "Item"]),
                ColumnMapping::new(AMOUNT_COLUMN, &["Amount (BHD)", "Amount"]),
            ],
            date_rules: vec![DateColumnRule::Exact("Date".to_string()), DateColumnRule::Detect],
            session_ttl_secs: 24 * 60 * 60,
            max_upload_bytes: 32 * 1024 * 1024,
            chart_width: 900,
            chart_height: 420,
        }
    }
}

impl DashboardConfig {
    /// Read a JSON config file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| DashboardError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Resolve the config from a CLI argument, then the environment
    ///
    /// The file path comes from `path_arg` or `DASHBOARD_CONFIG`;
    /// `DASHBOARD_ADDR` overrides the bind address either way.
    pub fn load(path_arg: Option<String>) -> Result<Self> {
        let path = path_arg.or_else(|| std::env::var(CONFIG_ENV).ok());
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Ok(addr) = std::env::var(ADDR_ENV) {
            config.bind_addr = addr;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sales_sheets.is_empty() {
            return Err(DashboardError::Config("sales_sheets must not be empty".into()));
        }
        if self.date_rules.is_empty() {
            return Err(DashboardError::Config("date_rules must not be empty".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(DashboardError::Config("max_upload_bytes must be positive".into()));
        }
        Ok(())
    }
}
