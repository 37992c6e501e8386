//! Error types shared by the loader, the view and the web layer.

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Everything that can go wrong between an upload and a rendered dashboard
#[derive(Debug, Error)]
pub enum DashboardError {
    /// One or more requested sheets are absent from the workbook
    #[error("sheet not found: expected {}", quote_all(.sheets))]
    SheetNotFound { sheets: Vec<String> },

    /// No column matched any of the date column rules
    #[error("could not find a date column (tried {tried}); check the sheet's header row")]
    MissingDateColumn { tried: String },

    /// Header detection found no non-empty row
    #[error("sheet \"{sheet}\" has no non-empty rows")]
    EmptySheet { sheet: String },

    /// A column the view needs is not in the sheet
    #[error("column \"{column}\" not found in sheet \"{sheet}\"")]
    MissingColumn { column: String, sheet: String },

    /// The uploaded bytes could not be read as a workbook
    #[error("could not read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[cfg(feature = "web")]
    #[error("chart error: {0}")]
    Chart(String),

    #[cfg(feature = "web")]
    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),
}

fn quote_all(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("\"{}\"", name))
        .collect::<Vec<_>>()
        .join(", ")
}
