/*!
# Carpet Dashboard

A browser-based dashboard for a carpet trader's inventory and sales workbook,
built in Rust.

## Overview

The user uploads a multi-sheet workbook, then searches the inventory, narrows
the sales records to a date range, sees the sales total and per-item sums,
and downloads whatever is currently on screen.

## Architecture

Every request recomputes the page from the uploaded workbook and the query
string; nothing is mutated after upload.

### Core
- **loader**: reads every sheet of an upload into raw grids and builds tables
- **header**: finds the header row of sheets that start with blank rows
- **schema**: maps loosely named columns onto canonical names, finds the date
  column and coerces dates
- **filter**: substring, status and date-range predicates combined with AND
- **aggregate**: per-item sums sorted descending, and the sales total
- **downloader**: CSV and XLSX export
- **view**: the pure `render(workbook, criteria, config)` function

### Web Layer (`web` feature)
- **app**: axum routing, sessions, upload and downloads
- **graph**: the sales-by-item bar chart as SVG

## REST API Endpoints

- `GET /` - Dashboard page (upload prompt when no workbook is loaded)
- `POST /upload` - Multipart upload of the workbook (field `workbook`)
- `GET /api/view` - The rendered dashboard as JSON
- `GET /download/filtered_inventory.csv` - Filtered inventory
- `GET /download/sales_report.csv` - Filtered sales records
- `GET /download/sales_report.xlsx` - Filtered sales records as a workbook
*/

pub mod aggregate;
pub mod config;
pub mod downloader;
pub mod error;
pub mod filter;
pub mod header;
pub mod loader;
pub mod schema;
pub mod table;
pub mod view;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod graph;

pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use loader::Workbook;
pub use table::{CellValue, Table};
pub use view::{DashboardCriteria, DashboardView, Panel, render};
