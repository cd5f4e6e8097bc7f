//! Payroll Stamper Library
//!
//! Splits a trip-log spreadsheet into one payroll workbook per driver by
//! stamping each driver's trips into a copy of a fixed-layout xlsx
//! template.
//!
//! This library provides tools for:
//! - Resolving trip-log columns by header name
//! - Extracting trip records and grouping them by driver
//! - Tracking a per-driver write cursor through the template's trip blocks
//! - Patching template worksheets while preserving every other package part
//! - Writing the per-driver workbooks as files or a zip archive

pub mod config;
pub mod constants;
pub mod cursor;
pub mod error;
pub mod grid;
pub mod header;
pub mod models;
pub mod pay_period;
pub mod placement;
pub mod processor;
pub mod records;
pub mod template;

pub mod cli {
    pub mod args;
    pub mod commands;
}

pub use config::{OverflowPolicy, StamperConfig};
pub use error::{Result, StamperError};
pub use grid::InputGrid;
pub use models::{BatchStats, CellValue, NameMatching};
pub use processor::{Batch, BatchProcessor};
pub use template::{CellRef, OutputDocument, Template};
