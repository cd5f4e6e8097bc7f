//! Error handling for payroll stamping operations.
//!
//! Provides error types with context for schema resolution, record
//! extraction, template patching, and output persistence failures.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StamperError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "Missing target columns in header row {header_row}: {}",
        .missing.join(", ")
    )]
    Schema {
        header_row: u32,
        missing: Vec<String>,
    },

    #[error("Malformed record at row {row}: {reason}")]
    MalformedRecord { row: u32, reason: String },

    #[error("Storage error for {path}: {reason}")]
    Storage { path: PathBuf, reason: String },

    #[error("Invalid template workbook: {reason}")]
    Template { reason: String },

    #[error(
        "Template capacity exceeded for driver '{driver}': row {row} is past the last usable row {last_row}"
    )]
    CapacityExceeded {
        driver: String,
        row: u32,
        last_row: u32,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl StamperError {
    pub fn storage(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::Storage {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn template(reason: impl Into<String>) -> Self {
        Self::Template {
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Field names reported by a schema failure, empty for other variants
    pub fn missing_columns(&self) -> &[String] {
        match self {
            Self::Schema { missing, .. } => missing,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, StamperError>;
