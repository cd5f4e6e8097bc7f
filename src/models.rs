//! Core data structures shared across the stamping pipeline.
//!
//! Defines cell values as read from the input grid, the driver grouping
//! key, and batch statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell value, passed through from input to template unchanged
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel serial date; written back as a number so the template's
    /// cell style decides how it renders
    DateTime(f64),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// True for empty cells and whitespace-only text
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) | CellValue::DateTime(n) => Some(*n),
            _ => None,
        }
    }
}

/// Render a number the way a spreadsheet shows it without a format:
/// integral values without a trailing `.0`
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(n) | CellValue::DateTime(n) => f.write_str(&format_number(*n)),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// How raw driver names are turned into grouping keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameMatching {
    /// Raw cell text is the key; "Ann" and "ann " are different drivers
    Exact,
    /// Trimmed, whitespace-collapsed, case-folded text is the key
    #[default]
    Normalized,
}

/// Grouping key for a driver's records, cursor, and workbook
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverKey(String);

impl DriverKey {
    pub fn new(raw_name: &str, matching: NameMatching) -> Self {
        match matching {
            NameMatching::Exact => DriverKey(raw_name.to_string()),
            NameMatching::Normalized => DriverKey(normalize_name(raw_name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim, collapse inner whitespace runs, and case-fold a driver name
pub fn normalize_name(raw_name: &str) -> String {
    raw_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Batch statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchStats {
    /// Data rows examined below the header, including empty ones
    pub rows_read: usize,
    /// Records written into a workbook
    pub records_processed: usize,
    pub empty_rows_skipped: usize,
    /// Records dropped because their driver's template was full
    pub records_truncated: usize,
    pub drivers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_empty() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::text("   ").is_empty());
        assert!(!CellValue::text("T1").is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
        assert!(!CellValue::Bool(false).is_empty());
    }

    #[test]
    fn test_display_numbers() {
        assert_eq!(CellValue::Number(10.0).to_string(), "10");
        assert_eq!(CellValue::Number(12.5).to_string(), "12.5");
        assert_eq!(CellValue::Number(-3.0).to_string(), "-3");
        assert_eq!(CellValue::Bool(true).to_string(), "TRUE");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn test_normalized_keys_merge_formatting_variants() {
        let a = DriverKey::new("  Ann   Lee ", NameMatching::Normalized);
        let b = DriverKey::new("ann lee", NameMatching::Normalized);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "ann lee");
    }

    #[test]
    fn test_exact_keys_keep_variants_apart() {
        let a = DriverKey::new("Ann", NameMatching::Exact);
        let b = DriverKey::new("ann", NameMatching::Exact);
        let c = DriverKey::new("Ann ", NameMatching::Exact);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
