//! A1-style cell references.

use crate::constants::{XLSX_MAX_COLUMNS, XLSX_MAX_ROWS};
use crate::error::{Result, StamperError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// 1-based worksheet coordinate, ordered row-major like `<sheetData>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

fn a1_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]{1,7})$").expect("static A1 pattern is valid")
    })
}

impl CellRef {
    /// Unchecked constructor for compile-time constants
    pub const fn at(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Build a reference, rejecting coordinates outside the xlsx grid
    pub fn new(row: u32, col: u32) -> Result<Self> {
        if row == 0 || row > XLSX_MAX_ROWS {
            return Err(StamperError::template(format!(
                "row {} is outside 1..={}",
                row, XLSX_MAX_ROWS
            )));
        }
        if col == 0 || col > XLSX_MAX_COLUMNS {
            return Err(StamperError::template(format!(
                "column {} is outside 1..={}",
                col, XLSX_MAX_COLUMNS
            )));
        }
        Ok(Self { row, col })
    }

    pub fn column_letters(&self) -> String {
        column_letters(self.col)
    }
}

/// Convert column letters ("A", "AB") to a 1-based index
pub fn column_index(letters: &str) -> Result<u32> {
    let letters = letters.trim();
    if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic())
    {
        return Err(StamperError::template(format!(
            "invalid column letters '{}'",
            letters
        )));
    }
    let index = letters
        .chars()
        .fold(0u32, |acc, c| acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1));
    if index > XLSX_MAX_COLUMNS {
        return Err(StamperError::template(format!(
            "column '{}' is past the last xlsx column",
            letters
        )));
    }
    Ok(index)
}

/// Convert a 1-based column index to letters
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

impl FromStr for CellRef {
    type Err = StamperError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = a1_pattern()
            .captures(s.trim())
            .ok_or_else(|| StamperError::template(format!("invalid cell reference '{}'", s)))?;
        let col = column_index(&caps[1])?;
        let row = caps[2]
            .parse::<u32>()
            .map_err(|_| StamperError::template(format!("invalid row in '{}'", s)))?;
        CellRef::new(row, col)
    }
}

impl TryFrom<String> for CellRef {
    type Error = StamperError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CellRef> for String {
    fn from(cell: CellRef) -> Self {
        cell.to_string()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letters(), self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_references() {
        assert_eq!("B11".parse::<CellRef>().unwrap(), CellRef { row: 11, col: 2 });
        assert_eq!("d4".parse::<CellRef>().unwrap(), CellRef { row: 4, col: 4 });
        assert_eq!("$AA$100".parse::<CellRef>().unwrap(), CellRef { row: 100, col: 27 });
    }

    #[test]
    fn test_display_round_trips_through_letters() {
        assert_eq!(CellRef::new(16, 2).unwrap().to_string(), "B16");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(16_384), "XFD");
        assert_eq!(column_index("XFD").unwrap(), 16_384);
    }

    #[test]
    fn test_rejects_invalid_references() {
        assert!("".parse::<CellRef>().is_err());
        assert!("11B".parse::<CellRef>().is_err());
        assert!("B0".parse::<CellRef>().is_err());
        assert!("XFE1".parse::<CellRef>().is_err());
        assert!("A1048577".parse::<CellRef>().is_err());
        assert!(column_index("B2").is_err());
    }

    #[test]
    fn test_row_major_ordering() {
        let b2 = CellRef::new(2, 2).unwrap();
        let z1 = CellRef::new(1, 26).unwrap();
        assert!(z1 < b2);
    }
}
