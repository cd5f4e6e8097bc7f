//! Input trip-log grid.
//!
//! Loads the active worksheet of an xlsx workbook into a row-major grid of
//! [`CellValue`]s addressed by 1-based row and column, the coordinates the
//! header resolver and record extractor work in.

use crate::error::{Result, StamperError};
use crate::models::CellValue;
use crate::template::package::{PackageArchive, active_sheet};
use calamine::{Data, Reader, Xlsx};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// A two-dimensional grid of cell values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputGrid {
    rows: Vec<Vec<CellValue>>,
}

impl InputGrid {
    /// Build a grid from rows; `rows[0]` is sheet row 1
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Load the worksheet the workbook opens on
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| StamperError::storage(path, e))?;
        Self::from_xlsx_bytes(path, bytes)
    }

    /// Parse xlsx bytes; `source` only labels errors and logs
    pub fn from_xlsx_bytes(source: &Path, bytes: Vec<u8>) -> Result<Self> {
        let sheet = {
            let mut archive: PackageArchive<'_> = ZipArchive::new(Cursor::new(bytes.as_slice()))
                .map_err(|e| StamperError::storage(source, e))?;
            active_sheet(&mut archive).map_err(|e| StamperError::storage(source, e))?
        };

        let mut workbook =
            Xlsx::new(Cursor::new(bytes)).map_err(|e| StamperError::storage(source, e))?;
        let range = workbook
            .worksheet_range(&sheet.name)
            .map_err(|e| StamperError::storage(source, e))?;

        // calamine ranges start at the first used cell, not A1
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows = vec![Vec::new(); start_row as usize];
        for source_row in range.rows() {
            let mut row = vec![CellValue::Empty; start_col as usize];
            row.extend(source_row.iter().map(cell_value));
            rows.push(row);
        }

        debug!(
            "Loaded {} rows from sheet '{}' of {} (data starts at row {}, column {})",
            rows.len(),
            sheet.name,
            source.display(),
            start_row + 1,
            start_col + 1
        );

        Ok(Self { rows })
    }

    /// Number of rows, counting leading empty rows
    pub fn row_count(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Cells of a 1-based row, `None` past the end of the sheet
    pub fn row(&self, row: u32) -> Option<&[CellValue]> {
        if row == 0 {
            return None;
        }
        self.rows.get(row as usize - 1).map(Vec::as_slice)
    }

    /// Cell at a 1-based coordinate; missing cells read as empty
    pub fn cell(&self, row: u32, col: u32) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        if col == 0 {
            return &EMPTY;
        }
        self.row(row)
            .and_then(|cells| cells.get(col as usize - 1))
            .unwrap_or(&EMPTY)
    }
}

/// Convert a calamine cell without coercing its type
fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}
