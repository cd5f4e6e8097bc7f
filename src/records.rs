//! Trip record extraction.
//!
//! Walks the data rows below the header and yields one [`Record`] per
//! non-empty row, reading the four required fields through the resolved
//! [`ColumnMap`]. Values are passed through untouched; only the driver
//! name is additionally turned into a grouping key.

use crate::error::{Result, StamperError};
use crate::grid::InputGrid;
use crate::header::{ColumnMap, Field};
use crate::models::{CellValue, DriverKey, NameMatching};
use tracing::trace;

/// One trip row of the input sheet
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based source row
    pub row: u32,
    pub trip_id: CellValue,
    pub driver_name: CellValue,
    pub facility_sequence: CellValue,
    pub estimated_cost: CellValue,
    /// Grouping key derived from `driver_name`
    pub driver: DriverKey,
    /// Trimmed driver name as written in the sheet
    pub display_name: String,
}

/// Lazy, single-pass sequence of records in input row order
pub struct Records<'a> {
    grid: &'a InputGrid,
    columns: ColumnMap,
    matching: NameMatching,
    next_row: u32,
    last_row: u32,
    rows_read: usize,
    empty_rows_skipped: usize,
}

impl<'a> Records<'a> {
    pub fn new(
        grid: &'a InputGrid,
        columns: ColumnMap,
        first_data_row: u32,
        matching: NameMatching,
    ) -> Self {
        Self {
            grid,
            columns,
            matching,
            next_row: first_data_row.max(1),
            last_row: grid.row_count(),
            rows_read: 0,
            empty_rows_skipped: 0,
        }
    }

    /// Data rows examined so far, empty ones included
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    pub fn empty_rows_skipped(&self) -> usize {
        self.empty_rows_skipped
    }

    fn extract(&self, row: u32, cells: &[CellValue]) -> Result<Record> {
        let width = cells.len() as u32;
        let read = |field: Field| -> Result<CellValue> {
            let column = self.columns.column(field);
            if column == 0 || column > width {
                return Err(StamperError::MalformedRecord {
                    row,
                    reason: format!(
                        "column {} for '{}' is outside the row's {} cells",
                        column,
                        field.header(),
                        width
                    ),
                });
            }
            Ok(cells[column as usize - 1].clone())
        };

        let trip_id = read(Field::TripId)?;
        let driver_name = read(Field::DriverName)?;
        let facility_sequence = read(Field::FacilitySequence)?;
        let estimated_cost = read(Field::EstimatedCost)?;

        // A blank name is an ordinary key; those rows share one workbook
        let raw_name = driver_name.to_string();
        let driver = DriverKey::new(&raw_name, self.matching);
        let display_name = raw_name.trim().to_string();

        Ok(Record {
            row,
            trip_id,
            driver_name,
            facility_sequence,
            estimated_cost,
            driver,
            display_name,
        })
    }
}

impl Iterator for Records<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_row <= self.last_row {
            let row = self.next_row;
            self.next_row += 1;
            self.rows_read += 1;

            let cells = self.grid.row(row).unwrap_or(&[]);
            if cells.iter().all(CellValue::is_empty) {
                trace!("Skipping empty row {}", row);
                self.empty_rows_skipped += 1;
                continue;
            }

            let record = self.extract(row, cells);
            if record.is_err() {
                // Nothing after a malformed row is trusted
                self.next_row = self.last_row + 1;
            }
            return Some(record);
        }
        None
    }
}
