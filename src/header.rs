//! Header row resolution.
//!
//! Scans the input sheet's header row and maps each required trip-log
//! column to its physical position, so the record extractor can read
//! columns by name regardless of their order in the sheet.

use crate::constants::columns;
use crate::error::{Result, StamperError};
use crate::grid::InputGrid;
use tracing::{debug, warn};

/// Logical fields every trip record carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    TripId,
    DriverName,
    FacilitySequence,
    EstimatedCost,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::TripId,
        Field::DriverName,
        Field::FacilitySequence,
        Field::EstimatedCost,
    ];

    /// Header text identifying this field's column
    pub fn header(&self) -> &'static str {
        match self {
            Field::TripId => columns::TRIP_ID,
            Field::DriverName => columns::DRIVER_NAME,
            Field::FacilitySequence => columns::FACILITY_SEQUENCE,
            Field::EstimatedCost => columns::ESTIMATED_COST,
        }
    }

    fn from_header(text: &str) -> Option<Self> {
        Field::ALL.into_iter().find(|field| field.header() == text)
    }
}

/// Resolved 1-based column index of every required field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub trip_id: u32,
    pub driver_name: u32,
    pub facility_sequence: u32,
    pub estimated_cost: u32,
}

impl ColumnMap {
    pub fn column(&self, field: Field) -> u32 {
        match field {
            Field::TripId => self.trip_id,
            Field::DriverName => self.driver_name,
            Field::FacilitySequence => self.facility_sequence,
            Field::EstimatedCost => self.estimated_cost,
        }
    }

    /// Right-most column any field reads from
    pub fn max_column(&self) -> u32 {
        Field::ALL
            .into_iter()
            .map(|field| self.column(field))
            .max()
            .unwrap_or(0)
    }
}

/// Map required fields to columns using the header row
///
/// Every cell of `header_row` is compared, after trimming, with the
/// required header names. Fails with a schema error listing every field
/// that was not found.
pub fn resolve_columns(grid: &InputGrid, header_row: u32) -> Result<ColumnMap> {
    let mut builder = ColumnMapBuilder::default();

    if let Some(cells) = grid.row(header_row) {
        for (idx, cell) in cells.iter().enumerate() {
            let text = cell.to_string();
            if let Some(field) = Field::from_header(text.trim()) {
                builder.set(field, idx as u32 + 1);
            }
        }
    } else {
        warn!("Header row {} is past the end of the input sheet", header_row);
    }

    let map = builder.build(header_row)?;
    debug!("Resolved columns from header row {}: {:?}", header_row, map);
    Ok(map)
}

/// Accumulates column positions while the header row is scanned
#[derive(Default)]
struct ColumnMapBuilder {
    trip_id: Option<u32>,
    driver_name: Option<u32>,
    facility_sequence: Option<u32>,
    estimated_cost: Option<u32>,
}

impl ColumnMapBuilder {
    /// Later duplicates of a header replace earlier ones
    fn set(&mut self, field: Field, column: u32) {
        let slot = match field {
            Field::TripId => &mut self.trip_id,
            Field::DriverName => &mut self.driver_name,
            Field::FacilitySequence => &mut self.facility_sequence,
            Field::EstimatedCost => &mut self.estimated_cost,
        };
        if let Some(previous) = slot.replace(column) {
            warn!(
                "Header '{}' appears in columns {} and {}; using column {}",
                field.header(),
                previous,
                column,
                column
            );
        }
    }

    fn build(self, header_row: u32) -> Result<ColumnMap> {
        match (
            self.trip_id,
            self.driver_name,
            self.facility_sequence,
            self.estimated_cost,
        ) {
            (Some(trip_id), Some(driver_name), Some(facility_sequence), Some(estimated_cost)) => {
                Ok(ColumnMap {
                    trip_id,
                    driver_name,
                    facility_sequence,
                    estimated_cost,
                })
            }
            (trip_id, driver_name, facility_sequence, estimated_cost) => {
                let missing = [
                    (Field::TripId, trip_id),
                    (Field::DriverName, driver_name),
                    (Field::FacilitySequence, facility_sequence),
                    (Field::EstimatedCost, estimated_cost),
                ]
                .into_iter()
                .filter(|(_, column)| column.is_none())
                .map(|(field, _)| field.header().to_string())
                .collect();

                Err(StamperError::Schema {
                    header_row,
                    missing,
                })
            }
        }
    }
}
