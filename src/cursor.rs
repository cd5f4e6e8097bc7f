//! Per-driver write cursors.
//!
//! Each driver owns three row cursors, one per stepped field. A cursor is
//! created on the driver's first record, pointing at the template's first
//! trip block, and moves down one block after every record written for
//! that driver. Cursors of different drivers never influence each other.

use crate::config::RepeatBlock;
use crate::models::DriverKey;
use std::collections::HashMap;

/// Next target rows for one driver's trip, facility and cost cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverCursor {
    pub next_trip_row: u32,
    pub next_facility_row: u32,
    pub next_cost_row: u32,
}

impl DriverCursor {
    fn advanced(self, offset: u32) -> Self {
        Self {
            next_trip_row: self.next_trip_row.saturating_add(offset),
            next_facility_row: self.next_facility_row.saturating_add(offset),
            next_cost_row: self.next_cost_row.saturating_add(offset),
        }
    }
}

/// Whether a driver had been seen before the current record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    First,
    Subsequent,
}

/// Cursor state for every driver seen in a run
#[derive(Debug, Clone)]
pub struct CursorTable {
    start: DriverCursor,
    offset: u32,
    cursors: HashMap<DriverKey, DriverCursor>,
}

impl CursorTable {
    pub fn new(start: DriverCursor, offset: u32) -> Self {
        Self {
            start,
            offset,
            cursors: HashMap::new(),
        }
    }

    pub fn from_layout(block: &RepeatBlock) -> Self {
        Self::new(
            DriverCursor {
                next_trip_row: block.trip_row_start,
                next_facility_row: block.facility_row_start,
                next_cost_row: block.cost_row_start,
            },
            block.row_offset,
        )
    }

    /// Current cursor for `driver`, creating it at the start rows if new
    pub fn get_or_init(&mut self, driver: &DriverKey) -> (DriverCursor, Occurrence) {
        if let Some(cursor) = self.cursors.get(driver) {
            return (*cursor, Occurrence::Subsequent);
        }
        self.cursors.insert(driver.clone(), self.start);
        (self.start, Occurrence::First)
    }

    /// Move `driver`'s cursor down one block; no-op for unknown drivers
    pub fn advance(&mut self, driver: &DriverKey) {
        if let Some(cursor) = self.cursors.get_mut(driver) {
            *cursor = cursor.advanced(self.offset);
        }
    }

    pub fn get(&self, driver: &DriverKey) -> Option<DriverCursor> {
        self.cursors.get(driver).copied()
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}
