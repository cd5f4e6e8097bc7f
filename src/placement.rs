//! Template placement engine.
//!
//! Routes each record into its driver's workbook. A driver's first record
//! seeds a fresh copy of the template and fills the fixed header cells;
//! every later record is written into the stepped cells under the driver's
//! cursor. The cursor moves down one block after each written record.

use crate::config::{CapacityLimit, HeaderCells, OverflowPolicy, StamperConfig};
use crate::cursor::{CursorTable, DriverCursor, Occurrence};
use crate::error::{Result, StamperError};
use crate::models::{CellValue, DriverKey};
use crate::pay_period::PayPeriod;
use crate::records::Record;
use crate::template::{CellRef, OutputDocument, Template};
use std::collections::HashMap;
use tracing::{debug, warn};

/// What happened to a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// First record of a driver; a new workbook was seeded
    Seeded,
    /// Written into the stepped cells of an existing workbook
    Extended,
    /// Dropped because the driver's workbook is full
    Truncated,
}

/// Driver workbooks in first-seen order, indexed by driver key
#[derive(Debug, Default)]
pub struct DriverDocuments {
    documents: Vec<OutputDocument>,
    index: HashMap<DriverKey, usize>,
}

impl DriverDocuments {
    pub fn get(&self, driver: &DriverKey) -> Option<&OutputDocument> {
        self.index.get(driver).map(|&i| &self.documents[i])
    }

    fn get_mut(&mut self, driver: &DriverKey) -> Option<&mut OutputDocument> {
        self.index.get(driver).map(|&i| &mut self.documents[i])
    }

    fn insert(&mut self, driver: DriverKey, document: OutputDocument) -> &mut OutputDocument {
        let slot = *self.index.entry(driver).or_insert_with(|| {
            self.documents.push(document);
            self.documents.len() - 1
        });
        &mut self.documents[slot]
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn into_documents(self) -> Vec<OutputDocument> {
        self.documents
    }
}

/// Writes records into per-driver copies of one template
pub struct PlacementEngine<'t> {
    template: &'t Template,
    header: HeaderCells,
    column: u32,
    capacity: Option<CapacityLimit>,
    pay_period: Option<PayPeriod>,
}

impl<'t> PlacementEngine<'t> {
    pub fn new(
        template: &'t Template,
        config: &StamperConfig,
        pay_period: Option<PayPeriod>,
    ) -> Result<Self> {
        Ok(Self {
            template,
            header: config.layout.header.clone(),
            column: config.layout.repeat.column_index()?,
            capacity: config.capacity,
            pay_period,
        })
    }

    /// Place one record, creating or extending its driver's workbook
    pub fn place(
        &self,
        record: &Record,
        cursors: &mut CursorTable,
        documents: &mut DriverDocuments,
    ) -> Result<Placement> {
        let (cursor, occurrence) = cursors.get_or_init(&record.driver);

        let placement = match occurrence {
            Occurrence::First => {
                let document = documents.insert(
                    record.driver.clone(),
                    OutputDocument::seed(self.template, record.display_name.as_str()),
                );
                self.seed(record, document);
                Placement::Seeded
            }
            Occurrence::Subsequent => {
                if self.over_capacity(record, &cursor)? {
                    return Ok(Placement::Truncated);
                }
                let document = documents.get_mut(&record.driver).ok_or_else(|| {
                    StamperError::template(format!(
                        "no workbook registered for driver '{}'",
                        record.display_name
                    ))
                })?;
                self.extend(record, &cursor, document)?;
                Placement::Extended
            }
        };

        cursors.advance(&record.driver);
        Ok(placement)
    }

    fn seed(&self, record: &Record, document: &mut OutputDocument) {
        let header = &self.header;
        document.write(header.trip_id, record.trip_id.clone());
        document.write(header.driver_name, record.driver_name.clone());
        document.write(header.facility_sequence, record.facility_sequence.clone());
        document.write(header.estimated_cost, record.estimated_cost.clone());

        if let Some(period) = &self.pay_period {
            document.write(header.run_date, date_cell(period.run_date));
            document.write(header.period_start, date_cell(period.start));
            document.write(header.period_end, date_cell(period.end));
        }

        debug!(
            "Seeded workbook for '{}' from row {} ({} at {})",
            record.display_name, record.row, record.trip_id, header.trip_id
        );
    }

    fn extend(
        &self,
        record: &Record,
        cursor: &DriverCursor,
        document: &mut OutputDocument,
    ) -> Result<()> {
        let trip = CellRef::new(cursor.next_trip_row, self.column)?;
        let facility = CellRef::new(cursor.next_facility_row, self.column)?;
        let cost = CellRef::new(cursor.next_cost_row, self.column)?;

        document.write(trip, record.trip_id.clone());
        document.write(facility, record.facility_sequence.clone());
        document.write(cost, record.estimated_cost.clone());

        debug!(
            "Row {} for '{}' -> {}/{}/{}",
            record.row, record.display_name, trip, facility, cost
        );
        Ok(())
    }

    /// Apply the capacity cap; true when the record must be skipped
    fn over_capacity(&self, record: &Record, cursor: &DriverCursor) -> Result<bool> {
        let Some(limit) = self.capacity else {
            return Ok(false);
        };
        if cursor.next_trip_row <= limit.last_trip_row {
            return Ok(false);
        }

        match limit.policy {
            OverflowPolicy::Truncate => {
                warn!(
                    "Template full for driver '{}': skipping trip {} from row {} (next trip row {} > {})",
                    record.display_name,
                    record.trip_id,
                    record.row,
                    cursor.next_trip_row,
                    limit.last_trip_row
                );
                Ok(true)
            }
            OverflowPolicy::Fail => Err(StamperError::CapacityExceeded {
                driver: record.display_name.clone(),
                row: cursor.next_trip_row,
                last_row: limit.last_trip_row,
            }),
        }
    }
}

fn date_cell(date: chrono::NaiveDate) -> CellValue {
    CellValue::Text(PayPeriod::format(date))
}
