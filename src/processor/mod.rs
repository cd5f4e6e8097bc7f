//! Batch orchestration.
//!
//! Drives one stamping run end to end: resolves the input columns, walks
//! the trip records in input order, and routes each through the cursor
//! table and placement engine. All per-run state lives inside
//! [`BatchProcessor::run`], so every run starts from an empty cursor table
//! and a fresh set of workbooks.

pub mod delivery;

#[cfg(test)]
pub mod tests;

use crate::config::StamperConfig;
use crate::cursor::CursorTable;
use crate::error::Result;
use crate::grid::InputGrid;
use crate::header::resolve_columns;
use crate::models::BatchStats;
use crate::pay_period::{PayPeriod, today_at_offset};
use crate::placement::{DriverDocuments, Placement, PlacementEngine};
use crate::records::Records;
use crate::template::{OutputDocument, Template};

use chrono::NaiveDate;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Runs stamping batches with a fixed configuration
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    config: StamperConfig,
    run_date: Option<NaiveDate>,
}

impl BatchProcessor {
    /// Create a processor; fails if the configuration is inconsistent
    pub fn new(config: StamperConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            run_date: None,
        })
    }

    /// Pin the date used for pay period stamping instead of reading the clock
    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = Some(run_date);
        self
    }

    pub fn config(&self) -> &StamperConfig {
        &self.config
    }

    /// Load input and template from disk, then run
    pub fn run_files(&self, input: &Path, template: &Path) -> Result<Batch> {
        let grid = InputGrid::open(input)?;
        let template = Template::open(template)?;
        self.run(&grid, &template)
    }

    /// Stamp every record of `input` into per-driver copies of `template`
    ///
    /// Returns only after the whole input has been consumed. Any error
    /// aborts the run and discards the workbooks built so far.
    pub fn run(&self, input: &InputGrid, template: &Template) -> Result<Batch> {
        let start_time = Instant::now();
        let columns = resolve_columns(input, self.config.header_row)?;

        let pay_period = if self.config.stamp_pay_period {
            let run_date = match self.run_date {
                Some(date) => date,
                None => today_at_offset(self.config.utc_offset_hours)?,
            };
            let period = PayPeriod::containing(run_date);
            debug!(
                "Pay period {} - {} (run date {})",
                period.start, period.end, period.run_date
            );
            Some(period)
        } else {
            None
        };

        let engine = PlacementEngine::new(template, &self.config, pay_period)?;
        let mut cursors = CursorTable::from_layout(&self.config.layout.repeat);
        let mut documents = DriverDocuments::default();
        let mut stats = BatchStats::default();

        let mut records = Records::new(
            input,
            columns,
            self.config.first_data_row,
            self.config.name_matching,
        );
        for record in records.by_ref() {
            let record = record?;
            match engine.place(&record, &mut cursors, &mut documents)? {
                Placement::Seeded | Placement::Extended => stats.records_processed += 1,
                Placement::Truncated => stats.records_truncated += 1,
            }
        }

        stats.rows_read = records.rows_read();
        stats.empty_rows_skipped = records.empty_rows_skipped();
        stats.drivers = documents.len();

        info!(
            "Stamped {} records for {} drivers from {} in {:.2?}",
            stats.records_processed,
            stats.drivers,
            template.name(),
            start_time.elapsed()
        );

        Ok(Batch {
            documents: documents.into_documents(),
            stats,
            pay_period,
        })
    }
}

/// Result of one run: a workbook per driver, in first-seen order
#[derive(Debug)]
pub struct Batch {
    documents: Vec<OutputDocument>,
    stats: BatchStats,
    pay_period: Option<PayPeriod>,
}

impl Batch {
    pub fn documents(&self) -> &[OutputDocument] {
        &self.documents
    }

    /// Workbook for a driver, looked up by its display name
    pub fn document(&self, driver_name: &str) -> Option<&OutputDocument> {
        self.documents
            .iter()
            .find(|doc| doc.driver_name() == driver_name)
    }

    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    pub fn pay_period(&self) -> Option<&PayPeriod> {
        self.pay_period.as_ref()
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

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a OutputDocument;
    type IntoIter = std::slice::Iter<'a, OutputDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}
