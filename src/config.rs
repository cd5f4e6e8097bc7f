//! Configuration management and validation.
//!
//! Holds the input sheet geometry, the template cell contract, driver
//! grouping policy, the optional template capacity cap, and pay period
//! stamping settings. Configurations can be loaded from TOML; any field
//! left out of the file keeps its default.
//!
//! The default layout matches the shipped payroll template:
//!
//! ```text
//! D3   run date            D4   driver name
//! D6   pay period start    D7   pay period end
//! B11  first trip id       B13  first facility sequence   B14  first cost
//! B16, B21, ...            B18, B23, ...                  B19, B24, ...
//! ```

use crate::constants::{
    DEFAULT_FIRST_DATA_ROW, DEFAULT_HEADER_ROW, DEFAULT_UTC_OFFSET_HOURS, XLSX_MAX_ROWS,
    header_cells, repeat_block,
};
use crate::error::{Result, StamperError};
use crate::models::NameMatching;
use crate::template::CellRef;
use crate::template::cell_ref::column_index;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Top-level configuration for a stamping run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StamperConfig {
    /// Row of the input sheet holding column headers (1-based)
    pub header_row: u32,

    /// First input row holding trip data (1-based)
    pub first_data_row: u32,

    /// How driver names are compared when grouping
    pub name_matching: NameMatching,

    /// Write run date and pay period into seeded workbooks
    pub stamp_pay_period: bool,

    /// Fixed UTC offset used to determine "today" for pay period stamping
    pub utc_offset_hours: i32,

    /// Optional cap on stepped trip rows
    pub capacity: Option<CapacityLimit>,

    /// Template cell contract
    pub layout: TemplateLayout,
}

/// Where the engine writes in the template worksheet
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateLayout {
    pub header: HeaderCells,
    pub repeat: RepeatBlock,
}

/// Cells written once per driver, on the first record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderCells {
    pub trip_id: CellRef,
    pub driver_name: CellRef,
    pub facility_sequence: CellRef,
    pub estimated_cost: CellRef,
    pub run_date: CellRef,
    pub period_start: CellRef,
    pub period_end: CellRef,
}

impl Default for HeaderCells {
    fn default() -> Self {
        Self {
            trip_id: header_cells::TRIP_ID,
            driver_name: header_cells::DRIVER_NAME,
            facility_sequence: header_cells::FACILITY_SEQUENCE,
            estimated_cost: header_cells::ESTIMATED_COST,
            run_date: header_cells::RUN_DATE,
            period_start: header_cells::PERIOD_START,
            period_end: header_cells::PERIOD_END,
        }
    }
}

/// Stepped cells for a driver's second and later records
///
/// Cursor rows start at `*_row_start` and move down by `row_offset` after
/// every record, so record `i` of a driver lands at
/// `start + (i - 1) * row_offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatBlock {
    /// Column letters shared by all stepped cells
    pub column: String,
    pub trip_row_start: u32,
    pub facility_row_start: u32,
    pub cost_row_start: u32,
    pub row_offset: u32,
}

impl Default for RepeatBlock {
    fn default() -> Self {
        Self {
            column: repeat_block::COLUMN.to_string(),
            trip_row_start: repeat_block::TRIP_ROW_START,
            facility_row_start: repeat_block::FACILITY_ROW_START,
            cost_row_start: repeat_block::COST_ROW_START,
            row_offset: repeat_block::ROW_OFFSET,
        }
    }
}

impl RepeatBlock {
    pub fn column_index(&self) -> Result<u32> {
        column_index(&self.column)
            .map_err(|e| StamperError::configuration(format!("repeat.column: {e}")))
    }
}

/// Cap on how far down the template stepped trips may go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityLimit {
    /// Last row a stepped trip id may be written to
    pub last_trip_row: u32,

    #[serde(default)]
    pub policy: OverflowPolicy,
}

/// What happens to a record that does not fit in its driver's template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Log a warning, skip the record, keep going
    #[default]
    Truncate,
    /// Abort the batch
    Fail,
}

impl Default for StamperConfig {
    fn default() -> Self {
        Self {
            header_row: DEFAULT_HEADER_ROW,
            first_data_row: DEFAULT_FIRST_DATA_ROW,
            name_matching: NameMatching::default(),
            stamp_pay_period: true,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            capacity: None,
            layout: TemplateLayout::default(),
        }
    }
}

impl StamperConfig {
    /// Load a configuration file, filling gaps with defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StamperError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| StamperError::configuration(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| StamperError::configuration(format!("cannot serialize: {}", e)))
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.header_row == 0 {
            return Err(StamperError::configuration("header_row must be at least 1"));
        }
        if self.first_data_row <= self.header_row {
            return Err(StamperError::configuration(format!(
                "first_data_row ({}) must be below header_row ({})",
                self.first_data_row, self.header_row
            )));
        }
        if !(-23..=23).contains(&self.utc_offset_hours) {
            return Err(StamperError::configuration(format!(
                "utc_offset_hours {} is outside -23..=23",
                self.utc_offset_hours
            )));
        }

        let repeat = &self.layout.repeat;
        repeat.column_index()?;
        if repeat.row_offset == 0 {
            return Err(StamperError::configuration("repeat.row_offset must be positive"));
        }
        for (name, row) in [
            ("trip_row_start", repeat.trip_row_start),
            ("facility_row_start", repeat.facility_row_start),
            ("cost_row_start", repeat.cost_row_start),
        ] {
            if row == 0 || row > XLSX_MAX_ROWS {
                return Err(StamperError::configuration(format!(
                    "repeat.{} must be within 1..={}",
                    name, XLSX_MAX_ROWS
                )));
            }
        }

        if let Some(limit) = &self.capacity {
            if limit.last_trip_row < repeat.trip_row_start {
                return Err(StamperError::configuration(format!(
                    "capacity.last_trip_row ({}) is above repeat.trip_row_start ({})",
                    limit.last_trip_row, repeat.trip_row_start
                )));
            }
        }

        Ok(())
    }

    pub fn with_name_matching(mut self, matching: NameMatching) -> Self {
        self.name_matching = matching;
        self
    }

    pub fn with_capacity(mut self, last_trip_row: u32, policy: OverflowPolicy) -> Self {
        self.capacity = Some(CapacityLimit {
            last_trip_row,
            policy,
        });
        self
    }

    pub fn without_pay_period(mut self) -> Self {
        self.stamp_pay_period = false;
        self
    }

    pub fn with_rows(mut self, header_row: u32, first_data_row: u32) -> Self {
        self.header_row = header_row;
        self.first_data_row = first_data_row;
        self
    }

    pub fn with_layout(mut self, layout: TemplateLayout) -> Self {
        self.layout = layout;
        self
    }
}
