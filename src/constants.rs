//! Application constants for the payroll stamper
//!
//! Input sheet geometry, required column names, and the default cell
//! contract of the payroll template.

// =============================================================================
// Input Sheet Geometry
// =============================================================================

/// Row holding the column headers (1-based)
pub const DEFAULT_HEADER_ROW: u32 = 2;

/// First row holding trip data (1-based)
pub const DEFAULT_FIRST_DATA_ROW: u32 = 3;

/// Required column headers, matched against trimmed header cell text
pub mod columns {
    pub const TRIP_ID: &str = "Trip ID";
    pub const DRIVER_NAME: &str = "Driver Name";
    pub const FACILITY_SEQUENCE: &str = "Facility Sequence";
    pub const ESTIMATED_COST: &str = "Estimated Cost";
}

// =============================================================================
// Template Cell Contract
// =============================================================================

/// Header cells written once, when a driver's workbook is seeded
pub mod header_cells {
    use crate::template::CellRef;

    /// D3
    pub const RUN_DATE: CellRef = CellRef::at(3, 4);
    /// D4
    pub const DRIVER_NAME: CellRef = CellRef::at(4, 4);
    /// D6
    pub const PERIOD_START: CellRef = CellRef::at(6, 4);
    /// D7
    pub const PERIOD_END: CellRef = CellRef::at(7, 4);
    /// B11
    pub const TRIP_ID: CellRef = CellRef::at(11, 2);
    /// B13
    pub const FACILITY_SEQUENCE: CellRef = CellRef::at(13, 2);
    /// B14
    pub const ESTIMATED_COST: CellRef = CellRef::at(14, 2);
}

/// Stepped trip blocks below the header region
pub mod repeat_block {
    /// Column shared by every stepped cell
    pub const COLUMN: &str = "B";

    /// Cursor start rows; these coincide with the header block so the
    /// second record of a driver lands one offset below it
    pub const TRIP_ROW_START: u32 = 11;
    pub const FACILITY_ROW_START: u32 = 13;
    pub const COST_ROW_START: u32 = 14;

    /// Rows between consecutive trip blocks
    pub const ROW_OFFSET: u32 = 5;
}

/// Last row addressable in an xlsx worksheet
pub const XLSX_MAX_ROWS: u32 = 1_048_576;

/// Last column addressable in an xlsx worksheet (XFD)
pub const XLSX_MAX_COLUMNS: u32 = 16_384;

// =============================================================================
// Pay Period
// =============================================================================

/// Date format used for the run date and pay period cells
pub const PAY_PERIOD_DATE_FORMAT: &str = "%m/%d/%Y";

/// Mountain Standard Time, fixed offset with no daylight saving
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -7;

// =============================================================================
// Output
// =============================================================================

/// Extension of every per-driver workbook
pub const OUTPUT_EXTENSION: &str = "xlsx";

/// File stem used when a driver name sanitizes to nothing
pub const UNNAMED_DRIVER_STEM: &str = "unnamed";

/// Prefix of the staging directory created inside the output directory
pub const STAGING_DIR_PREFIX: &str = ".payroll-staging-";

/// Default output directory name
pub const DEFAULT_OUTPUT_DIR: &str = "output_files";
