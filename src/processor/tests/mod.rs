//! Scenario tests for the batch processor
//!
//! Runs complete batches over in-memory trip grids and payroll templates.


use crate::config::StamperConfig;
use crate::grid::InputGrid;
use crate::models::CellValue;
use crate::processor::BatchProcessor;
use crate::template::CellRef;
use chrono::NaiveDate;

pub(crate) const HEADER: [&str; 4] = [
    "Driver Name",
    "Trip ID",
    "Facility Sequence",
    "Estimated Cost",
];

/// A trip grid with a title in row 1, `HEADER` in row 2 and `rows` below
pub(crate) fn trip_grid(rows: &[(&str, &str, &str, f64)]) -> InputGrid {
    let mut grid = vec![
        vec![CellValue::text("Weekly trips")],
        HEADER.iter().map(|h| CellValue::text(*h)).collect(),
    ];
    for (driver, trip, facility, cost) in rows {
        grid.push(vec![
            CellValue::text(*driver),
            CellValue::text(*trip),
            CellValue::text(*facility),
            CellValue::Number(*cost),
        ]);
    }
    InputGrid::from_rows(grid)
}

/// Processor with a pinned run date (Wednesday 2024-03-13)
pub(crate) fn processor(config: StamperConfig) -> BatchProcessor {
    BatchProcessor::new(config)
        .unwrap()
        .with_run_date(NaiveDate::from_ymd_opt(2024, 3, 13).unwrap())
}

pub(crate) fn cell(a1: &str) -> CellRef {
    a1.parse().unwrap()
}
