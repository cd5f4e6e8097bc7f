//! Weekly pay period dates stamped into each driver's workbook.
//!
//! A pay period runs Sunday through Saturday. The run date decides which
//! period is stamped: the most recent Sunday on or before it starts the
//! period, six days later ends it.

use crate::constants::PAY_PERIOD_DATE_FORMAT;
use crate::error::{Result, StamperError};
use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayPeriod {
    pub run_date: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PayPeriod {
    /// The Sunday-to-Saturday week containing `run_date`
    pub fn containing(run_date: NaiveDate) -> Self {
        let start = run_date - Duration::days(run_date.weekday().num_days_from_sunday() as i64);
        Self {
            run_date,
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn format(date: NaiveDate) -> String {
        date.format(PAY_PERIOD_DATE_FORMAT).to_string()
    }
}

/// Today's calendar date at a fixed UTC offset
pub fn today_at_offset(hours: i32) -> Result<NaiveDate> {
    let offset = FixedOffset::east_opt(hours * 3600).ok_or_else(|| {
        StamperError::configuration(format!("UTC offset of {hours} hours is out of range"))
    })?;
    Ok(Utc::now().with_timezone(&offset).date_naive())
}
