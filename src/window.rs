//! Reporting window and Slack timestamp conversion.
//!
//! A run reports on the month containing the target date. Messages are
//! requested from the day before the first of that month through the end of
//! the target day, in the configured reporting offset.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone};

use crate::{AppError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const MONTH_FORMAT: &str = "%Y%m";

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| AppError::InvalidDate(s.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportWindow {
    pub target: NaiveDate,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl ReportWindow {
    pub fn for_date(target: NaiveDate, offset: FixedOffset) -> Result<Self> {
        let first_of_month = target
            .with_day(1)
            .ok_or_else(|| AppError::InvalidDate(target.to_string()))?;
        let start_day = first_of_month
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| AppError::InvalidDate(target.to_string()))?;

        let start = localize(offset, start_day, NaiveTime::MIN)?;
        let end_time = NaiveTime::from_hms_opt(23, 59, 59)
            .ok_or_else(|| AppError::InvalidDate(target.to_string()))?;
        let end = localize(offset, target, end_time)?;

        Ok(Self { target, start, end })
    }

    /// `YYYYMM` of the report month; names the directory query and the output file.
    pub fn month_key(&self) -> String {
        self.target.format(MONTH_FORMAT).to_string()
    }

    pub fn offset(&self) -> FixedOffset {
        *self.start.offset()
    }
}

fn localize(
    offset: FixedOffset,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<DateTime<FixedOffset>> {
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| AppError::InvalidDate(date.to_string()))
}

/// Whole seconds of a Slack `ts` ("1709251200.000100").
pub fn ts_seconds(ts: &str) -> Option<i64> {
    ts.split('.').next().and_then(|s| s.parse().ok())
}

/// Ordering key for a Slack `ts`; unparseable parts sort first.
pub fn ts_sort_key(ts: &str) -> (i64, u32) {
    let mut parts = ts.splitn(2, '.');
    let secs = parts.next().and_then(|s| s.parse().ok()).unwrap_or(i64::MIN);
    let micros = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    (secs, micros)
}

pub fn ts_to_local(ts: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let secs = ts_seconds(ts)?;
    offset.timestamp_opt(secs, 0).single()
}
