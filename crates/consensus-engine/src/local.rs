//! Turn user-facing date/time strings into UTC instants.
//!
//! Participants usually submit availability as a calendar date plus wall-clock
//! start/end times in their own zone. These helpers resolve such input through
//! `chrono-tz`:
//!
//! - a local time inside a DST gap (e.g. 02:30 during spring-forward) does not
//!   exist and is rejected;
//! - a local time inside a DST overlap resolves to the earlier instant.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SchedulerError};

/// Parse an instant.
///
/// Accepts RFC 3339 (`2026-03-16T09:00:00+09:00`) and naive
/// `YYYY-MM-DDTHH:MM:SS`, which is read as UTC.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| SchedulerError::InvalidTime(format!("'{}': {}", s, e)))
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| SchedulerError::InvalidTime(format!("date '{}': {}", s, e)))
}

/// Parse a wall-clock time as `HH:MM` or `HH:MM:SS`.
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| SchedulerError::InvalidTime(format!("time '{}': {}", s, e)))
}

/// Parse `HH:MM-HH:MM` into its two wall-clock times.
pub fn parse_slot_range(s: &str) -> Result<(NaiveTime, NaiveTime)> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| SchedulerError::InvalidTime(format!("slot '{}': expected HH:MM-HH:MM", s)))?;
    Ok((parse_time(start.trim())?, parse_time(end.trim())?))
}

pub fn parse_timezone(timezone: &str) -> Result<Tz> {
    timezone
        .parse()
        .map_err(|_| SchedulerError::InvalidTimezone(timezone.to_string()))
}

/// Resolve a wall-clock date and time in `tz` to UTC.
pub fn resolve_local(date: NaiveDate, time: NaiveTime, tz: Tz) -> Result<DateTime<Utc>> {
    let naive = date.and_time(time);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            SchedulerError::InvalidTime(format!("{} does not exist in {}", naive, tz.name()))
        })
}

/// Resolve a same-day local window to a UTC `(start, end)` pair.
///
/// Ordering is not checked here; the scheduler rejects `start >= end`.
pub fn local_window(
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    timezone: &str,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let tz = parse_timezone(timezone)?;
    Ok((resolve_local(date, start, tz)?, resolve_local(date, end, tz)?))
}
