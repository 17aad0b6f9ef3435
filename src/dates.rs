// Calendar dates, stored timestamps and query date ranges
//
// Stored formats:
//   dates       YYYY-MM-DD
//   timestamps  YYYY-MM-DDTHH:MM:SS.ffffffZ (fixed width, UTC)
//
// Fixed width keeps lexicographic order equal to chronological order, so range
// filters can be pushed down to SQLite as plain string comparisons.

use crate::error::{AppError, AppResult};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SubsecRound, Utc};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Current time, truncated to the precision timestamps are stored with
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamp for a row update: strictly after the previous one, even when the
/// clock has not advanced past it yet
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let candidate = now();
    let floor = previous + Duration::microseconds(1);
    if candidate < floor {
        floor
    } else {
        candidate
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

/// Parse a strict `YYYY-MM-DD` date
pub fn parse_date(field: &str, value: &str) -> AppResult<NaiveDate> {
    let value = value.trim();
    if !is_date_string(value) {
        return Err(AppError::validation(format!(
            "Invalid {}: expected YYYY-MM-DD, got '{}'",
            field, value
        )));
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        AppError::validation(format!("Invalid {}: '{}' is not a calendar date", field, value))
    })
}

/// Shape check only: four digits, dash, two digits, dash, two digits
pub fn is_date_string(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last millisecond of the day: 23:59:59.999
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::milliseconds(1)
}

// ============================================================================
// TIME RANGE (query filters)
// ============================================================================

/// Inclusive time range built from `start_date` / `end_date` query parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// A bare date expands to the start (or end) of that day in UTC,
    /// an RFC 3339 timestamp is taken as given
    pub fn from_params(start: Option<&str>, end: Option<&str>) -> AppResult<Self> {
        let start = start
            .map(|s| parse_bound("start_date", s, start_of_day))
            .transpose()?;
        let end = end
            .map(|s| parse_bound("end_date", s, end_of_day))
            .transpose()?;

        Ok(TimeRange { start, end })
    }

    pub fn day(date: NaiveDate) -> Self {
        TimeRange {
            start: Some(start_of_day(date)),
            end: Some(end_of_day(date)),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
    }

    /// Earliest date whose midnight falls inside the range
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.start.map(|s| {
            let date = s.date_naive();
            if start_of_day(date) < s {
                date.succ_opt().unwrap_or(date)
            } else {
                date
            }
        })
    }

    /// Latest date whose midnight falls inside the range
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.end.map(|e| e.date_naive())
    }
}

fn parse_bound(
    field: &str,
    value: &str,
    expand: fn(NaiveDate) -> DateTime<Utc>,
) -> AppResult<DateTime<Utc>> {
    let value = value.trim();
    if is_date_string(value) {
        return parse_date(field, value).map(expand);
    }

    parse_timestamp(value).map_err(|_| {
        AppError::validation(format!(
            "Invalid {}: expected YYYY-MM-DD or an RFC 3339 timestamp, got '{}'",
            field, value
        ))
    })
}
