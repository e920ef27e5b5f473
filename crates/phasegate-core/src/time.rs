//! Time utilities shared by every evaluator.
//!
//! All instants are UTC. Timestamps are strict RFC3339 with a zero offset,
//! times of day are strict 24-hour `HH:MM:SS`. Hour arithmetic is carried out
//! in exact nanoseconds on `i128` so configured hour counts never overflow.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, GateError};

const NANOS_PER_SECOND: i128 = 1_000_000_000;
const NANOS_PER_HOUR: i128 = 3_600 * NANOS_PER_SECOND;

/// Day of the week, always derived from the UTC calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    #[serde(alias = "mon")]
    Monday,
    #[serde(alias = "tue")]
    Tuesday,
    #[serde(alias = "wed")]
    Wednesday,
    #[serde(alias = "thu")]
    Thursday,
    #[serde(alias = "fri")]
    Friday,
    #[serde(alias = "sat")]
    Saturday,
    #[serde(alias = "sun")]
    Sunday,
}

impl Weekday {
    /// Converts from chrono's weekday.
    #[must_use]
    pub fn from_chrono(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }

    /// Lowercase full name, as used in configuration files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UTC weekday of an instant.
#[must_use]
pub fn weekday_of(instant: DateTime<Utc>) -> Weekday {
    Weekday::from_chrono(instant.weekday())
}

/// Parse an RFC3339 timestamp that must be expressed in UTC.
///
/// # Errors
///
/// Returns [`GateError::MalformedTimestamp`] if `value` is not RFC3339 or
/// carries a non-zero offset.
pub fn parse_instant(field: &str, value: &str) -> Result<DateTime<Utc>, GateError> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .filter(|parsed| parsed.offset().local_minus_utc() == 0)
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok_or_else(|| GateError::timestamp(field, value))
}

/// Parse an optional timestamp field.
///
/// # Errors
///
/// Same as [`parse_instant`].
pub fn parse_optional_instant(
    field: &str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, GateError> {
    value.map(|v| parse_instant(field, v)).transpose()
}

/// Canonical RFC3339 rendering with second precision and a `Z` suffix.
#[must_use]
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a 24-hour `HH:MM:SS` time of day.
///
/// # Errors
///
/// Returns [`GateError::MalformedTimeOfDay`] for any other shape or an
/// out-of-range component.
pub fn parse_time_of_day(field: &str, value: &str) -> Result<NaiveTime, GateError> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 8
        && bytes[2] == b':'
        && bytes[5] == b':'
        && [0, 1, 3, 4, 6, 7].iter().all(|&i| bytes[i].is_ascii_digit());
    if !well_formed {
        return Err(GateError::time_of_day(field, value));
    }

    let component = |start: usize| -> u32 {
        u32::from(bytes[start] - b'0') * 10 + u32::from(bytes[start + 1] - b'0')
    };
    // from_hms_opt rejects hour 24, minute 60 and second 60
    NaiveTime::from_hms_opt(component(0), component(3), component(6))
        .ok_or_else(|| GateError::time_of_day(field, value))
}

/// Reject negative hour counts.
///
/// # Errors
///
/// Returns [`ConfigurationError::NegativeHours`] when `value < 0`.
pub fn ensure_non_negative(field: &'static str, value: i64) -> Result<i64, GateError> {
    if value < 0 {
        return Err(ConfigurationError::NegativeHours { field, value }.into());
    }
    Ok(value)
}

/// Nanoseconds from `from` to `to`; negative when `to` precedes `from`.
///
/// Exact to the nanosecond, so an instant one microsecond short of a
/// boundary never compares equal to it.
#[must_use]
pub fn elapsed_nanos(from: DateTime<Utc>, to: DateTime<Utc>) -> i128 {
    let delta = to - from;
    i128::from(delta.num_seconds()) * NANOS_PER_SECOND + i128::from(delta.subsec_nanos())
}

/// Whole hours expressed in nanoseconds.
#[must_use]
pub fn hours_to_nanos(hours: i64) -> i128 {
    i128::from(hours) * NANOS_PER_HOUR
}

/// Nanoseconds expressed as fractional hours, for display.
#[must_use]
pub fn nanos_to_hours(nanos: i128) -> f64 {
    nanos as f64 / NANOS_PER_HOUR as f64
}
