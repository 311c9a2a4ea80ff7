//! Timestamp helpers for the earthquake feeds.
//!
//! The FDSN event service emits every timestamp-shaped field (`time`,
//! `updated`, `indexTime`, `updateTime`, `lastModified`) as an integer count
//! of milliseconds since the Unix epoch, while query parameters and encoded
//! output use ISO8601 strings. [`parse_milliseconds`] covers the decode
//! direction for feed fields; [`isoparse`] / [`isoformat`] cover the string
//! direction.

use std::fmt;

use chrono::format::ParseError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};

/// Sub-second precision selector for [`isoformat`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timespec {
    /// As many sub-second digits as the value needs, in groups of three.
    #[default]
    Auto,
    Seconds,
    Milliseconds,
    Microseconds,
}

impl Timespec {
    fn seconds_format(self) -> SecondsFormat {
        match self {
            Timespec::Auto => SecondsFormat::AutoSi,
            Timespec::Seconds => SecondsFormat::Secs,
            Timespec::Milliseconds => SecondsFormat::Millis,
            Timespec::Microseconds => SecondsFormat::Micros,
        }
    }
}

/// Formats an instant as ISO8601.
///
/// A `+00:00` offset is emitted as the canonical `Z` suffix.
pub fn isoformat<Tz: TimeZone>(instant: &DateTime<Tz>, timespec: Timespec) -> String
where
    Tz::Offset: fmt::Display,
{
    instant.to_rfc3339_opts(timespec.seconds_format(), true)
}

// Accepted shapes without an explicit offset, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parses an ISO8601 date string.
///
/// If the string carries no timezone offset (including date-only strings
/// such as `2021-01-01`), UTC is assumed.
pub fn isoparse(value: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            for format in NAIVE_FORMATS {
                if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
                    return Ok(naive.and_utc().fixed_offset());
                }
            }
            if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                return Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset());
            }
            Err(err)
        }
    }
}

/// Converts a millisecond epoch timestamp to a UTC instant.
///
/// Negative values (instants before 1970) are valid. Returns `None` only
/// when the count falls outside chrono's representable range.
pub fn parse_milliseconds(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}
