//! Lenient timestamp parsing for mission dates.
//!
//! Dates coming from forms and older records are not always timezone-aware.
//! Naive values are interpreted as UTC.

use crate::Timestamp;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse an RFC 3339 timestamp, a naive date-time, or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `deserialize_with` helper for required timestamps.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// `deserialize_with` helper for optional timestamps.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_parses_rfc3339_with_offset() {
        let ts = parse_timestamp("2026-03-01T10:00:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_naive_datetime_is_utc() {
        let ts = parse_timestamp("2026-03-01T10:30:00").unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.minute(), 30);

        let ts = parse_timestamp("2026-03-01 10:30:00.250").unwrap();
        assert_eq!(ts.hour(), 10);
    }

    #[test]
    fn test_bare_date_is_midnight() {
        let ts = parse_timestamp("2026-12-24").unwrap();
        assert_eq!(ts.day(), 24);
        assert_eq!(ts.hour(), 0);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_timestamp("next tuesday").is_none());
    }
}
