//! Timestamps for records and sorted-set scores.
//!
//! Records store timestamps as ISO-8601 with microseconds
//! (`2013-11-05T14:03:09.123456Z`); sorted sets are scored with UNIX
//! seconds carrying the same microsecond fraction.

use std::sync::Mutex;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Format a timestamp the way records store it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts the record format and RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Sorted-set score for a timestamp.
pub fn score(ts: &DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

/// Source of strictly increasing microsecond timestamps.
///
/// Two stamps taken within the same microsecond are pushed apart by one
/// microsecond, so scores derived from them never tie.
#[derive(Debug, Default)]
pub struct Clock {
    last_micros: Mutex<i64>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let mut last = self
            .last_micros
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let micros = if wall > *last { wall } else { *last + 1 };
        *last = micros;
        DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now)
    }
}

/// Serde adapter writing timestamps in the record format.
pub mod serde_micros {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }
}
