//! # Timestamp Normalization
//!
//! Converts upstream timestamp strings into the canonical display form
//! `YYYY-MM-DD HH:MM:SS UTC`.
//!
//! The canonical form is fixed width and zero padded, so plain string
//! comparison orders it chronologically. That property backs the legacy
//! timestamp query mode; it is never used for gap-free polling.
//!
//! Normalization never fails. Empty or unparsable input degrades to the
//! current wall-clock time so the event is still recorded.

use crate::ParseError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// chrono format string of the canonical display form
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Formats carrying an explicit UTC offset, tried after `Z` has been
/// rewritten to `+00:00`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// Formats without an offset; interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A timestamp in canonical `YYYY-MM-DD HH:MM:SS UTC` form.
///
/// Construction validates the exact shape, so every value of this type is
/// safe to compare lexically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalTimestamp(String);

impl CanonicalTimestamp {
    /// Format a UTC instant in canonical form
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format(CANONICAL_FORMAT).to_string())
    }

    /// Current wall-clock time in canonical form
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Validate a string that is expected to already be canonical
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidFormat {
            expected: "YYYY-MM-DD HH:MM:SS UTC".to_string(),
            actual: raw.to_string(),
        };

        let parsed = NaiveDateTime::parse_from_str(raw, CANONICAL_FORMAT).map_err(|_| invalid())?;
        let canonical = Self::from_datetime(parsed.and_utc());

        // chrono accepts unpadded fields; the canonical form does not
        if canonical.0 != raw {
            return Err(invalid());
        }

        Ok(canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CanonicalTimestamp {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CanonicalTimestamp {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CanonicalTimestamp> for String {
    fn from(ts: CanonicalTimestamp) -> Self {
        ts.0
    }
}

/// Normalize an upstream timestamp, falling back to the current time.
pub fn normalize_timestamp(raw: Option<&str>) -> CanonicalTimestamp {
    normalize_timestamp_at(raw, Utc::now())
}

/// Normalize an upstream timestamp, using `fallback` when the input is
/// absent, empty or unparsable.
pub fn normalize_timestamp_at(raw: Option<&str>, fallback: DateTime<Utc>) -> CanonicalTimestamp {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        debug!("Timestamp absent, using fallback time");
        return CanonicalTimestamp::from_datetime(fallback);
    }

    match parse_upstream(trimmed) {
        Some(at) => CanonicalTimestamp::from_datetime(at),
        None => {
            debug!(raw = %trimmed, "Timestamp unparsable, using fallback time");
            CanonicalTimestamp::from_datetime(fallback)
        }
    }
}

/// Interpret an ISO-8601-like string as a UTC instant.
fn parse_upstream(raw: &str) -> Option<DateTime<Utc>> {
    let with_offset = match raw.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => raw.to_string(),
    };

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&with_offset, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    // Already canonical, or an upstream using the same suffix
    let naive = raw.strip_suffix(" UTC").unwrap_or(raw);

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
