// ============================================
// File: crates/gridlink-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Creation Reason
//! Envelopes, signatures and cached secrets all carry UTC instants that
//! cross the wire as ISO-8601 text. `Timestamp` owns both directions of
//! that conversion.
//!
//! ## Main Functionality
//! - `Timestamp`: UTC instant with ISO-8601 (RFC 3339) text form
//! - Lenient parsing of naive ISO-8601 strings emitted by older peers
//! - Freshness checks for replay-window validation
//!
//! ## Wire Format
//! ```text
//! emitted:   2025-03-14T09:26:53.589793Z      (RFC 3339, microseconds, UTC)
//! accepted:  2025-03-14T09:26:53.589793+00:00 (any RFC 3339 offset)
//!            2025-03-14T09:26:53.589793       (naive, interpreted as UTC)
//!            2025-03-14T09:26:53              (naive, no fraction)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Signature timestamps are signed as the exact string received; never
//!   re-format a timestamp before verifying a signature over it
//!
//! ## Last Modified
//! v0.1.0 - Initial time utilities

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================
// Constants
// ============================================

/// Accepted naive (offset-less) ISO-8601 layouts.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

// ============================================
// Timestamp
// ============================================

/// UTC instant with an ISO-8601 text representation.
///
/// # Example
/// ```
/// use gridlink_common::time::Timestamp;
/// use std::time::Duration;
///
/// let now = Timestamp::now();
/// let text = now.to_iso_string();
/// let parsed: Timestamp = text.parse().unwrap();
///
/// assert_eq!(now, parsed);
/// assert!(parsed.is_recent(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current time, truncated to microseconds.
    ///
    /// Truncation keeps `parse(to_iso_string(t)) == t`.
    #[must_use]
    pub fn now() -> Self {
        let now = Utc::now();
        let micros = now.timestamp_micros();
        Self(DateTime::from_timestamp_micros(micros).unwrap_or(now))
    }

    /// Formats as RFC 3339 with microsecond precision and a `Z` suffix.
    #[must_use]
    pub fn to_iso_string(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Parses an ISO-8601 timestamp.
    ///
    /// RFC 3339 strings with any offset are converted to UTC. Strings with
    /// no offset are interpreted as UTC.
    ///
    /// # Errors
    /// Returns `TimestampError::Unparseable` if no accepted layout matches.
    pub fn parse(s: &str) -> Result<Self, TimestampError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }

        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| Self(naive.and_utc()))
            .ok_or_else(|| TimestampError::Unparseable {
                value: s.chars().take(64).collect(),
            })
    }

    /// Returns this timestamp advanced by `duration`, or `None` on overflow.
    #[must_use]
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        let delta = chrono::Duration::from_std(duration).ok()?;
        self.0.checked_add_signed(delta).map(Self)
    }

    /// Returns `true` if `|self - now| <= max_age`.
    #[must_use]
    pub fn is_recent(&self, max_age: Duration) -> bool {
        u128::from(self.offset_from_now().unsigned_abs()) <= max_age.as_millis()
    }

    /// Validates that the timestamp lies within `max_age` of now.
    ///
    /// # Errors
    /// Returns `TimestampError::ClockSkew` if the timestamp is too old or
    /// too far in the future.
    pub fn validate_freshness(&self, max_age: Duration) -> Result<(), TimestampError> {
        if self.is_recent(max_age) {
            return Ok(());
        }
        Err(TimestampError::ClockSkew {
            timestamp: self.to_iso_string(),
            offset_ms: self.offset_from_now(),
            max_age_ms: max_age.as_millis(),
        })
    }

    /// Milliseconds between this timestamp and now.
    ///
    /// Positive values mean the timestamp is in the future.
    #[must_use]
    pub fn offset_from_now(&self) -> i64 {
        (self.0 - Utc::now()).num_milliseconds()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_iso_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================
// TimestampError
// ============================================

/// Errors that can occur during timestamp parsing or validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    /// Text is not an accepted ISO-8601 layout.
    #[error("Unparseable timestamp: '{value}'")]
    Unparseable {
        /// The rejected text (truncated)
        value: String,
    },

    /// Timestamp differs too much from current time.
    #[error("Clock skew detected: timestamp={timestamp}, offset={offset_ms}ms, max_age={max_age_ms}ms")]
    ClockSkew {
        /// The timestamp value
        timestamp: String,
        /// Offset from now in milliseconds
        offset_ms: i64,
        /// Maximum allowed age in milliseconds
        max_age_ms: u128,
    },
}

// ============================================
// Tests
// ============================================
