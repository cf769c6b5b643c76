//! Time handling for line protocol timestamps

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{KairosError, KairosResult};

/// Milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Get the current wall-clock timestamp
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Create from milliseconds since Unix epoch
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Get milliseconds since Unix epoch
    pub fn timestamp_millis(&self) -> i64 {
        self.0
    }

    /// Format as ISO 8601 string, if the instant is representable
    pub fn to_rfc3339(&self) -> Option<String> {
        match Utc.timestamp_millis_opt(self.0) {
            chrono::LocalResult::Single(dt) => Some(dt.to_rfc3339()),
            _ => None,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "{}ms", self.0),
        }
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

/// Unit of the optional trailing timestamp on a line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl Precision {
    /// Convert a raw timestamp in this unit to milliseconds.
    ///
    /// Finer units truncate toward zero; seconds saturate at the i64 bounds.
    pub fn to_millis(self, value: i64) -> i64 {
        match self {
            Precision::Nanoseconds => value / 1_000_000,
            Precision::Microseconds => value / 1_000,
            Precision::Milliseconds => value,
            Precision::Seconds => value.saturating_mul(1_000),
        }
    }

    /// Convert a raw timestamp in this unit to a [`Timestamp`]
    pub fn to_timestamp(self, value: i64) -> Timestamp {
        Timestamp(self.to_millis(value))
    }

    /// The query string literal for this precision
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Nanoseconds => "ns",
            Precision::Microseconds => "us",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
        }
    }
}

impl FromStr for Precision {
    type Err = KairosError;

    fn from_str(s: &str) -> KairosResult<Self> {
        match s {
            "ns" => Ok(Precision::Nanoseconds),
            "us" => Ok(Precision::Microseconds),
            "ms" => Ok(Precision::Milliseconds),
            "s" => Ok(Precision::Seconds),
            other => Err(KairosError::validation(format!(
                "Unknown precision '{}'. Valid options: ns, us, ms, s",
                other
            ))),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
