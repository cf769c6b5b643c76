//! Data point types and operations

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::Timestamp;

/// A single timestamped sample
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataPoint {
    /// Timestamp when the measurement was taken
    pub timestamp: Timestamp,

    /// The measured value
    pub value: DataPointValue,
}

/// Supported data point value types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataPointValue {
    /// 64-bit signed integer
    Long(i64),

    /// 64-bit floating point number
    Double(OrderedFloat<f64>),

    /// Text value
    Text(String),
}

impl DataPoint {
    /// Create a new data point with long value
    pub fn new_long<T: Into<Timestamp>>(timestamp: T, value: i64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value: DataPointValue::Long(value),
        }
    }

    /// Create a new data point with double value
    pub fn new_double<T: Into<Timestamp>>(timestamp: T, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value: DataPointValue::Double(OrderedFloat(value)),
        }
    }

    /// Create a new data point with text value
    pub fn new_text<T: Into<Timestamp>, S: Into<String>>(timestamp: T, value: S) -> Self {
        Self {
            timestamp: timestamp.into(),
            value: DataPointValue::Text(value.into()),
        }
    }

    /// Timestamp in milliseconds since epoch
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

impl DataPointValue {
    /// Convert to f64 if numeric
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataPointValue::Long(v) => Some(*v as f64),
            DataPointValue::Double(v) => Some(v.into_inner()),
            DataPointValue::Text(_) => None,
        }
    }

    /// Get the long value, if this is one
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DataPointValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the text value, if this is one
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataPointValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Check if this is a numeric value
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataPointValue::Long(_) | DataPointValue::Double(_))
    }

    /// Get the value type name
    pub fn type_name(&self) -> &'static str {
        match self {
            DataPointValue::Long(_) => "long",
            DataPointValue::Double(_) => "double",
            DataPointValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for DataPointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataPointValue::Long(v) => write!(f, "{}", v),
            DataPointValue::Double(v) => write!(f, "{}", v),
            DataPointValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}
