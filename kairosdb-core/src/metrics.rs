//! Metric name and metric record types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::datapoint::DataPoint;
use crate::error::{KairosError, KairosResult};
use crate::tags::TagSet;

/// Metric name - a string identifier for a time series
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricName(String);

impl MetricName {
    /// Create a new metric name. Only emptiness is rejected.
    pub fn new<S: Into<String>>(name: S) -> KairosResult<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(KairosError::validation("Metric name cannot be empty"));
        }

        Ok(Self(name))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed name
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Create a child metric name, `<self>.<component>`
    pub fn child<S: AsRef<str>>(&self, component: S) -> KairosResult<MetricName> {
        Self::new(format!("{}.{}", self.0, component.as_ref()))
    }

    /// Prepend a prefix verbatim
    pub fn with_prefix(&self, prefix: &str) -> MetricName {
        if prefix.is_empty() {
            return self.clone();
        }
        Self(format!("{}{}", prefix, self.0))
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MetricName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for MetricName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MetricName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One named, tagged sample produced from a field of a parsed line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metric {
    name: MetricName,
    tags: TagSet,
    data_point: DataPoint,
}

impl Metric {
    /// Create a metric. A metric must carry at least one tag.
    pub fn new(name: MetricName, tags: TagSet, data_point: DataPoint) -> KairosResult<Self> {
        if tags.is_empty() {
            return Err(KairosError::validation(format!(
                "Metric '{}' must have at least one tag",
                name
            )));
        }

        Ok(Self {
            name,
            tags,
            data_point,
        })
    }

    pub fn name(&self) -> &MetricName {
        &self.name
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn data_point(&self) -> &DataPoint {
        &self.data_point
    }
}
