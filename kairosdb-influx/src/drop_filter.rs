//! Regex based drop filters for tag names and metric names

use regex::RegexSet;
use tracing::info;

use kairosdb_core::error::{KairosError, KairosResult};

/// A compiled set of patterns. A candidate matches when any pattern matches
/// the whole candidate.
#[derive(Debug, Clone)]
pub struct DropFilter {
    patterns: Vec<String>,
    set: RegexSet,
}

impl DropFilter {
    /// Compile the given pattern sources. An invalid pattern is a
    /// configuration error.
    pub fn new<I, S>(patterns: I) -> KairosResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect();

        let anchored = patterns.iter().map(|p| format!("^(?:{})$", p));
        let set = RegexSet::new(anchored).map_err(|e| {
            KairosError::configuration(format!("Invalid drop pattern: {}", e))
        })?;

        for pattern in &patterns {
            info!("Drop pattern: {}", pattern);
        }

        Ok(Self { patterns, set })
    }

    /// A filter that never matches
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: RegexSet::empty(),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.set.is_match(candidate)
    }

    /// The pattern sources, as configured
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for DropFilter {
    fn default() -> Self {
        Self::empty()
    }
}

/// The tag name and metric name filters applied by the line parser.
/// Built once, then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct DropFilters {
    pub tags: DropFilter,
    pub metrics: DropFilter,
}

impl DropFilters {
    pub fn new<S: AsRef<str>>(drop_tags: &[S], drop_metrics: &[S]) -> KairosResult<Self> {
        Ok(Self {
            tags: DropFilter::new(drop_tags)?,
            metrics: DropFilter::new(drop_metrics)?,
        })
    }
}
