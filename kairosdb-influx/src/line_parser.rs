//! Line protocol parser
//!
//! Turns one line of the form
//!
//! ```text
//! measurement[,tag=value...] field=value[,field=value...] [timestamp]
//! ```
//!
//! into one [`Metric`] per field, named `<measurement>.<field>`. Parsing is
//! all or nothing: any structural problem fails the whole line.

use std::sync::Arc;
use tracing::{debug, trace};

use kairosdb_core::error::{KairosError, KairosResult};
use kairosdb_core::metrics::{Metric, MetricName};
use kairosdb_core::tags::{TagKey, TagSet, TagValue};
use kairosdb_core::time::{Precision, Timestamp};

use crate::drop_filter::DropFilters;
use crate::field_value::parse_field_value;
use crate::tokenizer::{Delimiter, Tokenizer};

pub const MEASUREMENT_MISSING: &str = "Invalid syntax. Measurement name was not specified.";
pub const FIELD_SET_REQUIRED: &str = "Invalid syntax. Measurement name and field set is required.";
pub const INVALID_TAG_SET: &str = "Invalid syntax. Invalid tag set.";
pub const INVALID_FIELD_SET: &str = "Invalid syntax. Invalid field set.";
pub const INVALID_TIMESTAMP: &str = "Invalid syntax. Invalid timestamp.";
pub const TAG_REQUIRED: &str = "Invalid syntax. At least one tag is required.";

/// Output of a single line parse
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLine {
    /// Surviving metrics, in field declaration order
    pub metrics: Vec<Metric>,
    pub tags_dropped: u64,
    pub metrics_dropped: u64,
}

/// Stateless line parser. Cheap to share between threads.
#[derive(Debug, Clone, Default)]
pub struct InfluxParser {
    filters: Arc<DropFilters>,
    default_tags: TagSet,
}

impl InfluxParser {
    pub fn new(filters: DropFilters) -> Self {
        Self::with_filters(Arc::new(filters))
    }

    pub fn with_filters(filters: Arc<DropFilters>) -> Self {
        Self {
            filters,
            default_tags: TagSet::new(),
        }
    }

    /// Tags added to every line unless the line carries the same key.
    /// These are never subject to the tag drop filter.
    pub fn with_default_tags(mut self, tags: TagSet) -> Self {
        self.default_tags = tags;
        self
    }

    pub fn drop_filters(&self) -> &Arc<DropFilters> {
        &self.filters
    }

    pub fn default_tags(&self) -> &TagSet {
        &self.default_tags
    }

    pub fn parse_line(&self, line: &str, precision: Precision) -> KairosResult<ParsedLine> {
        self.parse_line_with_tags(line, precision, &TagSet::new())
    }

    /// Parse a line, overlaying `request_tags` on top of the line's own tags
    pub fn parse_line_with_tags(
        &self,
        line: &str,
        precision: Precision,
        request_tags: &TagSet,
    ) -> KairosResult<ParsedLine> {
        let mut tokenizer = Tokenizer::new(line)?;

        let measurement = tokenizer.token().to_string();
        check(!measurement.is_empty(), MEASUREMENT_MISSING)?;
        check(tokenizer.delimiter().ends_pair(), FIELD_SET_REQUIRED)?;

        let mut tags = self.default_tags.clone();
        let mut tags_dropped = 0;
        if tokenizer.delimiter() == Delimiter::Comma {
            tags_dropped = self.parse_tags(&mut tokenizer, &mut tags)?;
        }
        tags.extend_from(request_tags);

        let fields = parse_fields(&mut tokenizer)?;
        let timestamp = match parse_timestamp(&mut tokenizer)? {
            Some(raw) => precision.to_timestamp(raw),
            None => Timestamp::now(),
        };

        check(!tags.is_empty(), TAG_REQUIRED)?;

        let measurement = MetricName::new(measurement)?;
        let mut parsed = ParsedLine {
            metrics: Vec::with_capacity(fields.len()),
            tags_dropped,
            metrics_dropped: 0,
        };

        for (field, raw_value) in fields {
            let name = measurement.child(&field)?;
            if self.filters.metrics.matches(name.as_str()) {
                debug!("Dropping metric {}", name);
                parsed.metrics_dropped += 1;
                continue;
            }

            let data_point = parse_field_value(timestamp, &raw_value)?;
            trace!("Parsed {} {} {}", name, tags, data_point.value);
            parsed.metrics.push(Metric::new(name, tags.clone(), data_point)?);
        }

        Ok(parsed)
    }

    /// Read `name=value` pairs until the whitespace that ends the tag block.
    /// Returns the number of tags removed by the drop filter.
    fn parse_tags(&self, tokenizer: &mut Tokenizer, tags: &mut TagSet) -> KairosResult<u64> {
        let mut dropped = 0;

        loop {
            tokenizer.advance()?;
            check(tokenizer.delimiter() == Delimiter::Equals, INVALID_TAG_SET)?;
            let name = tokenizer.token().to_string();

            tokenizer.advance()?;
            check(tokenizer.delimiter() != Delimiter::End, FIELD_SET_REQUIRED)?;
            check(tokenizer.delimiter().ends_pair(), INVALID_TAG_SET)?;
            let value = tokenizer.token();
            check(!name.is_empty() && !value.is_empty(), INVALID_TAG_SET)?;

            if self.filters.tags.matches(&name) {
                debug!("Dropping tag {}", name);
                dropped += 1;
            } else {
                tags.insert(TagKey::new(name)?, TagValue::new(value)?);
            }

            if tokenizer.delimiter() == Delimiter::Whitespace {
                return Ok(dropped);
            }
        }
    }
}

/// Read `name=value` pairs until whitespace or the end of the line.
///
/// A repeated field name keeps its first position and takes the last value.
fn parse_fields(tokenizer: &mut Tokenizer) -> KairosResult<Vec<(String, String)>> {
    let mut fields: Vec<(String, String)> = Vec::new();

    loop {
        tokenizer.advance()?;
        if fields.is_empty() && tokenizer.is_at_end() && tokenizer.token().is_empty() {
            return Err(KairosError::parse(FIELD_SET_REQUIRED));
        }
        check(tokenizer.delimiter() == Delimiter::Equals, INVALID_FIELD_SET)?;
        let name = tokenizer.token().to_string();

        tokenizer.advance()?;
        check(tokenizer.delimiter() != Delimiter::Equals, INVALID_FIELD_SET)?;
        let value = tokenizer.token().to_string();
        check(!name.is_empty() && !value.is_empty(), INVALID_FIELD_SET)?;

        match fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(field) => field.1 = value,
            None => fields.push((name, value)),
        }

        if tokenizer.delimiter() != Delimiter::Comma {
            return Ok(fields);
        }
    }
}

/// Read the optional timestamp. Extra whitespace around it is ignored,
/// anything else after it is an error.
fn parse_timestamp(tokenizer: &mut Tokenizer) -> KairosResult<Option<i64>> {
    let mut timestamp = None;

    while !tokenizer.is_at_end() {
        tokenizer.advance()?;
        check(
            matches!(tokenizer.delimiter(), Delimiter::Whitespace | Delimiter::End),
            INVALID_TIMESTAMP,
        )?;

        let token = tokenizer.token();
        if token.is_empty() {
            continue;
        }

        if timestamp.is_some() {
            return Err(KairosError::parse(format!(
                "Invalid syntax. Unexpected content after timestamp: {}",
                token
            )));
        }

        let value = token.parse::<i64>().map_err(|_| {
            KairosError::parse(format!("Invalid syntax. Unable to parse timestamp: {}", token))
        })?;
        timestamp = Some(value);
    }

    Ok(timestamp)
}

fn check(condition: bool, message: &str) -> KairosResult<()> {
    if condition {
        Ok(())
    } else {
        Err(KairosError::parse(message))
    }
}
