//! Batch ingestion of line protocol request bodies
//!
//! Each line is parsed on its own; a bad line is reported and skipped while
//! the rest of the body is still published.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use kairosdb_core::datapoint::DataPoint;
use kairosdb_core::error::KairosResult;
use kairosdb_core::tags::{TagKey, TagSet, TagValue};
use kairosdb_core::time::{Precision, Timestamp};

use crate::config::InfluxConfig;
use crate::drop_filter::DropFilters;
use crate::line_parser::InfluxParser;
use crate::metrics::InfluxMetrics;
use crate::writer::MetricWriter;

pub const INGEST_COUNT_METRIC: &str = "kairosdb.influx.ingest_count";
pub const EXCEPTION_COUNT_METRIC: &str = "kairosdb.influx.exception_count";

/// Outcome of one request body
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Metrics published
    pub success: u64,
    /// Lines rejected
    pub failed: u64,
    pub errors: Vec<String>,
    pub tags_dropped: u64,
    pub metrics_dropped: u64,
}

impl IngestReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Message returned to clients when some lines were rejected
    pub fn partial_write_message(&self) -> String {
        format!(
            "partial write error ({} written): {}",
            self.success,
            self.errors.join(";")
        )
    }
}

/// Parses request bodies and publishes the resulting metrics
pub struct IngestionService {
    config: Arc<InfluxConfig>,

    /// Current parser. Swapped whole on reconfiguration.
    parser: RwLock<Arc<InfluxParser>>,

    writer: Arc<dyn MetricWriter>,

    metrics: Arc<InfluxMetrics>,
}

impl IngestionService {
    pub fn new(
        config: Arc<InfluxConfig>,
        writer: Arc<dyn MetricWriter>,
        metrics: Arc<InfluxMetrics>,
    ) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let parser = InfluxParser::new(config.drop_filters()?)
            .with_default_tags(config.default_tags()?);

        info!(
            "Line protocol ingestion ready, {} tag and {} metric drop patterns",
            config.influx.drop_tags.len(),
            config.influx.drop_metrics.len()
        );

        Ok(Self {
            config,
            parser: RwLock::new(Arc::new(parser)),
            writer,
            metrics,
        })
    }

    /// Snapshot of the parser currently in use
    pub fn parser(&self) -> Arc<InfluxParser> {
        self.parser.read().clone()
    }

    pub fn metrics(&self) -> &Arc<InfluxMetrics> {
        &self.metrics
    }

    /// Replace the drop filters. Nothing changes if a pattern fails to compile.
    pub fn reload_drop_filters<S: AsRef<str>>(
        &self,
        drop_tags: &[S],
        drop_metrics: &[S],
    ) -> KairosResult<()> {
        let filters = DropFilters::new(drop_tags, drop_metrics)?;
        let current = self.parser();
        let parser = InfluxParser::new(filters).with_default_tags(current.default_tags().clone());

        *self.parser.write() = Arc::new(parser);
        info!(
            "Reloaded drop filters, {} tag and {} metric patterns",
            drop_tags.len(),
            drop_metrics.len()
        );
        Ok(())
    }

    /// Parse every line of `body` and publish the surviving metrics.
    ///
    /// Only a failure to publish is returned as an error; bad lines are
    /// collected in the report.
    pub fn write_lines(
        &self,
        body: &str,
        precision: Precision,
        bucket: Option<&str>,
    ) -> KairosResult<IngestReport> {
        let start = Instant::now();
        let parser = self.parser();
        let bucket = bucket.filter(|b| !b.is_empty());
        let prefix = self.metric_prefix(bucket);
        let request_tags = self.request_tags(bucket)?;

        debug!(
            "Writing {} bytes, precision {}, bucket {:?}",
            body.len(),
            precision,
            bucket
        );

        let mut report = IngestReport::default();
        let mut failures = Vec::new();

        for line in body.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let parsed = match parser.parse_line_with_tags(line, precision, &request_tags) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Failed to parse '{}' because {}", line, e.message());
                    self.metrics.record_failure(e.category());
                    report.failed += 1;
                    report
                        .errors
                        .push(format!("Failed to parse '{}' because {}", line, e.message()));
                    failures.push(e.message());
                    continue;
                }
            };

            self.metrics.record_drops(&parsed);
            report.tags_dropped += parsed.tags_dropped;
            report.metrics_dropped += parsed.metrics_dropped;

            for metric in &parsed.metrics {
                let name = metric.name().with_prefix(&prefix);
                trace!("Publishing {}", name);
                let written = self
                    .writer
                    .write(name.as_str(), metric.tags(), metric.data_point());
                if let Err(e) = written {
                    self.metrics.exceptions.with_label_values(&[e.category()]).inc();
                    return Err(e);
                }
                report.success += 1;
            }
        }

        self.metrics.record_success(report.success);
        if self.config.influx.publish_internal_metrics {
            self.publish_internal_metrics(&report, &failures)?;
        }
        self.metrics.observe_write(start.elapsed());

        Ok(report)
    }

    /// `prefix + separator`, then `bucket + separator` when buckets are included
    fn metric_prefix(&self, bucket: Option<&str>) -> String {
        let settings = &self.config.influx;
        let mut prefix = String::new();

        if let Some(p) = settings.prefix.as_deref().filter(|p| !p.is_empty()) {
            prefix.push_str(p);
            prefix.push_str(&settings.metric_separator);
        }

        if settings.include_bucket_or_db {
            if let Some(bucket) = bucket {
                prefix.push_str(bucket);
                prefix.push_str(&settings.metric_separator);
            }
        }

        prefix
    }

    fn request_tags(&self, bucket: Option<&str>) -> KairosResult<TagSet> {
        let settings = &self.config.influx;
        let mut tags = TagSet::new();

        if settings.include_bucket_or_db {
            if let (Some(tag), Some(bucket)) = (settings.bucket_tag.as_deref(), bucket) {
                tags.insert(TagKey::new(tag)?, TagValue::new(bucket)?);
            }
        }

        Ok(tags)
    }

    fn publish_internal_metrics(
        &self,
        report: &IngestReport,
        failures: &[String],
    ) -> KairosResult<()> {
        let now = Timestamp::now();

        self.publish_internal(
            INGEST_COUNT_METRIC,
            ("status", "success"),
            DataPoint::new_long(now, report.success as i64),
        )?;

        if report.failed > 0 {
            self.publish_internal(
                INGEST_COUNT_METRIC,
                ("status", "failed"),
                DataPoint::new_long(now, report.failed as i64),
            )?;
        }

        for message in failures {
            self.publish_internal(
                EXCEPTION_COUNT_METRIC,
                ("exception", message.as_str()),
                DataPoint::new_long(now, 1),
            )?;
        }

        Ok(())
    }

    fn publish_internal(
        &self,
        name: &str,
        (tag, value): (&str, &str),
        data_point: DataPoint,
    ) -> KairosResult<()> {
        let mut tags = TagSet::from_pairs([(tag, value)])?;
        if !self.config.host_name.is_empty() {
            tags.insert(TagKey::new("host")?, TagValue::new(self.config.host_name.as_str())?);
        }

        self.writer.write(name, &tags, &data_point)
    }
}
