//! Prometheus statistics for the line protocol service

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

use crate::line_parser::ParsedLine;

/// Counters and timings for ingestion, registered on their own registry so
/// that several services can coexist in one process (tests in particular).
#[derive(Debug, Clone)]
pub struct InfluxMetrics {
    registry: Registry,
    pub metrics_dropped: IntCounter,
    pub tags_dropped: IntCounter,
    pub ingest: IntCounterVec,
    pub exceptions: IntCounterVec,
    pub write_duration: Histogram,
}

impl InfluxMetrics {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> anyhow::Result<Self> {
        let metrics_dropped = IntCounter::new(
            "kairosdb_influx_metrics_dropped_total",
            "Metrics removed by the metric drop filter",
        )?;
        let tags_dropped = IntCounter::new(
            "kairosdb_influx_tags_dropped_total",
            "Tags removed by the tag drop filter",
        )?;
        let ingest = IntCounterVec::new(
            Opts::new(
                "kairosdb_influx_ingest_total",
                "Metrics published and lines rejected, by status",
            ),
            &["status"],
        )?;
        let exceptions = IntCounterVec::new(
            Opts::new(
                "kairosdb_influx_exceptions_total",
                "Line failures by error category",
            ),
            &["category"],
        )?;
        let write_duration = Histogram::with_opts(HistogramOpts::new(
            "kairosdb_influx_write_duration_seconds",
            "Time spent handling one write request",
        ))?;

        registry.register(Box::new(metrics_dropped.clone()))?;
        registry.register(Box::new(tags_dropped.clone()))?;
        registry.register(Box::new(ingest.clone()))?;
        registry.register(Box::new(exceptions.clone()))?;
        registry.register(Box::new(write_duration.clone()))?;

        Ok(Self {
            registry,
            metrics_dropped,
            tags_dropped,
            ingest,
            exceptions,
            write_duration,
        })
    }

    pub fn record_drops(&self, parsed: &ParsedLine) {
        self.tags_dropped.inc_by(parsed.tags_dropped);
        self.metrics_dropped.inc_by(parsed.metrics_dropped);
    }

    pub fn record_success(&self, count: u64) {
        self.ingest.with_label_values(&["success"]).inc_by(count);
    }

    pub fn record_failure(&self, category: &str) {
        self.ingest.with_label_values(&["failed"]).inc();
        self.exceptions.with_label_values(&[category]).inc();
    }

    pub fn observe_write(&self, elapsed: Duration) {
        self.write_duration.observe(elapsed.as_secs_f64());
    }

    /// Render the registry in the Prometheus text format
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
