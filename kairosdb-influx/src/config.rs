use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

use kairosdb_core::tags::TagSet;

use crate::drop_filter::DropFilters;

/// Configuration for the line protocol service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// Value of the injected host tag and of the internal metrics' host tag
    pub host_name: String,

    /// Line protocol handling
    pub influx: InfluxSettings,

    /// Ingestion limits and settings
    pub ingestion: IngestionConfig,

    /// Metrics and monitoring configuration
    pub metrics: MetricsConfig,

    /// Health check configuration
    pub health: HealthConfig,
}

/// How parsed lines are named, tagged and filtered
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxSettings {
    /// Prefix for every published metric name
    pub prefix: Option<String>,

    /// Appended after the prefix and after the bucket
    pub metric_separator: String,

    /// Add the request's bucket or database to the metric prefix
    pub include_bucket_or_db: bool,

    /// Tag name used to carry the bucket when `include_bucket_or_db` is set
    pub bucket_tag: Option<String>,

    /// Tag injected with `host_name` when a line has none of its own
    pub host_tag: Option<String>,

    /// Regexes for metric names to drop
    pub drop_metrics: Vec<String>,

    /// Regexes for tag names to drop
    pub drop_tags: Vec<String>,

    /// Publish ingest and exception counts as data points
    pub publish_internal_metrics: bool,
}

/// Ingestion-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Maximum request size in bytes
    pub max_request_size: usize,

    /// Maximum decompressed payload size in bytes
    pub max_decompressed_size: usize,

    /// Honour `Content-Encoding: gzip`
    pub enable_gzip: bool,
}

/// Metrics and monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics endpoint path
    pub metrics_path: String,
}

/// Health check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Health check endpoint path
    pub health_path: String,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            host_name: env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()),
            influx: InfluxSettings::default(),
            ingestion: IngestionConfig::default(),
            metrics: MetricsConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl Default for InfluxSettings {
    fn default() -> Self {
        Self {
            prefix: None,
            metric_separator: ".".to_string(),
            include_bucket_or_db: false,
            bucket_tag: None,
            host_tag: Some("host".to_string()),
            drop_metrics: Vec::new(),
            drop_tags: Vec::new(),
            publish_internal_metrics: true,
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_request_size: 100 * 1024 * 1024, // 100MB
            max_decompressed_size: 100 * 1024 * 1024,
            enable_gzip: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            metrics_path: "/metrics".to_string(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            health_path: "/health".to_string(),
        }
    }
}

impl InfluxConfig {
    /// Load configuration from file, environment variables, and defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            config = Self::load_from_file(&config_path)?;
        } else if std::path::Path::new("config/development.yaml").exists() {
            config = Self::load_from_file("config/development.yaml")?;
        } else if std::path::Path::new("config/production.yaml").exists() {
            config = Self::load_from_file("config/production.yaml")?;
        }

        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Override settings from `KAIROSDB_*` variables, looked up through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind_addr) = lookup("KAIROSDB_BIND_ADDRESS") {
            self.bind_address = bind_addr;
        }

        if let Some(host_name) = lookup("KAIROSDB_HOST_NAME") {
            self.host_name = host_name;
        }

        if let Some(prefix) = lookup("KAIROSDB_INFLUX_PREFIX") {
            self.influx.prefix = Some(prefix).filter(|p| !p.is_empty());
        }

        if let Some(patterns) = lookup("KAIROSDB_INFLUX_DROP_METRICS") {
            self.influx.drop_metrics = split_list(&patterns);
        }

        if let Some(patterns) = lookup("KAIROSDB_INFLUX_DROP_TAGS") {
            self.influx.drop_tags = split_list(&patterns);
        }

        if let Some(include_bucket) = lookup("KAIROSDB_INFLUX_INCLUDE_BUCKET") {
            self.influx.include_bucket_or_db = include_bucket
                .parse()
                .with_context(|| {
                    format!("Invalid KAIROSDB_INFLUX_INCLUDE_BUCKET: {}", include_bucket)
                })?;
        }

        if let Some(bucket_tag) = lookup("KAIROSDB_INFLUX_BUCKET_TAG") {
            self.influx.bucket_tag = Some(bucket_tag).filter(|t| !t.is_empty());
        }

        if let Some(metrics_path) = lookup("KAIROSDB_METRICS_PATH") {
            self.metrics.metrics_path = metrics_path;
        }

        if let Some(health_path) = lookup("KAIROSDB_HEALTH_PATH") {
            self.health.health_path = health_path;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bind_address.is_empty() {
            return Err(anyhow::anyhow!("Bind address cannot be empty"));
        }

        if self.influx.host_tag.is_some() && self.host_name.is_empty() {
            return Err(anyhow::anyhow!(
                "Host name cannot be empty when a host tag is configured"
            ));
        }

        if self.ingestion.max_request_size == 0 {
            return Err(anyhow::anyhow!("Max request size must be greater than 0"));
        }

        for path in [&self.metrics.metrics_path, &self.health.health_path] {
            if !path.starts_with('/') {
                return Err(anyhow::anyhow!("Endpoint path must start with '/': {}", path));
            }
        }

        self.drop_filters()
            .context("Invalid drop pattern in configuration")?;

        Ok(())
    }

    /// Compile the configured drop patterns
    pub fn drop_filters(&self) -> Result<DropFilters> {
        Ok(DropFilters::new(
            self.influx.drop_tags.as_slice(),
            self.influx.drop_metrics.as_slice(),
        )?)
    }

    /// Tags every parsed line starts with
    pub fn default_tags(&self) -> Result<TagSet> {
        let pairs = self
            .influx
            .host_tag
            .iter()
            .map(|tag| (tag.clone(), self.host_name.clone()));
        Ok(TagSet::from_pairs(pairs)?)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
