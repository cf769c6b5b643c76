//! # KairosDB Core Library
//!
//! Shared value types and errors for the KairosDB line protocol ingestion
//! service.
//!
//! ## Features
//!
//! - **Data Types**: Data points, metrics, and tags
//! - **Time**: Millisecond timestamps and line protocol precisions
//! - **Errors**: A single error type for parsing, validation, and configuration

pub mod datapoint;
pub mod error;
pub mod metrics;
pub mod tags;
pub mod time;

// Re-export commonly used types
pub use datapoint::{DataPoint, DataPointValue};
pub use error::{KairosError, KairosResult};
pub use metrics::{Metric, MetricName};
pub use tags::{TagKey, TagSet, TagValue};
pub use time::{Precision, Timestamp};

/// Version information for KairosDB-rs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
