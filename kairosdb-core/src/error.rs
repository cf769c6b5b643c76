//! Error types for KairosDB operations

use thiserror::Error;

/// Result type for KairosDB operations
pub type KairosResult<T> = Result<T, KairosError>;

/// Error types shared by the line protocol parser and the ingestion service
#[derive(Error, Debug)]
pub enum KairosError {
    /// A single line of input could not be parsed. Always local to that line.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KairosError {
    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a new publish error
    pub fn publish<S: Into<String>>(message: S) -> Self {
        Self::Publish(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// The bare message without the category prefix added by `Display`
    pub fn message(&self) -> String {
        match self {
            KairosError::Parse(m)
            | KairosError::Validation(m)
            | KairosError::Configuration(m)
            | KairosError::Publish(m)
            | KairosError::Internal(m) => m.clone(),
            KairosError::Io(e) => e.to_string(),
        }
    }

    /// Get the error category for monitoring/metrics
    pub fn category(&self) -> &'static str {
        match self {
            KairosError::Parse(_) => "parse",
            KairosError::Validation(_) => "validation",
            KairosError::Configuration(_) => "configuration",
            KairosError::Publish(_) => "publish",
            KairosError::Internal(_) => "internal",
            KairosError::Io(_) => "io",
        }
    }
}
