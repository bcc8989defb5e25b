//! Coalescer error types.

use thiserror::Error;

/// Errors that can occur in coalescer operations.
#[derive(Debug, Error)]
pub enum CoalescerError {
    /// The coalescer has been closed; the head change was not merged.
    #[error("head change coalescer closed")]
    Closed,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error.
    #[error("YAML error: {0}")]
    Yaml(String),
}

/// A specialized Result type for coalescer operations.
pub type Result<T> = std::result::Result<T, CoalescerError>;
