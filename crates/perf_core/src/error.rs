//! Error types for measurement and benchmarking.
//!
//! Every variant is recoverable: instrumentation must never take down the
//! application it observes. Callers are free to log and ignore any of these.

use thiserror::Error;

/// Errors that can occur while measuring or benchmarking.
#[derive(Debug, Error)]
pub enum PerfError {
    /// `end` was called for a subject with no pending `start`
    #[error("No pending measurement for subject '{subject}'")]
    Measurement { subject: String },

    /// A negative or non-finite duration was offered to the aggregator
    #[error("Invalid sample for subject '{subject}': {duration_ms}ms")]
    InvalidSample { subject: String, duration_ms: f64 },

    /// A benchmark was requested with zero iterations
    #[error("Invalid iteration count: {requested} (must be at least 1)")]
    InvalidIterationCount { requested: usize },

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read a configuration file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to (de)serialize configuration or a report
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PerfError {
    /// Whether the caller may continue after this error.
    ///
    /// Always true; the core has no fatal error class.
    pub fn is_recoverable(&self) -> bool {
        true
    }
}

/// Result type for perf operations.
pub type PerfResult<T> = Result<T, PerfError>;
