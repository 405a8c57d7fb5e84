//! Metrics error types

use thiserror::Error;

/// Metrics result type
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Metrics errors
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Threshold expression could not be parsed
    #[error("Invalid threshold '{expression}' on {metric}: {reason}")]
    InvalidThreshold {
        metric: String,
        expression: String,
        reason: String,
    },

    /// Histogram could not be created or written
    #[error("Histogram error: {0}")]
    Histogram(String),

    /// IO error writing a report
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}
