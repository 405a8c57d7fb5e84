//! Runtime error types

use merchload_metrics::MetricsError;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// The scenario's setup phase failed, no VU was started
    #[error("Scenario '{scenario}' setup failed: {message}")]
    Setup { scenario: String, message: String },

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}
