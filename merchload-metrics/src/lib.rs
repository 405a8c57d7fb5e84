//! Metrics collection and evaluation for merchload
//!
//! A [`Metrics`] handle is created once at process start and cloned into
//! every virtual user. Scenarios write trends, checks and counters through
//! it; at the end of the run the engine takes a [`Summary`], evaluates the
//! configured [`Threshold`]s against it and hands it to the [`report`]
//! module.

pub mod error;
pub mod registry;
pub mod report;
pub mod summary;
pub mod threshold;

pub use error::{MetricsError, MetricsResult};
pub use registry::Metrics;
pub use summary::{CheckStats, Summary, ThresholdOutcome, TrendStats};
pub use threshold::{Aggregate, Comparison, Threshold, ThresholdSet};

/// Completed iterations across all VUs
pub const ITERATIONS: &str = "iterations";
/// Iterations that returned an error
pub const ITERATION_ERRORS: &str = "iteration_errors";
/// Wall time of a whole iteration, think time included
pub const ITERATION_DURATION: &str = "iteration_duration";
/// HTTP requests issued by scenarios
pub const HTTP_REQS: &str = "http_reqs";
/// Peak number of concurrently running VUs
pub const VUS_MAX: &str = "vus_max";
/// Pseudo-metric aggregating every check
pub const CHECKS: &str = "checks";
