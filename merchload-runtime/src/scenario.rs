//! Scenario interface driven by the engine

use async_trait::async_trait;
use merchload_metrics::Metrics;

/// Per-VU state handed to every iteration
#[derive(Debug, Clone)]
pub struct VuContext {
    /// 1-based VU number
    pub vu_id: usize,
    /// Iterations this VU has started before the current one
    pub iteration: u64,
    pub metrics: Metrics,
}

impl VuContext {
    pub fn new(vu_id: usize, metrics: Metrics) -> Self {
        Self {
            vu_id,
            iteration: 0,
            metrics,
        }
    }
}

/// Workload run by every virtual user.
///
/// `iteration` is called concurrently from all VUs, so implementations
/// keep only immutable state or internally synchronized handles.
#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    /// Runs once before the first stage. An error aborts the run.
    async fn setup(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// One pass of the workload. An error is counted and logged, the VU
    /// carries on with the next iteration.
    async fn iteration(&self, vu: &VuContext) -> anyhow::Result<()>;

    /// Runs once after every VU has stopped
    async fn teardown(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
