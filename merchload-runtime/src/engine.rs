//! Virtual user engine

use crate::error::{RuntimeError, RuntimeResult};
use crate::scenario::{Scenario, VuContext};
use crate::shutdown::{ShutdownCoordinator, ShutdownSignal};
use crate::stage::Schedule;
use merchload_config::{RuntimeConfig, ThresholdsConfig};
use merchload_metrics::{
    Metrics, Summary, ThresholdSet, ITERATIONS, ITERATION_DURATION, ITERATION_ERRORS, VUS_MAX,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

struct VuHandle {
    id: usize,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl VuHandle {
    fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Drives a scenario along a schedule
pub struct Engine {
    schedule: Schedule,
    ramp_interval: Duration,
    graceful_stop: Duration,
    thresholds: ThresholdSet,
    metrics: Metrics,
    shutdown: Arc<ShutdownCoordinator>,
}

impl Engine {
    pub fn new(schedule: Schedule, metrics: Metrics) -> Self {
        let defaults = RuntimeConfig::default();
        Self {
            schedule,
            ramp_interval: defaults.ramp_interval,
            graceful_stop: defaults.graceful_stop,
            thresholds: ThresholdSet::default(),
            metrics,
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Build an engine from the runtime and threshold config domains
    pub fn from_config(
        runtime: &RuntimeConfig,
        thresholds: &ThresholdsConfig,
        metrics: Metrics,
    ) -> RuntimeResult<Self> {
        let schedule = Schedule::from_config(&runtime.stages)?;
        Ok(Self::new(schedule, metrics)
            .with_ramp_interval(runtime.ramp_interval)
            .with_graceful_stop(runtime.graceful_stop)
            .with_thresholds(ThresholdSet::from_config(thresholds)?))
    }

    pub fn with_ramp_interval(mut self, ramp_interval: Duration) -> Self {
        self.ramp_interval = ramp_interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.graceful_stop = graceful_stop;
        self
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdSet) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_shutdown(mut self, shutdown: Arc<ShutdownCoordinator>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownCoordinator> {
        self.shutdown.clone()
    }

    /// Run the scenario to the end of the schedule or until interrupted
    pub async fn run(&self, scenario: Arc<dyn Scenario>) -> RuntimeResult<Summary> {
        let mut shutdown_rx = self.shutdown.subscribe();

        info!(
            "Starting scenario '{}': {} stages over {:?}, up to {} VUs",
            scenario.name(),
            self.schedule.stages().len(),
            self.schedule.total_duration(),
            self.schedule.max_target()
        );

        scenario.setup().await.map_err(|e| RuntimeError::Setup {
            scenario: scenario.name().to_string(),
            message: format!("{:#}", e),
        })?;

        let started = Instant::now();
        let total = self.schedule.total_duration();
        let mut active: Vec<VuHandle> = Vec::new();
        let mut stopping: Vec<VuHandle> = Vec::new();
        let mut forced = false;

        let mut ticker = tokio::time::interval(self.ramp_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.shutdown.is_shutting_down() {
                info!("Shutdown requested, stopping VUs");
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                signal = shutdown_rx.recv() => {
                    forced = matches!(signal, Ok(ShutdownSignal::Forced));
                    info!("Shutdown requested, stopping VUs");
                    break;
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= total {
                debug!("Schedule complete after {:?}", elapsed);
                break;
            }

            let target = self.schedule.target_at(elapsed);
            stopping.retain(|vu| !vu.handle.is_finished());
            self.scale(&scenario, &mut active, &mut stopping, target);
        }

        for vu in &active {
            vu.stop();
        }
        stopping.append(&mut active);
        self.drain(stopping, &mut shutdown_rx, forced).await;

        let duration = started.elapsed();

        if let Err(e) = scenario.teardown().await {
            warn!("Scenario '{}' teardown failed: {:#}", scenario.name(), e);
        }

        info!("Scenario '{}' finished in {:?}", scenario.name(), duration);
        Ok(self.metrics.summary(duration, &self.thresholds))
    }

    /// Spawn or stop VUs until `target` are running. The highest ids stop first.
    ///
    /// A new VU never takes the id of one that is still draining.
    fn scale(
        &self,
        scenario: &Arc<dyn Scenario>,
        active: &mut Vec<VuHandle>,
        stopping: &mut Vec<VuHandle>,
        target: usize,
    ) {
        if active.len() == target {
            return;
        }

        if active.len() < target {
            debug!("Scaling up from {} to {} VUs", active.len(), target);
            let taken = active.iter().chain(stopping.iter()).map(|vu| vu.id);
            for id in allocate_ids(taken, target - active.len()) {
                active.push(self.spawn_vu(id, scenario.clone()));
            }
            active.sort_by_key(|vu| vu.id);
            self.metrics.gauge_max(VUS_MAX, active.len() as u64);
        } else {
            debug!("Scaling down from {} to {} VUs", active.len(), target);
            while active.len() > target {
                if let Some(vu) = active.pop() {
                    vu.stop();
                    stopping.push(vu);
                }
            }
        }
    }

    fn spawn_vu(&self, id: usize, scenario: Arc<dyn Scenario>) -> VuHandle {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let mut context = VuContext::new(id, self.metrics.clone());

        let handle = tokio::spawn(async move {
            while flag.load(Ordering::Acquire) {
                let iteration_started = Instant::now();
                let result = scenario.iteration(&context).await;
                context
                    .metrics
                    .add_trend(ITERATION_DURATION, iteration_started.elapsed());
                context.metrics.incr(ITERATIONS);
                if let Err(e) = result {
                    context.metrics.incr(ITERATION_ERRORS);
                    warn!(
                        vu = context.vu_id,
                        iteration = context.iteration,
                        "Iteration failed: {:#}",
                        e
                    );
                }
                context.iteration += 1;
            }
            debug!(vu = context.vu_id, "VU stopped after {} iterations", context.iteration);
        });

        VuHandle {
            id,
            running,
            handle,
        }
    }

    /// Wait up to the graceful stop period for stopped VUs, then abort the rest
    async fn drain(
        &self,
        mut vus: Vec<VuHandle>,
        shutdown_rx: &mut broadcast::Receiver<ShutdownSignal>,
        forced: bool,
    ) {
        if !forced && !vus.is_empty() {
            debug!(
                "Waiting up to {:?} for {} VUs to finish",
                self.graceful_stop,
                vus.len()
            );
            let joined = futures::future::join_all(vus.iter_mut().map(|vu| &mut vu.handle));
            let forced_signal = async {
                loop {
                    match shutdown_rx.recv().await {
                        Ok(ShutdownSignal::Forced) => return,
                        Ok(ShutdownSignal::Graceful) => continue,
                        // Nobody can escalate any more
                        Err(broadcast::error::RecvError::Closed) => {
                            futures::future::pending::<()>().await
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            };

            tokio::select! {
                _ = tokio::time::timeout(self.graceful_stop, joined) => {}
                _ = forced_signal => info!("Forced shutdown, aborting VUs"),
            }
        }

        let mut aborted = 0;
        for vu in &vus {
            if !vu.handle.is_finished() {
                vu.handle.abort();
                aborted += 1;
                debug!(vu = vu.id, "Aborted VU");
            }
        }
        if aborted > 0 {
            warn!(
                "{} VUs did not finish within the graceful stop period and were aborted",
                aborted
            );
        }
    }
}

/// Lowest `count` positive ids not in `taken`
fn allocate_ids(taken: impl IntoIterator<Item = usize>, count: usize) -> Vec<usize> {
    let taken: HashSet<usize> = taken.into_iter().collect();
    (1..).filter(|id| !taken.contains(id)).take(count).collect()
}
