//! Process-wide metrics registry

use crate::summary::{CheckStats, Summary, ThresholdOutcome, TrendStats};
use crate::threshold::{Aggregate, ThresholdSet};
use crate::CHECKS;
use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Timing samples of one series, in microseconds
#[derive(Debug)]
struct Trend {
    histogram: Histogram<u64>,
    count: u64,
    sum_us: u128,
    min_us: u64,
    max_us: u64,
}

impl Trend {
    fn new() -> Result<Self, hdrhistogram::CreationError> {
        // 5 significant digits: every value below 262ms lands in its own bucket
        Ok(Self {
            histogram: Histogram::new(5)?,
            count: 0,
            sum_us: 0,
            min_us: u64::MAX,
            max_us: 0,
        })
    }

    fn record(&mut self, micros: u64) {
        if let Err(e) = self.histogram.record(micros) {
            warn!("Dropping sample of {}us from histogram: {}", micros, e);
        }
        self.count += 1;
        self.sum_us += u128::from(micros);
        self.min_us = self.min_us.min(micros);
        self.max_us = self.max_us.max(micros);
    }

    fn aggregate_ms(&self, aggregate: Aggregate) -> Option<f64> {
        if self.count == 0 {
            return match aggregate {
                Aggregate::Count => Some(0.0),
                _ => None,
            };
        }
        let value = match aggregate {
            Aggregate::Avg => self.sum_us as f64 / self.count as f64 / 1000.0,
            Aggregate::Min => self.min_us as f64 / 1000.0,
            Aggregate::Max => self.max_us as f64 / 1000.0,
            Aggregate::Med => self.quantile_ms(0.5),
            Aggregate::Percentile(p) => self.quantile_ms(p / 100.0),
            Aggregate::Count => self.count as f64,
            Aggregate::Rate | Aggregate::Value => return None,
        };
        Some(value)
    }

    fn quantile_ms(&self, quantile: f64) -> f64 {
        // Histogram buckets round; keep the result inside the exact range
        let raw = self.histogram.value_at_quantile(quantile.clamp(0.0, 1.0));
        raw.clamp(self.min_us, self.max_us) as f64 / 1000.0
    }

    fn stats(&self) -> TrendStats {
        let ms = |aggregate| self.aggregate_ms(aggregate).unwrap_or(0.0);
        TrendStats {
            count: self.count,
            avg: ms(Aggregate::Avg),
            min: ms(Aggregate::Min),
            med: ms(Aggregate::Med),
            p90: ms(Aggregate::Percentile(90.0)),
            p95: ms(Aggregate::Percentile(95.0)),
            p99: ms(Aggregate::Percentile(99.0)),
            max: ms(Aggregate::Max),
        }
    }
}

#[derive(Debug, Default)]
struct CheckCounter {
    passes: AtomicU64,
    fails: AtomicU64,
}

impl CheckCounter {
    fn stats(&self) -> CheckStats {
        CheckStats {
            passes: self.passes.load(Ordering::Relaxed),
            fails: self.fails.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct Registry {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    trends: RwLock<HashMap<String, Arc<Mutex<Trend>>>>,
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
    gauges: RwLock<HashMap<String, Arc<AtomicU64>>>,
    checks: RwLock<HashMap<String, Arc<CheckCounter>>>,
}

/// Fetch an entry under the read lock, inserting it under the write lock
/// the first time a name is seen.
fn entry<T>(
    map: &RwLock<HashMap<String, Arc<T>>>,
    name: &str,
    create: impl FnOnce() -> Option<T>,
) -> Option<Arc<T>> {
    if let Some(existing) = map.read().get(name) {
        return Some(existing.clone());
    }
    let mut map = map.write();
    if let Some(existing) = map.get(name) {
        return Some(existing.clone());
    }
    let created = Arc::new(create()?);
    map.insert(name.to_string(), created.clone());
    Some(created)
}

/// Cloneable handle to the run's metrics.
///
/// Every clone writes into the same registry. Writers only take a read
/// lock on the name index once a series exists.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<Registry>,
}

impl Metrics {
    pub fn new() -> Self {
        let run_id = Uuid::new_v4();
        debug!("Created metrics registry for run {}", run_id);
        Self {
            inner: Arc::new(Registry {
                run_id,
                started_at: Utc::now(),
                trends: RwLock::new(HashMap::new()),
                counters: RwLock::new(HashMap::new()),
                gauges: RwLock::new(HashMap::new()),
                checks: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Record one timing sample
    pub fn add_trend(&self, name: &str, elapsed: Duration) {
        let trend = entry(&self.inner.trends, name, || match Trend::new() {
            Ok(trend) => Some(Mutex::new(trend)),
            Err(e) => {
                warn!("Cannot create histogram for {}: {}", name, e);
                None
            }
        });
        if let Some(trend) = trend {
            let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
            trend.lock().record(micros);
        }
    }

    /// Count a pass or a fail of a named check
    pub fn check(&self, name: &str, passed: bool) -> bool {
        if let Some(counter) = entry(&self.inner.checks, name, || Some(CheckCounter::default())) {
            let slot = if passed { &counter.passes } else { &counter.fails };
            slot.fetch_add(1, Ordering::Relaxed);
        }
        passed
    }

    pub fn incr(&self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &str, value: u64) {
        if let Some(counter) = entry(&self.inner.counters, name, || Some(AtomicU64::new(0))) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    /// Raise a gauge to `value` if it is higher than the current peak
    pub fn gauge_max(&self, name: &str, value: u64) {
        if let Some(gauge) = entry(&self.inner.gauges, name, || Some(AtomicU64::new(0))) {
            gauge.fetch_max(value, Ordering::Relaxed);
        }
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.inner
            .counters
            .read()
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn gauge(&self, name: &str) -> Option<u64> {
        self.inner
            .gauges
            .read()
            .get(name)
            .map(|g| g.load(Ordering::Relaxed))
    }

    pub fn trend_count(&self, name: &str) -> u64 {
        self.inner
            .trends
            .read()
            .get(name)
            .map(|t| t.lock().count)
            .unwrap_or(0)
    }

    pub fn check_stats(&self, name: &str) -> CheckStats {
        self.inner
            .checks
            .read()
            .get(name)
            .map(|c| c.stats())
            .unwrap_or_default()
    }

    /// All checks added together
    fn all_checks(&self) -> CheckStats {
        self.inner
            .checks
            .read()
            .values()
            .map(|c| c.stats())
            .fold(CheckStats::default(), |acc, s| CheckStats {
                passes: acc.passes + s.passes,
                fails: acc.fails + s.fails,
            })
    }

    /// Read `aggregate` from whatever kind of metric carries `name`.
    ///
    /// Returns `None` when the metric has no data for that aggregate.
    pub fn observe(&self, name: &str, aggregate: Aggregate, duration: Duration) -> Option<f64> {
        if let Some(trend) = self.inner.trends.read().get(name) {
            return trend.lock().aggregate_ms(aggregate);
        }

        let checks = if name == CHECKS {
            Some(self.all_checks())
        } else {
            self.inner.checks.read().get(name).map(|c| c.stats())
        };
        if let Some(stats) = checks {
            return match aggregate {
                Aggregate::Count => Some(stats.total() as f64),
                Aggregate::Rate => stats.rate(),
                _ => None,
            };
        }

        if let Some(counter) = self.inner.counters.read().get(name) {
            let value = counter.load(Ordering::Relaxed) as f64;
            return match aggregate {
                Aggregate::Count | Aggregate::Value => Some(value),
                Aggregate::Rate if !duration.is_zero() => Some(value / duration.as_secs_f64()),
                _ => None,
            };
        }

        if let Some(gauge) = self.inner.gauges.read().get(name) {
            let value = gauge.load(Ordering::Relaxed) as f64;
            return match aggregate {
                Aggregate::Value | Aggregate::Max => Some(value),
                _ => None,
            };
        }

        None
    }

    /// Evaluate every threshold against the current data
    pub fn evaluate(&self, thresholds: &ThresholdSet, duration: Duration) -> Vec<ThresholdOutcome> {
        thresholds
            .iter()
            .map(|threshold| {
                let observed = self.observe(&threshold.metric, threshold.aggregate, duration);
                let passed = threshold.check(observed);
                if !passed {
                    debug!(
                        "Threshold {} crossed (observed {:?})",
                        threshold, observed
                    );
                }
                ThresholdOutcome {
                    metric: threshold.metric.clone(),
                    expression: threshold.expression.clone(),
                    observed,
                    passed,
                }
            })
            .collect()
    }

    /// Snapshot everything recorded so far and evaluate the thresholds
    pub fn summary(&self, duration: Duration, thresholds: &ThresholdSet) -> Summary {
        let trends: BTreeMap<_, _> = self
            .inner
            .trends
            .read()
            .iter()
            .map(|(name, trend)| (name.clone(), trend.lock().stats()))
            .collect();
        let checks: BTreeMap<_, _> = self
            .inner
            .checks
            .read()
            .iter()
            .map(|(name, counter)| (name.clone(), counter.stats()))
            .collect();
        let counters: BTreeMap<_, _> = self
            .inner
            .counters
            .read()
            .iter()
            .map(|(name, counter)| (name.clone(), counter.load(Ordering::Relaxed)))
            .collect();
        let gauges: BTreeMap<_, _> = self
            .inner
            .gauges
            .read()
            .iter()
            .map(|(name, gauge)| (name.clone(), gauge.load(Ordering::Relaxed)))
            .collect();

        Summary {
            run_id: self.inner.run_id,
            started_at: self.inner.started_at,
            duration_ms: duration.as_secs_f64() * 1000.0,
            trends,
            checks,
            counters,
            gauges,
            thresholds: self.evaluate(thresholds, duration),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::Threshold;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_trend_stats() {
        let metrics = Metrics::new();
        for n in 1..=100 {
            metrics.add_trend("auth_response_time", ms(n));
        }

        let summary = metrics.summary(Duration::from_secs(1), &ThresholdSet::default());
        let stats = &summary.trends["auth_response_time"];
        assert_eq!(stats.count, 100);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 100.0);
        assert!((stats.avg - 50.5).abs() < 1e-9);
        // Rank rounding may land on the next sample
        assert!(stats.med >= 49.9 && stats.med <= 51.1, "med = {}", stats.med);
        assert!(stats.p95 >= 94.9 && stats.p95 <= 96.1, "p95 = {}", stats.p95);
        assert!(stats.p99 >= 98.9 && stats.p99 <= 100.0, "p99 = {}", stats.p99);
    }

    #[test]
    fn test_clones_share_registry() {
        let metrics = Metrics::new();
        let clone = metrics.clone();
        clone.incr("iterations");
        metrics.incr("iterations");
        clone.add_trend("info_response_time", ms(3));

        assert_eq!(metrics.counter("iterations"), 2);
        assert_eq!(metrics.trend_count("info_response_time"), 1);
        assert_eq!(metrics.run_id(), clone.run_id());
    }

    #[test]
    fn test_checks_and_gauges() {
        let metrics = Metrics::new();
        assert!(metrics.check("auth status is 200", true));
        assert!(!metrics.check("auth status is 200", false));
        metrics.check("get info status is 200", true);

        let stats = metrics.check_stats("auth status is 200");
        assert_eq!((stats.passes, stats.fails), (1, 1));

        let all = metrics.observe(CHECKS, Aggregate::Rate, Duration::ZERO);
        assert!((all.unwrap() - 2.0 / 3.0).abs() < 1e-9);

        metrics.gauge_max("vus_max", 3);
        metrics.gauge_max("vus_max", 10);
        metrics.gauge_max("vus_max", 7);
        assert_eq!(metrics.gauge("vus_max"), Some(10));
    }

    #[test]
    fn test_slow_series_fails_default_threshold() {
        let metrics = Metrics::new();
        for _ in 0..10 {
            metrics.add_trend("auth_response_time", ms(5));
            metrics.add_trend("buy_item_response_time", ms(60));
        }
        let thresholds = ThresholdSet::new(vec![
            Threshold::parse("auth_response_time", "p(95)<50").unwrap(),
            Threshold::parse("buy_item_response_time", "p(95)<50").unwrap(),
        ]);

        let summary = metrics.summary(Duration::from_secs(1), &thresholds);
        assert!(!summary.passed());
        let failed: Vec<_> = summary
            .thresholds
            .iter()
            .filter(|o| !o.passed)
            .map(|o| o.metric.as_str())
            .collect();
        assert_eq!(failed, vec!["buy_item_response_time"]);
    }

    #[test]
    fn test_p95_exactly_fifty_fails() {
        let metrics = Metrics::new();
        for _ in 0..20 {
            metrics.add_trend("send_coin_response_time", ms(50));
        }
        let thresholds = ThresholdSet::new(vec![Threshold::parse(
            "send_coin_response_time",
            "p(95)<50",
        )
        .unwrap()]);
        assert!(!metrics.summary(Duration::from_secs(1), &thresholds).passed());
    }

    #[test]
    fn test_p95_just_under_fifty_passes() {
        let metrics = Metrics::new();
        for _ in 0..96 {
            metrics.add_trend("buy_item_response_time", Duration::from_micros(49_990));
        }
        for _ in 0..4 {
            metrics.add_trend("buy_item_response_time", ms(60));
        }
        let thresholds = ThresholdSet::new(vec![Threshold::parse(
            "buy_item_response_time",
            "p(95)<50",
        )
        .unwrap()]);

        let summary = metrics.summary(Duration::from_secs(1), &thresholds);
        assert_eq!(summary.trends["buy_item_response_time"].p95, 49.99);
        assert!(summary.passed(), "{:?}", summary.thresholds);
    }

    #[test]
    fn test_empty_series_thresholds() {
        let metrics = Metrics::new();
        let thresholds = ThresholdSet::new(vec![
            Threshold::parse("info_response_time", "p(95)<50").unwrap(),
            Threshold::parse("iteration_errors", "count==0").unwrap(),
        ]);
        let outcomes = metrics.evaluate(&thresholds, Duration::from_secs(1));
        assert!(!outcomes[0].passed);
        assert_eq!(outcomes[0].observed, None);
        assert!(outcomes[1].passed);
    }

    #[test]
    fn test_counter_rate() {
        let metrics = Metrics::new();
        metrics.add("http_reqs", 40);
        assert_eq!(
            metrics.observe("http_reqs", Aggregate::Rate, Duration::from_secs(4)),
            Some(10.0)
        );
        assert_eq!(
            metrics.observe("http_reqs", Aggregate::Rate, Duration::ZERO),
            None
        );
    }
}
