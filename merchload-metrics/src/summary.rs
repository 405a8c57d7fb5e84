//! End-of-run summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Statistics of one timing series, all values in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendStats {
    pub count: u64,
    pub avg: f64,
    pub min: f64,
    pub med: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStats {
    pub passes: u64,
    pub fails: u64,
}

impl CheckStats {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    /// Pass ratio, `None` when the check never ran
    pub fn rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.passes as f64 / total as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOutcome {
    pub metric: String,
    pub expression: String,
    /// Value the expression was compared against, absent when the metric had no data
    pub observed: Option<f64>,
    pub passed: bool,
}

/// Everything a run recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: f64,
    pub trends: BTreeMap<String, TrendStats>,
    pub checks: BTreeMap<String, CheckStats>,
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, u64>,
    pub thresholds: Vec<ThresholdOutcome>,
}

impl Summary {
    /// True when no threshold failed
    pub fn passed(&self) -> bool {
        self.thresholds.iter().all(|outcome| outcome.passed)
    }

    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdOutcome> {
        self.thresholds.iter().filter(|outcome| !outcome.passed)
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn total_checks(&self) -> CheckStats {
        self.checks
            .values()
            .fold(CheckStats::default(), |acc, stats| CheckStats {
                passes: acc.passes + stats.passes,
                fails: acc.fails + stats.fails,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_rate() {
        assert_eq!(CheckStats::default().rate(), None);
        let stats = CheckStats { passes: 3, fails: 1 };
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.rate(), Some(0.75));
    }
}
