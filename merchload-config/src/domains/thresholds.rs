//! Threshold configuration
//!
//! Maps a metric name to the expressions it must satisfy at the end of the
//! run, e.g. `auth_response_time: ["p(95)<50"]`. Expressions are parsed by
//! the metrics crate when the run starts.

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric names checked by default
pub const DEFAULT_THRESHOLD_METRICS: [&str; 4] = [
    "auth_response_time",
    "buy_item_response_time",
    "send_coin_response_time",
    "info_response_time",
];

/// Pass/fail criteria keyed by metric name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdsConfig {
    pub rules: BTreeMap<String, Vec<String>>,
}

impl ThresholdsConfig {
    /// No thresholds at all, the run always passes
    pub fn none() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.values().all(|expressions| expressions.is_empty())
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        let rules = DEFAULT_THRESHOLD_METRICS
            .iter()
            .map(|metric| (metric.to_string(), vec!["p(95)<50".to_string()]))
            .collect();
        Self { rules }
    }
}

impl Validatable for ThresholdsConfig {
    fn validate(&self) -> ConfigResult<()> {
        for (metric, expressions) in &self.rules {
            validate_required_string(metric, "metric name", self.domain_name())?;
            for expression in expressions {
                validate_required_string(
                    expression,
                    &format!("threshold for {}", metric),
                    self.domain_name(),
                )?;
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "thresholds"
    }
}
