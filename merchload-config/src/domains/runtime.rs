//! Virtual user runtime configuration

use crate::error::ConfigResult;
use crate::validation::{validate_non_zero_duration, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ramp schedule and VU lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Cumulative ramp stages
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,

    /// How often the VU count is reconciled with the schedule
    #[serde(with = "humantime_serde", default = "default_ramp_interval")]
    pub ramp_interval: Duration,

    /// Time in-flight iterations get to finish once their VU is stopped
    #[serde(with = "humantime_serde", default = "default_graceful_stop")]
    pub graceful_stop: Duration,
}

/// One segment of the ramp schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Length of the segment
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// VU count reached at the end of the segment
    pub target: usize,
}

impl StageConfig {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stages: default_stages(),
            ramp_interval: default_ramp_interval(),
            graceful_stop: default_graceful_stop(),
        }
    }
}

impl Validatable for RuntimeConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.stages.is_empty() {
            return Err(self.validation_error("at least one stage must be configured"));
        }

        for (index, stage) in self.stages.iter().enumerate() {
            validate_non_zero_duration(
                stage.duration,
                &format!("stages[{}].duration", index),
                self.domain_name(),
            )?;
        }

        if self.stages.iter().all(|stage| stage.target == 0) {
            log::warn!("no stage targets more than 0 VUs, the run will issue no requests");
        }

        validate_non_zero_duration(self.ramp_interval, "ramp_interval", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runtime"
    }
}

// Default value functions
fn default_stages() -> Vec<StageConfig> {
    vec![
        StageConfig::new(Duration::from_secs(30), 100),
        StageConfig::new(Duration::from_secs(60), 100),
        StageConfig::new(Duration::from_secs(30), 0),
    ]
}

fn default_ramp_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_graceful_stop() -> Duration {
    Duration::from_secs(30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(
            config.stages,
            vec![
                StageConfig::new(Duration::from_secs(30), 100),
                StageConfig::new(Duration::from_secs(60), 100),
                StageConfig::new(Duration::from_secs(30), 0),
            ]
        );
        assert_eq!(config.ramp_interval, Duration::from_millis(100));
        assert_eq!(config.graceful_stop, Duration::from_secs(30));
    }

    #[test]
    fn test_runtime_validation() {
        let mut config = RuntimeConfig::default();
        assert!(config.validate().is_ok());

        config.stages.clear();
        assert!(config.validate().is_err());

        config = RuntimeConfig::default();
        config.stages[1].duration = Duration::ZERO;
        assert!(config.validate().is_err());

        config = RuntimeConfig::default();
        config.ramp_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stages_parse_humantime() {
        let yaml = r#"
stages:
  - duration: 10s
    target: 5
  - duration: 1m
    target: 5
"#;
        let config: RuntimeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.stages[0], StageConfig::new(Duration::from_secs(10), 5));
        assert_eq!(config.stages[1].duration, Duration::from_secs(60));
        assert_eq!(config.graceful_stop, Duration::from_secs(30));
    }
}
