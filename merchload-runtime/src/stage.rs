//! Ramp schedule

use crate::error::{RuntimeError, RuntimeResult};
use merchload_config::StageConfig;
use std::time::Duration;

/// Ramp from the previous target to `target` VUs over `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

impl From<&StageConfig> for Stage {
    fn from(config: &StageConfig) -> Self {
        Self::new(config.duration, config.target)
    }
}

/// Cumulative list of stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    stages: Vec<Stage>,
}

impl Schedule {
    pub fn new(stages: Vec<Stage>) -> RuntimeResult<Self> {
        if stages.is_empty() {
            return Err(RuntimeError::InvalidSchedule(
                "at least one stage is required".to_string(),
            ));
        }
        if let Some(index) = stages.iter().position(|stage| stage.duration.is_zero()) {
            return Err(RuntimeError::InvalidSchedule(format!(
                "stage {} has a zero duration",
                index + 1
            )));
        }
        Ok(Self { stages })
    }

    pub fn from_config(stages: &[StageConfig]) -> RuntimeResult<Self> {
        Self::new(stages.iter().map(Stage::from).collect())
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of VUs that should be running `elapsed` into the run.
    ///
    /// Interpolates linearly from the previous stage's target (0 before the
    /// first stage), rounding down. Past the last stage the target is 0.
    pub fn target_at(&self, elapsed: Duration) -> usize {
        let mut stage_start = Duration::ZERO;
        let mut previous = 0usize;
        for stage in &self.stages {
            if elapsed < stage_start + stage.duration {
                let progress = (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                let diff = stage.target as f64 - previous as f64;
                return (previous as f64 + diff * progress) as usize;
            }
            stage_start += stage.duration;
            previous = stage.target;
        }
        0
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|stage| stage.duration).sum()
    }

    pub fn max_target(&self) -> usize {
        self.stages
            .iter()
            .map(|stage| stage.target)
            .max()
            .unwrap_or(0)
    }
}
