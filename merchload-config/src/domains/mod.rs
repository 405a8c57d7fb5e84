//! Domain-specific configuration modules

pub mod http;
pub mod logging;
pub mod runtime;
pub mod scenario;
pub mod thresholds;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main merchload configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MerchloadConfig {
    /// HTTP client configuration
    #[serde(default)]
    pub http: http::HttpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// Target shop and iteration behaviour
    #[serde(default)]
    pub scenario: scenario::ScenarioConfig,

    /// Ramp stages and VU lifecycle
    #[serde(default)]
    pub runtime: runtime::RuntimeConfig,

    /// Pass/fail criteria per metric
    #[serde(default)]
    pub thresholds: thresholds::ThresholdsConfig,
}

impl MerchloadConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.http.validate()?;
        self.logging.validate()?;
        self.scenario.validate()?;
        self.runtime.validate()?;
        self.thresholds.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = MerchloadConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_parses_back() {
        let sample = MerchloadConfig::generate_sample();
        let parsed: MerchloadConfig = serde_yaml::from_str(&sample).unwrap();
        assert!(parsed.validate_all().is_ok());
        assert_eq!(parsed.runtime.stages.len(), 3);
        assert_eq!(parsed.scenario.items.len(), 10);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let parsed: MerchloadConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(parsed.scenario.base_url, "http://localhost:8080");
        assert_eq!(parsed.thresholds.rules.len(), 4);
    }
}
