//! Domain-driven configuration management for merchload
//!
//! Configuration is split by functional domain (HTTP client, logging, the
//! shop scenario, the VU runtime and thresholds), each with validation,
//! defaults and environment variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    http::HttpConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    runtime::{RuntimeConfig, StageConfig},
    scenario::{ReceiverConfig, ScenarioConfig},
    thresholds::ThresholdsConfig,
    MerchloadConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
