//! Subcommand handlers

pub mod config;
pub mod run;

use anyhow::{Context, Result};
use merchload_config::{ConfigLoader, MerchloadConfig};
use std::path::Path;
use tracing::{debug, info};

/// Load configuration from file or use defaults.
///
/// Runs before tracing is initialized, so it logs nothing itself; see
/// [`announce_config`].
pub fn load_config(config_path: Option<&Path>) -> Result<MerchloadConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => loader
            .from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => loader
            .from_env()
            .context("Failed to load configuration from environment"),
    }
}

/// Log where the configuration came from
pub fn announce_config(config_path: Option<&Path>, config: &MerchloadConfig) {
    match config_path {
        Some(path) => info!("Loaded configuration from: {:?}", path),
        None => info!("No configuration file specified, using environment and defaults"),
    }
    debug!(
        "Target {} with {} stages and {} threshold metrics",
        config.scenario.base_url,
        config.runtime.stages.len(),
        config.thresholds.rules.len()
    );
}
