//! `merchload run`

use crate::cli::RunArgs;
use anyhow::{Context, Result};
use merchload_config::{MerchloadConfig, ThresholdsConfig};
use merchload_http::{HttpConfig, HttpManager};
use merchload_metrics::{report, Metrics, Summary};
use merchload_runtime::Engine;
use merchload_scenario::{offline_mocks, ShopScenario};
use std::sync::Arc;
use tracing::info;

/// Exit code of a run whose thresholds failed
pub const THRESHOLDS_FAILED: u8 = 99;

/// Apply command-line overrides on top of the loaded configuration
pub fn apply_overrides(config: &mut MerchloadConfig, args: &RunArgs) -> Result<()> {
    if let Some(base_url) = &args.base_url {
        config.scenario.base_url = base_url.clone();
    }
    if args.no_thresholds {
        config.thresholds = ThresholdsConfig::none();
    }
    config
        .validate_all()
        .context("Invalid configuration after command-line overrides")?;
    Ok(())
}

/// Build the HTTP client the scenario shares across VUs
pub fn http_manager(config: &MerchloadConfig, offline: bool) -> Result<HttpManager> {
    let mut manager = HttpManager::with_config(HttpConfig::from(config.http.clone()))
        .context("Failed to build HTTP client")?;
    if offline {
        manager.set_offline();
        manager.add_mocks(offline_mocks(&config.scenario.base_url));
    }
    Ok(manager)
}

/// Run the load test and return the summary
pub async fn execute(config: &MerchloadConfig, offline: bool) -> Result<Summary> {
    let manager = http_manager(config, offline)?;
    let scenario = ShopScenario::new(config.scenario.clone(), Arc::new(manager));

    let metrics = Metrics::new();
    let engine = Engine::from_config(&config.runtime, &config.thresholds, metrics)
        .context("Failed to prepare the run")?;
    let ctrl_c = engine.shutdown_handle().listen_for_ctrl_c();

    let result = engine.run(Arc::new(scenario)).await;
    ctrl_c.abort();

    result.context("Load test failed")
}

pub async fn handle_run(mut config: MerchloadConfig, args: &RunArgs) -> Result<u8> {
    apply_overrides(&mut config, args)?;

    info!(
        "Running against {}{}",
        config.scenario.base_url,
        if args.offline { " (offline)" } else { "" }
    );
    let summary = execute(&config, args.offline).await?;

    report::print_summary(&summary);
    if let Some(path) = &args.summary_export {
        report::write_json(&summary, path)
            .with_context(|| format!("Failed to export summary to {:?}", path))?;
    }

    Ok(if summary.passed() { 0 } else { THRESHOLDS_FAILED })
}
