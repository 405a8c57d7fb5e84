//! `merchload config`

use super::load_config;
use anyhow::{anyhow, Context, Result};
use merchload_config::MerchloadConfig;
use merchload_metrics::ThresholdSet;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Handle configuration validation
pub fn handle_config_validate(config_file: &Path) -> Result<()> {
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow!("Configuration file not found: {:?}", config_file));
    }

    let checked = load_config(Some(config_file)).and_then(|config| {
        ThresholdSet::from_config(&config.thresholds).context("Invalid threshold expression")?;
        Ok(config)
    });

    match checked {
        Ok(_config) => {
            println!("✅ Configuration file is valid");
            info!("Configuration validation passed");
            Ok(())
        }
        Err(e) => {
            println!("❌ Configuration validation failed: {:#}", e);
            error!("Configuration validation failed: {:#}", e);
            Err(e)
        }
    }
}

/// Handle configuration generation
pub fn handle_config_generate(output: &Path, force: bool) -> Result<()> {
    info!("Generating configuration at: {:?}", output);

    if output.exists() && !force {
        return Err(anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    fs::write(output, MerchloadConfig::generate_sample())
        .context("Failed to write configuration file")?;

    println!("✅ Configuration generated at: {:?}", output);
    println!(
        "🔧 Validate with: merchload config validate --config-file {:?}",
        output
    );
    Ok(())
}

/// Render the configuration in the requested format
pub fn render_config(config: &MerchloadConfig, format: &str) -> Result<String> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::to_string(config).context("Failed to serialize to YAML"),
        "json" => serde_json::to_string_pretty(config).context("Failed to serialize to JSON"),
        _ => Err(anyhow!(
            "Unknown output format: {}. Valid formats: yaml, json",
            format
        )),
    }
}

/// Handle configuration display
pub fn handle_config_show(config_file: Option<&Path>, format: &str) -> Result<()> {
    info!("Showing configuration (format: {})", format);
    let config = load_config(config_file)?;
    println!("{}", render_config(&config, format)?);
    Ok(())
}
