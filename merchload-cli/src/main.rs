//! merchload command-line entry point

mod cli;
mod commands;
mod logging;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, ConfigCommands};
use std::process::ExitCode;
use tracing::info;

async fn run_cli(cli: Cli) -> Result<u8> {
    let config = commands::load_config(cli.config.as_deref())?;
    logging::init_tracing(&config.logging, cli.log_level.as_deref())?;
    commands::announce_config(cli.config.as_deref(), &config);

    match cli.command {
        Some(Commands::Run(args)) => {
            info!("merchload {} starting", env!("CARGO_PKG_VERSION"));
            commands::run::handle_run(config, &args).await
        }
        Some(Commands::Config { config_cmd }) => {
            match config_cmd {
                ConfigCommands::Validate { config_file } => {
                    commands::config::handle_config_validate(&config_file)?
                }
                ConfigCommands::Generate { output, force } => {
                    commands::config::handle_config_generate(&output, force)?
                }
                ConfigCommands::Show {
                    config_file,
                    format,
                } => commands::config::handle_config_show(
                    config_file.as_deref().or(cli.config.as_deref()),
                    &format,
                )?,
            }
            Ok(0)
        }
        None => {
            // If no subcommand is provided, print help
            Cli::command().print_help()?;
            println!();
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run_cli(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
