//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the load test against the shop
    Run(RunArgs),

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    /// Base URL of the shop, overrides the configuration
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Write the end-of-run summary as JSON
    #[arg(long, value_name = "PATH")]
    pub summary_export: Option<PathBuf>,

    /// Skip threshold evaluation, the run always passes
    #[arg(long)]
    pub no_thresholds: bool,

    /// Serve every call from built-in mocks instead of the network
    #[arg(long)]
    pub offline: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output file path
        #[arg(long, value_name = "PATH")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration in use
    Show {
        /// Path to configuration file (optional, uses default loading logic)
        #[arg(long, value_name = "PATH")]
        config_file: Option<PathBuf>,

        /// Output format: yaml, json
        #[arg(long, value_name = "FORMAT", default_value = "yaml")]
        format: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "merchload",
            "--log-level",
            "debug",
            "run",
            "--base-url",
            "http://127.0.0.1:9000",
            "--summary-export",
            "out.json",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.base_url.as_deref(), Some("http://127.0.0.1:9000"));
                assert_eq!(args.summary_export, Some(PathBuf::from("out.json")));
                assert!(!args.no_thresholds);
                assert!(!args.offline);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["merchload", "run", "--config", "shop.yaml", "--no-thresholds"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("shop.yaml")));
        assert!(matches!(cli.command, Some(Commands::Run(RunArgs { no_thresholds: true, .. }))));
    }

    #[test]
    fn test_parse_config_commands() {
        let cli = Cli::try_parse_from(["merchload", "config", "show", "--format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                config_cmd: ConfigCommands::Show { ref format, config_file: None }
            }) if format == "json"
        ));

        assert!(Cli::try_parse_from(["merchload", "config", "generate"]).is_err());
    }
}
