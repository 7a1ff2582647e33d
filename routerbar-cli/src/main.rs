// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `RouterBar` CLI - `OpenRouter` spend from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Refresh once and print the summary
//! routerbar
//!
//! # Print the cached summary without touching the network
//! routerbar status
//!
//! # Validate a credential without saving it
//! routerbar check --token sk-or-...
//!
//! # JSON output
//! routerbar --format json --pretty
//!
//! # Store the credential (read from stdin when omitted)
//! routerbar config set-token
//!
//! # Poll every hour
//! routerbar config set-period 1h
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use routerbar_store::{default_cache_path, default_config_path};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{check, config, status, usage};

// ============================================================================
// CLI Definition
// ============================================================================

/// `RouterBar` CLI - `OpenRouter` spend monitoring.
#[derive(Parser)]
#[command(name = "routerbar")]
#[command(about = "OpenRouter spend monitoring CLI")]
#[command(long_about = r"
RouterBar tracks how much an OpenRouter API key has spent.

The CLI shares its config file and usage cache with the background
monitor, so a refresh here also moves the baseline used for
spend notifications.

Examples:
  routerbar                         # Refresh once and print the summary
  routerbar status                  # Cached summary, no network
  routerbar check                   # Validate the configured credential
  routerbar config show             # Current configuration
  routerbar config set-period 1h    # Change the polling period
")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'usage' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Config file to use instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Usage cache file to use instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Config file path after flag and environment overrides.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }

    /// Cache file path after flag and environment overrides.
    pub fn cache_path(&self) -> PathBuf {
        self.cache.clone().unwrap_or_else(default_cache_path)
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Refresh once and print the summary (default if no command specified).
    #[command(visible_alias = "u")]
    Usage,

    /// Print the cached summary without a network call.
    #[command(visible_alias = "s")]
    Status,

    /// Validate a credential against the API without saving anything.
    Check(check::CheckArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No credential configured.
    NotConfigured = 2,
    /// Credential rejected by the API.
    Unauthorized = 3,
    /// Refresh exceeded its deadline.
    Timeout = 4,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("routerbar=debug,routerbar_app=debug,routerbar_store=debug,routerbar_fetch=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Commands::Usage) | None => usage::run(&cli).await,
        Some(Commands::Status) => status::run(&cli).await,
        Some(Commands::Check(args)) => check::run(args, &cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_usage() {
        let cli = Cli::parse_from(["routerbar"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_path_flags_override_defaults() {
        let cli = Cli::parse_from([
            "routerbar",
            "status",
            "--config",
            "/tmp/rb/config.json",
            "--cache",
            "/tmp/rb/cache.json",
        ]);
        assert_eq!(cli.config_path(), PathBuf::from("/tmp/rb/config.json"));
        assert_eq!(cli.cache_path(), PathBuf::from("/tmp/rb/cache.json"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["routerbar", "check", "--format", "json", "--pretty"]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.pretty);
        assert!(matches!(cli.command, Some(Commands::Check(_))));
    }
}
