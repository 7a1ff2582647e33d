//! Config command - manage configuration.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use routerbar_store::{Config, ConfigStore, LogLevel, Period, default_log_path, load_config};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::output::{ConfigOutput, JsonFormatter, PathsOutput, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Keys accepted by `config set`.
const SETTABLE_KEYS: &[&str] = &[
    "updates.period",
    "updates.update_on_start",
    "notifications.enabled",
    "notifications.on_update_spent",
    "notifications.on_error",
    "notifications.on_start_summary",
    "logging.level",
    "logging.to_file",
];

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration (token redacted).
    Show,

    /// Show config, cache and log file paths.
    Path,

    /// Store the API token. Reads one line from stdin when omitted.
    SetToken {
        /// Token value. Prefer stdin to keep it out of shell history.
        token: Option<String>,
    },

    /// Remove the stored API token.
    ClearToken,

    /// Set the polling period.
    SetPeriod {
        /// One of 5m, 15m, 30m, 1h, 3h, 6h, 12h.
        period: Period,
    },

    /// Set any other option, e.g. `notifications.enabled true`.
    Set {
        /// Dotted option name.
        key: String,
        /// New value.
        value: String,
    },
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<ExitCode> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await?,
        ConfigAction::Path => show_paths(cli)?,
        ConfigAction::SetToken { token } => {
            let token = match token {
                Some(token) => token.clone(),
                None => read_token_from_stdin().await?,
            };
            let token = token.trim().to_string();
            if token.is_empty() {
                bail!("token is empty; use `routerbar config clear-token` to remove it");
            }
            modify(&cli.config_path(), |config| config.connection.token = token).await?;
            report(cli, "Token saved");
        }
        ConfigAction::ClearToken => {
            modify(&cli.config_path(), |config| config.connection.token.clear()).await?;
            report(cli, "Token cleared");
        }
        ConfigAction::SetPeriod { period } => {
            let period = *period;
            modify(&cli.config_path(), |config| config.updates.period = period).await?;
            report(cli, &format!("Period set to {period}"));
        }
        ConfigAction::Set { key, value } => {
            let mut config = load_strict(&cli.config_path()).await?;
            apply_setting(&mut config, key, value)?;
            let store = ConfigStore::new(cli.config_path(), config);
            store.save().await?;
            report(cli, &format!("{key} = {}", value.trim()));
        }
    }
    Ok(ExitCode::Success)
}

async fn show_config(cli: &Cli) -> Result<()> {
    let path = cli.config_path();
    let store = ConfigStore::load(&path).await;
    let config = store.get();

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_config(&config, &path));
        }
        OutputFormat::Json => {
            let output = ConfigOutput::new(&config, &path);
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }
    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config = cli.config_path();
    let cache = cli.cache_path();
    let log = default_log_path();

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_paths(&config, &cache, &log));
        }
        OutputFormat::Json => {
            let output = PathsOutput {
                config: config.display().to_string(),
                cache: cache.display().to_string(),
                log: log.display().to_string(),
            };
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }
    Ok(())
}

/// Loads the config, refusing to continue on a malformed file so a write
/// never replaces settings the user can still repair.
async fn load_strict(path: &Path) -> Result<Config> {
    load_config(path)
        .await
        .with_context(|| format!("cannot read {}; fix or remove it first", path.display()))
}

/// Applies `f` to the stored config and writes it back atomically.
async fn modify<F>(path: &Path, f: F) -> Result<Config>
where
    F: FnOnce(&mut Config),
{
    let store = ConfigStore::new(path, load_strict(path).await?);
    store.update(f);
    store.save().await?;
    info!(path = %path.display(), "Config updated");
    Ok(store.get())
}

/// Sets one dotted option on `config`.
fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let value = value.trim();
    match key {
        "updates.period" => config.updates.period = value.parse::<Period>().map_err(anyhow::Error::msg)?,
        "updates.update_on_start" => config.updates.update_on_start = parse_bool(value)?,
        "notifications.enabled" => config.notifications.enabled = parse_bool(value)?,
        "notifications.on_update_spent" => config.notifications.on_update_spent = parse_bool(value)?,
        "notifications.on_error" => config.notifications.on_error = parse_bool(value)?,
        "notifications.on_start_summary" => config.notifications.on_start_summary = parse_bool(value)?,
        "logging.level" => config.logging.level = value.parse::<LogLevel>().map_err(anyhow::Error::msg)?,
        "logging.to_file" => config.logging.to_file = parse_bool(value)?,
        "connection.token" => bail!("use `routerbar config set-token` to change the token"),
        other => bail!("unknown option {other:?} (expected one of: {})", SETTABLE_KEYS.join(", ")),
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => bail!("expected true or false, got {other:?}"),
    }
}

async fn read_token_from_stdin() -> Result<String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let line = lines.next_line().await.context("failed to read token from stdin")?;
    Ok(line.unwrap_or_default())
}

fn report(cli: &Cli, message: &str) {
    if !cli.quiet && cli.format == OutputFormat::Text {
        println!("{message}");
    }
}
