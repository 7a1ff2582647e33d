//! Status command - print the cached summary without a network call.

use anyhow::Result;
use routerbar_store::{CacheStore, Config, StateStore, load_config};
use tracing::warn;

use super::{print_summary, seed_from_cache};
use crate::{Cli, ExitCode};

/// Runs the status command.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let config_path = cli.config_path();
    let config = match load_config(&config_path).await {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "Config load failed, using defaults");
            Config::default()
        }
    };

    let state = StateStore::new();
    seed_from_cache(&CacheStore::new(cli.cache_path()), &state).await;
    if !config.has_token() {
        state.set_not_configured();
    }

    print_summary(&state.snapshot(), config.has_token(), cli)?;
    Ok(if config.has_token() {
        ExitCode::Success
    } else {
        ExitCode::NotConfigured
    })
}
