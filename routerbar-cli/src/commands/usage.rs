//! Usage command - refresh once and print the summary.

use std::sync::Arc;

use anyhow::Result;
use routerbar_app::{REFRESH_TIMEOUT, RefreshError, Refresher};
use routerbar_fetch::OpenRouterClient;
use routerbar_store::{CacheStore, ConfigStore, StateStore};
use tracing::{debug, info};

use super::{print_summary, seed_from_cache};
use crate::{Cli, ExitCode};

/// Runs the usage command.
///
/// The refresh persists the new snapshot to the shared cache, so the
/// background monitor measures its next delta from this point.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = Arc::new(ConfigStore::load(cli.config_path()).await);
    let cache = Arc::new(CacheStore::new(cli.cache_path()));
    let state = Arc::new(StateStore::new());
    seed_from_cache(&cache, &state).await;

    let fetcher = Arc::new(OpenRouterClient::new()?);
    let refresher = Refresher::new(fetcher, Arc::clone(&config), Arc::clone(&state)).with_cache(cache);

    info!("Fetching usage");
    let result = refresher.refresh_with_timeout(REFRESH_TIMEOUT).await;
    debug!(ok = result.is_ok(), "Refresh finished");

    print_summary(&state.snapshot(), config.get().has_token(), cli)?;
    Ok(exit_code(result.as_ref().err()))
}

fn exit_code(err: Option<&RefreshError>) -> ExitCode {
    match err {
        None => ExitCode::Success,
        Some(e) if e.is_not_configured() => ExitCode::NotConfigured,
        Some(e) if e.is_auth() => ExitCode::Unauthorized,
        Some(RefreshError::Cancelled) => ExitCode::Timeout,
        Some(_) => ExitCode::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routerbar_fetch::FetchError;

    #[test]
    fn test_exit_codes() {
        assert!(matches!(exit_code(None), ExitCode::Success));
        assert!(matches!(
            exit_code(Some(&RefreshError::NotConfigured)),
            ExitCode::NotConfigured
        ));
        assert!(matches!(
            exit_code(Some(&RefreshError::Fetch(FetchError::Unauthorized))),
            ExitCode::Unauthorized
        ));
        assert!(matches!(exit_code(Some(&RefreshError::Cancelled)), ExitCode::Timeout));
    }
}
