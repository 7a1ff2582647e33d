// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `RouterBar` - background `OpenRouter` spend monitor.
//!
//! Polls the key-info endpoint on the configured period, keeps the last
//! result in the cache and sends desktop notifications for new spend.
//! Send SIGHUP to reload the config file.

use std::sync::Arc;

use anyhow::Result;
use routerbar_app::{Daemon, SystemSink, logging};
use routerbar_fetch::OpenRouterClient;
use routerbar_store::{
    CacheStore, ConfigStore, default_cache_path, default_config_path, default_log_path,
    load_config,
};
use tracing::{info, warn};

/// Application entry point.
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = default_config_path();
    let loaded = load_config(&config_path).await;
    let config = loaded.as_ref().ok().cloned().unwrap_or_default();

    let logging = logging::init(&config.logging, default_log_path());
    info!("RouterBar starting...");
    if let Err(e) = &loaded {
        warn!(path = %config_path.display(), error = %e, "Config load failed, using defaults");
    }

    let config = Arc::new(ConfigStore::new(config_path, config));
    let cache = Arc::new(CacheStore::new(default_cache_path()));
    let fetcher = Arc::new(OpenRouterClient::new()?);

    let daemon = Daemon::new(config, cache, fetcher, Arc::new(SystemSink)).with_logging(logging);
    daemon.run().await?;

    info!("RouterBar stopped");
    Ok(())
}
