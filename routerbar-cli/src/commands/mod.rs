//! CLI command implementations.

pub mod check;
pub mod config;
pub mod status;
pub mod usage;

use routerbar_core::RuntimeState;
use routerbar_store::{CacheStore, StateStore};
use tracing::{debug, warn};

use crate::output::{JsonFormatter, SummaryOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Seeds `state` from the cached snapshot, if one is readable.
async fn seed_from_cache(cache: &CacheStore, state: &StateStore) {
    match cache.load().await {
        Ok(Some(snapshot)) => state.set_success(snapshot.to_usage(), snapshot.last_success_at),
        Ok(None) => debug!(path = %cache.path().display(), "No cached usage yet"),
        Err(e) => warn!(path = %cache.path().display(), error = %e, "Ignoring unreadable cache"),
    }
}

/// Prints the summary for `state` in the selected format.
fn print_summary(state: &RuntimeState, token_configured: bool, cli: &Cli) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let output = SummaryOutput::from_state(state, token_configured);
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_summary(state, token_configured));
        }
    }
    Ok(())
}
