//! Check command - validate a credential without saving anything.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use routerbar_app::{REFRESH_TIMEOUT, RefreshError, Refresher};
use routerbar_fetch::OpenRouterClient;
use routerbar_store::{ConfigStore, StateStore};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::output::{CheckOutput, JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Credential to test instead of the configured one.
    #[arg(long)]
    pub token: Option<String>,
}

/// Runs the check command.
///
/// Neither the cache nor the config file is touched, whatever the outcome.
pub async fn run(args: &CheckArgs, cli: &Cli) -> Result<ExitCode> {
    let config = Arc::new(ConfigStore::load(cli.config_path()).await);
    let token = match args.token.as_deref() {
        Some(token) => token.trim().to_string(),
        None => config.get().connection.token.trim().to_string(),
    };
    if token.is_empty() {
        anyhow::bail!("no token configured; pass --token or run `routerbar config set-token`");
    }

    let fetcher = Arc::new(OpenRouterClient::new()?);
    let refresher = Refresher::new(fetcher, config, Arc::new(StateStore::new()));

    info!("Testing token");
    let cancel = CancellationToken::new();
    let deadline = cancel.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(REFRESH_TIMEOUT).await;
        deadline.cancel();
    });
    let result = refresher.test_token(cancel, &token).await;
    timer.abort();

    let code = match &result {
        Ok(_) => ExitCode::Success,
        Err(e) if e.is_auth() => ExitCode::Unauthorized,
        Err(RefreshError::Cancelled) => ExitCode::Timeout,
        Err(_) => ExitCode::Error,
    };

    let result = result.map_err(|e| e.to_string());
    match cli.format {
        OutputFormat::Json => {
            let output = CheckOutput::from_result(&result);
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_check(&result));
        }
    }
    Ok(code)
}
