//! Long-running monitor wiring.
//!
//! Owns the stores, refresher, scheduler and notifier, seeds state from the
//! cache on start, and applies config changes while running.

use routerbar_core::tooltip;
use routerbar_fetch::UsageFetcher;
use routerbar_store::{CacheStore, Config, ConfigStore, StateStore};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::logging::LoggingHandle;
use crate::notifications::{NotificationSink, Notifier};
use crate::refresh::{REFRESH_TIMEOUT, Refresher};
use crate::scheduler::Scheduler;

/// The assembled monitor.
pub struct Daemon {
    config: Arc<ConfigStore>,
    state: Arc<StateStore>,
    cache: Arc<CacheStore>,
    notifier: Arc<Notifier>,
    refresher: Arc<Refresher>,
    scheduler: Scheduler,
    logging: Option<LoggingHandle>,
    applied: Mutex<Config>,
}

impl Daemon {
    /// Wires the monitor around shared stores.
    pub fn new(
        config: Arc<ConfigStore>,
        cache: Arc<CacheStore>,
        fetcher: Arc<dyn UsageFetcher>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let current = config.get();
        let state = Arc::new(StateStore::new());
        let notifier = Arc::new(Notifier::new(current.notifications, sink));
        let refresher = Arc::new(
            Refresher::new(fetcher, Arc::clone(&config), Arc::clone(&state))
                .with_cache(Arc::clone(&cache))
                .with_notifier(notifier.clone()),
        );

        let summary_state = Arc::clone(&state);
        let summary_config = Arc::clone(&config);
        refresher.set_update_callback(move || {
            let text = tooltip(&summary_state.snapshot(), summary_config.get().has_token());
            info!(summary = %text.replace('\n', "; "), "Spend summary");
        });

        let scheduler =
            Scheduler::for_refresher(current.updates.period.as_duration(), Arc::clone(&refresher));

        Self {
            config,
            state,
            cache,
            notifier,
            refresher,
            scheduler,
            logging: None,
            applied: Mutex::new(current),
        }
    }

    /// Lets config changes adjust logging.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingHandle) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Returns the state store.
    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    /// Returns the config store.
    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Returns the refresher, for manual refreshes.
    pub fn refresher(&self) -> &Arc<Refresher> {
        &self.refresher
    }

    /// Returns the scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Renders the current summary text.
    pub fn summary(&self) -> String {
        tooltip(&self.state.snapshot(), self.config.get().has_token())
    }

    /// Seeds state from the cached snapshot, if one is readable.
    pub async fn seed_from_cache(&self) {
        match self.cache.load().await {
            Ok(Some(snapshot)) => {
                info!(
                    path = %self.cache.path().display(),
                    last_success_at = %snapshot.last_success_at,
                    "Seeding state from cache"
                );
                self.state
                    .set_success(snapshot.to_usage(), snapshot.last_success_at);
            }
            Ok(None) => debug!("No cached usage yet"),
            Err(e) => warn!(error = %e, "Failed to load cache"),
        }
    }

    /// Seeds state, starts the scheduler and runs the startup refresh.
    pub async fn start(&self) {
        self.seed_from_cache().await;

        let config = self.config.get();
        if !config.has_token() {
            self.state.set_not_configured();
        }

        self.scheduler.start();

        if config.updates.update_on_start {
            if let Err(e) = self.refresher.refresh_with_timeout(REFRESH_TIMEOUT).await {
                if !e.is_not_configured() {
                    warn!(error = %e, "Startup refresh failed");
                }
            }
        }

        self.notifier.notify_start_summary(&self.summary());
    }

    /// Applies the current config to the running components.
    ///
    /// A changed period restarts the scheduler; a changed token triggers a
    /// background refresh so the new credential is checked right away.
    pub async fn apply_config(&self) {
        let config = self.config.get();
        let previous = std::mem::replace(
            &mut *self.applied.lock().unwrap_or_else(PoisonError::into_inner),
            config.clone(),
        );

        let period = config.updates.period.as_duration();
        if self.scheduler.interval() != period {
            self.scheduler.reschedule(period).await;
        }
        self.notifier.update_config(config.notifications);
        if let Some(logging) = &self.logging {
            logging.apply(&config.logging);
        }

        if previous.connection.token != config.connection.token {
            info!("Token changed, refreshing");
            let refresher = Arc::clone(&self.refresher);
            tokio::spawn(async move {
                if let Err(e) = refresher.refresh_with_timeout(REFRESH_TIMEOUT).await {
                    if !e.is_not_configured() {
                        warn!(error = %e, "Refresh after token change failed");
                    }
                }
            });
        }
        debug!(period = %config.updates.period, "Config applied");
    }

    /// Re-reads the config file. Changes reach the running components
    /// through [`Daemon::apply_config`].
    pub async fn reload_config(&self) {
        match self.config.reload().await {
            Ok(()) => info!(path = %self.config.path().display(), "Config reloaded"),
            Err(e) => warn!(error = %e, "Config reload failed, keeping current settings"),
        }
    }

    /// Stops the scheduler.
    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }

    /// Runs until interrupted.
    ///
    /// SIGHUP reloads the config file; Ctrl-C or SIGTERM stops the monitor.
    ///
    /// # Errors
    ///
    /// Returns error if the signal handlers cannot be installed.
    pub async fn run(&self) -> anyhow::Result<()> {
        let shutdown = shutdown_signal()?;
        tokio::pin!(shutdown);
        let mut hangup = Hangup::new()?;
        let mut config_rx = self.config.subscribe();

        self.start().await;
        info!("Monitor running");

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                () = hangup.recv() => self.reload_config().await,
                changed = config_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.apply_config().await;
                }
            }
        }

        info!("Shutting down");
        self.stop().await;
        Ok(())
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("config_path", &self.config.path())
            .field("cache_path", &self.cache.path())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Signals
// ============================================================================

/// SIGHUP listener. Never fires off unix.
struct Hangup {
    #[cfg(unix)]
    signal: tokio::signal::unix::Signal,
}

impl Hangup {
    #[cfg(unix)]
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self {
            signal: signal(SignalKind::hangup())?,
        })
    }

    #[cfg(not(unix))]
    fn new() -> std::io::Result<Self> {
        Ok(Self {})
    }

    async fn recv(&mut self) {
        #[cfg(unix)]
        if self.signal.recv().await.is_some() {
            return;
        }
        std::future::pending::<()>().await;
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl std::future::Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl std::future::Future<Output = ()>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
    })
}
