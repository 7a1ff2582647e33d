//! Periodic refresh scheduling.
//!
//! A single background task fires the refresh callback every interval. The
//! first tick comes one full interval after [`Scheduler::start`]; startup
//! refreshes are the caller's business.

use futures::future::BoxFuture;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::refresh::{REFRESH_TIMEOUT, Refresher};

/// How long a tick may keep running after its deadline cancelled it.
const CANCEL_GRACE: Duration = Duration::from_secs(1);

type TickFn = Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    interval: Duration,
    running: Option<Running>,
}

/// Runs a refresh callback on a fixed interval.
///
/// States are Stopped and Running. `start` on a running scheduler and `stop`
/// on a stopped one are no-ops.
pub struct Scheduler {
    inner: Mutex<Inner>,
    tick: TickFn,
    tick_timeout: Duration,
}

impl Scheduler {
    /// Creates a stopped scheduler that calls `f` every `interval`.
    ///
    /// Each call receives a token that is cancelled when the tick exceeds its
    /// deadline or the scheduler stops. Errors are logged, never raised.
    pub fn new<F, Fut, E>(interval: Duration, f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display,
    {
        let tick: TickFn = Arc::new(move |cancel| {
            let fut = f(cancel);
            Box::pin(async move { fut.await.map_err(|e| e.to_string()) })
        });
        Self {
            inner: Mutex::new(Inner {
                interval,
                running: None,
            }),
            tick,
            tick_timeout: REFRESH_TIMEOUT,
        }
    }

    /// Creates a scheduler driving `refresher`.
    ///
    /// A missing credential is a normal outcome and is not logged as a failure.
    pub fn for_refresher(interval: Duration, refresher: Arc<Refresher>) -> Self {
        Self::new(interval, move |cancel| {
            let refresher = Arc::clone(&refresher);
            async move {
                match refresher.refresh(cancel).await {
                    Err(e) if !e.is_not_configured() => Err(e),
                    _ => Ok(()),
                }
            }
        })
    }

    /// Overrides the per-tick deadline.
    #[must_use]
    pub fn with_tick_timeout(mut self, timeout: Duration) -> Self {
        self.tick_timeout = timeout;
        self
    }

    /// Starts the background task. Must be called inside a Tokio runtime.
    pub fn start(&self) {
        let mut inner = self.lock();
        if inner.running.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let interval = inner.interval;
        let handle = tokio::spawn(run_loop(
            interval,
            self.tick_timeout,
            Arc::clone(&self.tick),
            cancel.clone(),
        ));
        inner.running = Some(Running { cancel, handle });
        info!(interval_secs = interval.as_secs_f64(), "Scheduler started");
    }

    /// Stops the background task and waits for it to exit.
    ///
    /// No tick starts after this returns. A tick in flight is cancelled
    /// through its token and awaited.
    pub async fn stop(&self) {
        let running = self.lock().running.take();
        let Some(running) = running else {
            return;
        };

        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            warn!(error = %e, "Scheduler task ended abnormally");
        }
        info!("Scheduler stopped");
    }

    /// Changes the interval. A zero interval is ignored.
    ///
    /// A running scheduler is restarted so the new interval applies at once.
    pub async fn reschedule(&self, interval: Duration) {
        if interval.is_zero() {
            return;
        }
        let was_running = {
            let mut inner = self.lock();
            inner.interval = interval;
            inner.running.is_some()
        };
        if was_running {
            self.stop().await;
            self.start();
        }
        info!(interval_secs = interval.as_secs_f64(), "Scheduler rescheduled");
    }

    /// Returns the current interval.
    pub fn interval(&self) -> Duration {
        self.lock().interval
    }

    /// Returns true while the background task is active.
    pub fn is_running(&self) -> bool {
        self.lock().running.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("interval", &self.interval())
            .field("running", &self.is_running())
            .field("tick_timeout", &self.tick_timeout)
            .finish()
    }
}

async fn run_loop(period: Duration, tick_timeout: Duration, tick: TickFn, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        run_tick(&tick, tick_timeout, &cancel).await;
    }
    debug!("Scheduler loop exited");
}

async fn run_tick(tick: &TickFn, deadline: Duration, cancel: &CancellationToken) {
    let token = cancel.child_token();
    let fut = tick(token.clone());
    tokio::pin!(fut);

    let outcome = tokio::select! {
        result = &mut fut => Some(result),
        () = tokio::time::sleep(deadline) => {
            warn!(timeout_secs = deadline.as_secs_f64(), "Scheduled refresh exceeded its deadline");
            None
        }
        () = token.cancelled() => None,
    };

    let outcome = match outcome {
        Some(result) => Some(result),
        None => {
            token.cancel();
            tokio::time::timeout(CANCEL_GRACE, &mut fut).await.ok()
        }
    };

    match outcome {
        Some(Ok(())) => debug!("Scheduled refresh finished"),
        Some(Err(e)) => warn!(error = %e, "Scheduled refresh failed"),
        None => warn!("Scheduled refresh abandoned after cancellation"),
    }
}
