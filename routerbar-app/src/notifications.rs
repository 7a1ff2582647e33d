//! Spend and error notifications.
//!
//! The refresher reports through [`SpendNotifier`]. [`Notifier`] applies the
//! user's toggles and throttles error alerts, then hands the message to a
//! [`NotificationSink`] for delivery.

use routerbar_core::format_usd;
use routerbar_store::NotificationsConfig;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Title used for every notification.
pub const NOTIFICATION_TITLE: &str = "OpenRouter Costs";

/// Minimum gap between two error notifications.
pub const ERROR_COOLDOWN: Duration = Duration::from_secs(10 * 60);

// ============================================================================
// Interfaces
// ============================================================================

/// Hooks the refresher fires after a cycle. Fire-and-forget.
pub trait SpendNotifier: Send + Sync {
    /// A refresh observed `amount` USD of new spend.
    fn notify_update_spent(&self, amount: f64);

    /// A refresh failed with `error`.
    fn notify_error(&self, error: &str);
}

/// Delivers a rendered notification to the user.
pub trait NotificationSink: Send + Sync {
    /// Shows `body` under `title`.
    fn send(&self, title: &str, body: &str);
}

// ============================================================================
// Notifier
// ============================================================================

#[derive(Debug)]
struct NotifierState {
    config: NotificationsConfig,
    last_error_at: Option<Instant>,
}

/// Toggle-aware, throttled notifier.
pub struct Notifier {
    state: Mutex<NotifierState>,
    cooldown: Duration,
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    /// Creates a notifier delivering through `sink`.
    pub fn new(config: NotificationsConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_cooldown(config, sink, ERROR_COOLDOWN)
    }

    /// Creates a notifier with a custom error cooldown.
    pub fn with_cooldown(
        config: NotificationsConfig,
        sink: Arc<dyn NotificationSink>,
        cooldown: Duration,
    ) -> Self {
        Self {
            state: Mutex::new(NotifierState {
                config,
                last_error_at: None,
            }),
            cooldown,
            sink,
        }
    }

    /// Replaces the toggles. The error cooldown clock is kept.
    pub fn update_config(&self, config: NotificationsConfig) {
        self.lock().config = config;
        debug!(enabled = config.enabled, "Notification settings updated");
    }

    /// Sends the startup summary if enabled.
    pub fn notify_start_summary(&self, text: &str) {
        let config = self.lock().config;
        if !config.enabled || !config.on_start_summary {
            return;
        }
        self.deliver(text);
    }

    fn deliver(&self, body: &str) {
        info!(body, "Sending notification");
        self.sink.send(NOTIFICATION_TITLE, body);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NotifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SpendNotifier for Notifier {
    fn notify_update_spent(&self, amount: f64) {
        let config = self.lock().config;
        if !config.enabled || !config.on_update_spent {
            return;
        }
        self.deliver(&format!("Recently spent: {}", format_usd(amount)));
    }

    fn notify_error(&self, error: &str) {
        {
            let mut state = self.lock();
            if !state.config.enabled || !state.config.on_error {
                return;
            }
            if state
                .last_error_at
                .is_some_and(|at| at.elapsed() < self.cooldown)
            {
                debug!(error, "Error notification suppressed by cooldown");
                return;
            }
            state.last_error_at = Some(Instant::now());
        }
        self.deliver(&format!("Error: {error} (retrying on schedule)"));
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("state", &*self.lock())
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Desktop notifications through the platform's command-line helper.
///
/// Uses `osascript` on macOS and `notify-send` elsewhere. When the helper
/// cannot be launched the notification is logged instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSink;

impl NotificationSink for SystemSink {
    fn send(&self, title: &str, body: &str) {
        let mut command = platform_command(title, body);
        match command.spawn() {
            Ok(mut child) => {
                // Reap the helper so it does not linger as a zombie.
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => {
                warn!(error = %e, title, body, "Notification helper unavailable, logging instead");
            }
        }
    }
}

#[cfg(target_os = "macos")]
fn platform_command(title: &str, body: &str) -> std::process::Command {
    let script = format!(
        "display notification \"{}\" with title \"{}\"",
        escape_applescript(body),
        escape_applescript(title)
    );
    let mut command = std::process::Command::new("osascript");
    command.args(["-e", &script]);
    command
}

#[cfg(not(target_os = "macos"))]
fn platform_command(title: &str, body: &str) -> std::process::Command {
    let mut command = std::process::Command::new("notify-send");
    command.args(["--app-name=routerbar", title, body]);
    command
}

#[cfg(any(target_os = "macos", test))]
fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " ")
}

/// Keeps every notification in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the `(title, body)` pairs sent so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns just the bodies sent so far.
    pub fn bodies(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, body)| body).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn send(&self, title: &str, body: &str) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((title.to_string(), body.to_string()));
    }
}

// ============================================================================
// Tests
// ============================================================================
