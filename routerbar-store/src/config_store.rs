//! User configuration store.
//!
//! Manages user settings with persistence and change notification. The
//! refresher and scheduler read the config on every cycle, so a change made
//! through [`ConfigStore::set`] takes effect on the next tick.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{default_config_path, load_json_optional, save_json};

// ============================================================================
// Config Types
// ============================================================================

/// User configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API connection.
    pub connection: ConnectionConfig,
    /// Polling behaviour.
    pub updates: UpdatesConfig,
    /// Desktop notification toggles.
    pub notifications: NotificationsConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

impl Config {
    /// Returns true if a credential is configured.
    pub fn has_token(&self) -> bool {
        !self.connection.token.trim().is_empty()
    }
}

/// API connection settings.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// `OpenRouter` API key. Empty means not configured.
    pub token: String,
}

impl ConnectionConfig {
    /// Returns the token with all but its last four characters masked.
    pub fn redacted_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.is_empty() {
            return String::new();
        }
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{tail}", "*".repeat(chars.len() - 4))
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("token", &self.redacted_token())
            .finish()
    }
}

/// Polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatesConfig {
    /// Poll period.
    #[serde(deserialize_with = "lenient")]
    pub period: Period,
    /// Run one refresh as soon as the monitor starts.
    pub update_on_start: bool,
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            period: Period::default(),
            update_on_start: true,
        }
    }
}

/// Notification toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct NotificationsConfig {
    /// Master switch.
    pub enabled: bool,
    /// Notify when a refresh observes new spend.
    pub on_update_spent: bool,
    /// Notify when a refresh fails (throttled).
    pub on_error: bool,
    /// Notify with a summary after the startup refresh.
    pub on_start_summary: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            on_update_spent: true,
            on_error: true,
            on_start_summary: false,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level.
    #[serde(deserialize_with = "lenient")]
    pub level: LogLevel,
    /// Also append to the log file in the config directory.
    pub to_file: bool,
}

/// Poll period options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Period {
    /// Every five minutes.
    FiveMinutes,
    /// Every fifteen minutes.
    FifteenMinutes,
    /// Every thirty minutes.
    #[default]
    ThirtyMinutes,
    /// Every hour.
    OneHour,
    /// Every three hours.
    ThreeHours,
    /// Every six hours.
    SixHours,
    /// Every twelve hours.
    TwelveHours,
}

impl Period {
    /// Returns the period length.
    pub fn as_duration(&self) -> Duration {
        let minutes = match self {
            Period::FiveMinutes => 5,
            Period::FifteenMinutes => 15,
            Period::ThirtyMinutes => 30,
            Period::OneHour => 60,
            Period::ThreeHours => 180,
            Period::SixHours => 360,
            Period::TwelveHours => 720,
        };
        Duration::from_secs(minutes * 60)
    }

    /// Returns the config-file spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::FiveMinutes => "5m",
            Period::FifteenMinutes => "15m",
            Period::ThirtyMinutes => "30m",
            Period::OneHour => "1h",
            Period::ThreeHours => "3h",
            Period::SixHours => "6h",
            Period::TwelveHours => "12h",
        }
    }

    /// All available periods, shortest first.
    pub fn all() -> &'static [Period] {
        &[
            Period::FiveMinutes,
            Period::FifteenMinutes,
            Period::ThirtyMinutes,
            Period::OneHour,
            Period::ThreeHours,
            Period::SixHours,
            Period::TwelveHours,
        ]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Period::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown period {s:?} (expected one of 5m,15m,30m,1h,3h,6h,12h)"))
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    Warn,
    /// Info level logging.
    #[default]
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl LogLevel {
    /// Returns the lowercase spelling used in config and filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level {other:?}")),
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Decodes a string-typed enum, falling back to its default for unknown or
/// mistyped values instead of rejecting the whole file.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

// ============================================================================
// Config Store
// ============================================================================

/// Persistent config store with change notifications.
///
/// Reads hand out copies under a shared lock; writers replace the value
/// under the exclusive lock.
#[derive(Debug)]
pub struct ConfigStore {
    config: RwLock<Config>,
    path: PathBuf,
    notify: watch::Sender<u64>,
}

impl ConfigStore {
    /// Creates a store holding `config`, persisted to `path`.
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            config: RwLock::new(config),
            path: path.into(),
            notify,
        }
    }

    /// Loads the config from the default path.
    pub async fn load_default() -> Self {
        Self::load(default_config_path()).await
    }

    /// Loads the config from `path`.
    ///
    /// A missing file yields defaults. A malformed file also yields
    /// defaults; the failure is logged.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = match load_config(&path).await {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        Self::new(path, config)
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current config.
    pub fn get(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the config and notifies subscribers.
    pub fn set(&self, config: Config) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        self.notify_change();
    }

    /// Updates the config in place and notifies subscribers.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Config),
    {
        {
            let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut config);
        }
        self.notify_change();
    }

    /// Re-reads the backing file and replaces the current value.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or decoded; the
    /// current value is kept in that case.
    pub async fn reload(&self) -> Result<(), StoreError> {
        let config = load_config(&self.path).await?;
        self.set(config);
        Ok(())
    }

    /// Saves the current config to disk.
    ///
    /// # Errors
    ///
    /// Returns error if the config cannot be written.
    pub async fn save(&self) -> Result<(), StoreError> {
        let config = self.get();
        save_json(&self.path, &config).await?;
        info!(path = %self.path.display(), "Config saved");
        Ok(())
    }

    /// Subscribes to config changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn notify_change(&self) {
        self.notify.send_modify(|version| *version += 1);
    }
}

/// Loads a config file.
///
/// A missing file yields defaults; unknown periods and log levels are
/// normalized to their defaults.
///
/// # Errors
///
/// Returns error if the file exists but cannot be read or decoded.
pub async fn load_config(path: &Path) -> Result<Config, StoreError> {
    match load_json_optional::<Config>(path).await? {
        Some(config) => {
            info!(path = %path.display(), "Config loaded");
            Ok(config)
        }
        None => {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Ok(Config::default())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
