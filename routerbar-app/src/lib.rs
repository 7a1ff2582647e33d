// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RouterBar` App
//!
//! The background side of the `RouterBar` spend monitor.
//!
//! - [`Refresher`] - One fetch, diff, persist and notify cycle
//! - [`Scheduler`] - Runs the refresher on the configured period
//! - [`Notifier`] - Spend and error alerts with an error cooldown
//! - [`Daemon`] - Wires everything together and reacts to config changes
//! - [`logging`] - Tracing setup with a runtime-adjustable level
//!
//! ## Example
//!
//! ```ignore
//! use routerbar_app::{Daemon, SystemSink};
//! use routerbar_fetch::OpenRouterClient;
//! use routerbar_store::{CacheStore, ConfigStore};
//!
//! let config = Arc::new(ConfigStore::load_default().await);
//! let cache = Arc::new(CacheStore::at_default_path());
//! let fetcher = Arc::new(OpenRouterClient::new()?);
//!
//! let daemon = Daemon::new(config, cache, fetcher, Arc::new(SystemSink));
//! daemon.run().await?;
//! ```

pub mod daemon;
pub mod error;
pub mod logging;
pub mod notifications;
pub mod refresh;
pub mod scheduler;

pub use daemon::Daemon;
pub use error::RefreshError;
pub use logging::LoggingHandle;
pub use notifications::{
    ERROR_COOLDOWN, NOTIFICATION_TITLE, NotificationSink, Notifier, RecordingSink, SpendNotifier,
    SystemSink,
};
pub use refresh::{REFRESH_TIMEOUT, Refresher, UpdateCallback, compute_delta};
pub use scheduler::Scheduler;

#[cfg(test)]
mod refresh_tests;
#[cfg(test)]
mod test_support;
