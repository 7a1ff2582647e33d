// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RouterBar` Store
//!
//! Durable and in-memory state for the `RouterBar` spend monitor.
//!
//! This crate provides:
//!
//! - **CacheStore**: the single persisted usage record, atomically replaced
//! - **ConfigStore**: user settings with persistence and change notification
//! - **StateStore**: the latest refresh outcome, read by presentation layers
//! - **Persistence**: atomic JSON file I/O with owner-only permissions
//!
//! ## Usage
//!
//! ```ignore
//! use routerbar_store::{CacheStore, ConfigStore, StateStore};
//!
//! let config = ConfigStore::load_default().await;
//! let cache = CacheStore::at_default_path();
//! let state = StateStore::new();
//!
//! if let Some(snapshot) = cache.load().await? {
//!     state.set_success(snapshot.to_usage(), snapshot.last_success_at);
//! }
//!
//! // Subscribe to changes
//! let mut rx = state.subscribe();
//! while rx.changed().await.is_ok() {
//!     println!("{:?}", state.snapshot().mode());
//! }
//! ```

pub mod cache;
pub mod config_store;
pub mod error;
pub mod persistence;
pub mod state_store;

pub use cache::CacheStore;
pub use config_store::{
    Config, ConfigStore, ConnectionConfig, LogLevel, LoggingConfig, NotificationsConfig, Period,
    UpdatesConfig, load_config,
};
pub use error::StoreError;
pub use persistence::{
    default_cache_dir, default_cache_path, default_config_dir, default_config_path,
    default_log_path, load_json, load_json_optional, save_json,
};
pub use state_store::StateStore;
