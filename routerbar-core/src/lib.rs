// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RouterBar` Core
//!
//! Core types and models for the `RouterBar` spend monitor.
//!
//! This crate provides the foundational pieces shared by every other
//! `RouterBar` crate:
//!
//! - Domain models (fetched usage, the persisted cache record, runtime state)
//! - Credential hashing
//! - Currency and time formatting
//! - The plain-text summary shown by presentation layers
//!
//! ## Key Types
//!
//! - [`Usage`] - Usage totals as reported by the upstream endpoint
//! - [`UsageSnapshot`] - The single persisted record of the last successful fetch
//! - [`RuntimeState`] - Point-in-time copy of the in-memory refresh state
//! - [`StateMode`] - Which of not-configured / error / normal is current

pub mod error;
pub mod format;
pub mod hash;
pub mod models;
pub mod summary;

pub use error::CoreError;
pub use format::{format_time, format_usd};
pub use hash::token_hash;
pub use models::{RuntimeState, SCHEMA_VERSION, StateMode, Usage, UsageSnapshot};
pub use summary::{activity_url, tooltip};
