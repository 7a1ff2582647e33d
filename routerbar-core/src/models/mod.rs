//! Domain models for `RouterBar`.
//!
//! ## Submodules
//!
//! - [`usage`] - Usage totals returned by the fetch client
//! - [`snapshot`] - The persisted cache record
//! - [`state`] - The in-memory runtime state handed to presentation layers

mod snapshot;
mod state;
mod usage;

pub use snapshot::{SCHEMA_VERSION, UsageSnapshot};
pub use state::{RuntimeState, StateMode};
pub use usage::Usage;

#[cfg(test)]
mod serde_tests;
