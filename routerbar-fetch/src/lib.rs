// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RouterBar` Fetch
//!
//! The usage fetch capability consumed by the refresher.
//!
//! - [`fetcher::UsageFetcher`] - Trait the refresher calls once per cycle
//! - [`client::OpenRouterClient`] - HTTP implementation against `/auth/key`
//! - [`parser`] - Tolerant decoder for the key-info response
//!
//! ## Example
//!
//! ```ignore
//! use routerbar_fetch::{OpenRouterClient, UsageFetcher};
//!
//! let client = OpenRouterClient::new()?;
//! let usage = client.fetch_usage("sk-or-...").await?;
//! println!("total: {}", usage.total);
//! ```

pub mod client;
pub mod error;
pub mod fetcher;
pub mod parser;

pub use client::{DEFAULT_BASE_URL, OpenRouterClient};
pub use error::FetchError;
pub use fetcher::UsageFetcher;
pub use parser::parse_usage;
