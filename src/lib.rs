//! Precache - versioned offline cache for web app assets
//!
//! Precaches an asset manifest into a named generation, answers requests
//! cache-first with network fallback, and reaps stale generations when a
//! new one activates.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod network;
pub mod registry;
pub mod store;
pub mod ui;
pub mod worker;

pub use error::{PrecacheError, PrecacheResult};
