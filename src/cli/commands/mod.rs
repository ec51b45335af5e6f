//! CLI command implementations

pub mod activate;
pub mod config;
pub mod fetch;
pub mod install;
pub mod list;

pub use activate::execute as activate;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use install::execute as install;
pub use list::execute as list;

use crate::config::Config;
use crate::error::PrecacheResult;
use crate::network::HttpFetcher;
use crate::store::CacheStore;
use crate::worker::Worker;
use std::sync::Arc;

/// Build the worker for the configured generation, talking to the real network
fn build_worker(config: &Config, store: Arc<dyn CacheStore>) -> PrecacheResult<Worker> {
    let origin = config.origin()?;
    let fetcher = Arc::new(HttpFetcher::new(&origin, &config.network));
    Worker::from_config(config, store, fetcher)
}
