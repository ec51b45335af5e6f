//! Generation reaper
//!
//! Runs once on activation and deletes every generation except the current
//! one. Never fails: a deletion that errors is logged and left for the
//! next activation.

use crate::error::PrecacheError;
use crate::registry::VersionRegistry;
use crate::store::CacheStore;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a reap pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Generations that were deleted
    pub deleted: Vec<String>,
    /// Generations that could not be deleted, with the reason
    pub failed: Vec<(String, String)>,
}

impl ReapReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Reaper {
    registry: VersionRegistry,
    store: Arc<dyn CacheStore>,
}

impl Reaper {
    pub fn new(registry: VersionRegistry, store: Arc<dyn CacheStore>) -> Self {
        Self { registry, store }
    }

    /// Delete every generation outside the whitelist
    pub async fn reap(&self) -> ReapReport {
        let whitelist = self.registry.whitelist();

        let names = match self.store.keys().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Cannot enumerate generations, skipping reap: {}", e);
                return ReapReport::default();
            }
        };

        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| !whitelist.iter().any(|keep| keep.as_str() == name))
            .collect();

        if stale.is_empty() {
            debug!("No stale generations to reap");
            return ReapReport::default();
        }

        let deletions = stale.iter().map(|name| async move {
            let result = self.store.delete(name).await;
            (name, result)
        });

        let mut report = ReapReport::default();
        for (name, result) in join_all(deletions).await {
            match result {
                Ok(true) => {
                    debug!("Reaped generation {}", name);
                    report.deleted.push(name.clone());
                }
                Ok(false) => debug!("Generation {} was already gone", name),
                Err(e) => {
                    let err = PrecacheError::ReaperDeletion {
                        generation: name.clone(),
                        reason: e.to_string(),
                    };
                    warn!("{}", err);
                    report.failed.push((name.clone(), e.to_string()));
                }
            }
        }

        info!(
            "Reaped {} stale generation(s), {} failed",
            report.deleted.len(),
            report.failed.len()
        );
        report
    }
}
