//! Worker lifecycle host
//!
//! Drives the installer, reaper and interceptor through the same phases a
//! browser drives a service worker: install, then activate, then fetch.
//! Each phase is an explicit async call the host awaits.

use super::installer::{resolve_asset, InstallReport, Installer};
use super::interceptor::{FetchOutcome, Interceptor};
use super::reaper::{ReapReport, Reaper};
use crate::config::Config;
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::Request;
use crate::network::Fetcher;
use crate::registry::VersionRegistry;
use crate::store::CacheStore;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use url::Url;

/// Lifecycle state of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, nothing run yet
    Parsed,
    /// Precache in progress
    Installing,
    /// Precache complete, waiting for activation
    Installed,
    /// Reaping stale generations
    Activating,
    /// Serving requests
    Activated,
    /// Install failed; may be re-attempted
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed => write!(f, "parsed"),
            Self::Installing => write!(f, "installing"),
            Self::Installed => write!(f, "installed"),
            Self::Activating => write!(f, "activating"),
            Self::Activated => write!(f, "activated"),
            Self::Redundant => write!(f, "redundant"),
        }
    }
}

/// One generation's worker: installer, reaper and interceptor behind a state machine
pub struct Worker {
    registry: VersionRegistry,
    installer: Installer,
    reaper: Reaper,
    interceptor: Interceptor,
    store: Arc<dyn CacheStore>,
    state: Mutex<WorkerState>,
}

impl Worker {
    pub fn new(
        registry: VersionRegistry,
        origin: Url,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let installer = Installer::new(
            registry.clone(),
            origin,
            Arc::clone(&store),
            Arc::clone(&fetcher),
        );
        let reaper = Reaper::new(registry.clone(), Arc::clone(&store));
        let interceptor =
            Interceptor::new(registry.generation().clone(), Arc::clone(&store), fetcher);

        Self {
            registry,
            installer,
            reaper,
            interceptor,
            store,
            state: Mutex::new(WorkerState::Parsed),
        }
    }

    /// Build a worker from validated configuration
    pub fn from_config(
        config: &Config,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> PrecacheResult<Self> {
        let registry = config.registry()?;
        let origin = config.origin()?;
        let fallback = config
            .interceptor
            .offline_fallback
            .as_deref()
            .map(|path| resolve_asset(&origin, path))
            .transpose()?;

        let mut worker = Self::new(registry, origin, store, fetcher);
        worker.interceptor = worker
            .interceptor
            .with_excluded_schemes(config.interceptor.excluded_schemes.clone())
            .with_offline_fallback(fallback);
        Ok(worker)
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.lock().await
    }

    async fn transition(
        &self,
        action: &str,
        allowed: &[WorkerState],
        next: WorkerState,
    ) -> PrecacheResult<()> {
        let mut state = self.state.lock().await;
        if !allowed.contains(&*state) {
            return Err(PrecacheError::LifecycleOrder {
                action: action.to_string(),
                state: state.to_string(),
            });
        }
        info!("Worker {}: {} -> {}", self.registry.generation(), *state, next);
        *state = next;
        Ok(())
    }

    async fn set_state(&self, next: WorkerState) {
        let mut state = self.state.lock().await;
        info!("Worker {}: {} -> {}", self.registry.generation(), *state, next);
        *state = next;
    }

    /// Install phase: precache the manifest
    pub async fn install(&self) -> PrecacheResult<InstallReport> {
        self.install_with_progress(&|_, _, _| {}).await
    }

    /// Install phase with a per-asset progress callback
    pub async fn install_with_progress(
        &self,
        on_stored: &(dyn Fn(usize, usize, &str) + Send + Sync),
    ) -> PrecacheResult<InstallReport> {
        self.transition(
            "install",
            &[WorkerState::Parsed, WorkerState::Redundant],
            WorkerState::Installing,
        )
        .await?;

        match self.installer.install_with_progress(on_stored).await {
            Ok(report) => {
                self.set_state(WorkerState::Installed).await;
                Ok(report)
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    /// Activate phase: reap stale generations, then start serving
    pub async fn activate(&self) -> PrecacheResult<ReapReport> {
        self.transition("activate", &[WorkerState::Installed], WorkerState::Activating)
            .await?;
        let report = self.reaper.reap().await;
        self.set_state(WorkerState::Activated).await;
        Ok(report)
    }

    /// Treat a generation installed by an earlier process as this worker's install.
    ///
    /// Returns false when the current generation is not in the store.
    pub async fn adopt_installed(&self) -> PrecacheResult<bool> {
        if !self.store.has(self.registry.generation().as_str()).await? {
            return Ok(false);
        }
        self.transition("adopt", &[WorkerState::Parsed], WorkerState::Installed)
            .await?;
        Ok(true)
    }

    /// Pick up a generation installed by an earlier process.
    ///
    /// Returns true and marks the worker activated if the current
    /// generation already exists in the store.
    pub async fn resume(&self) -> PrecacheResult<bool> {
        if !self.store.has(self.registry.generation().as_str()).await? {
            return Ok(false);
        }
        self.transition(
            "resume",
            &[WorkerState::Parsed, WorkerState::Activated],
            WorkerState::Activated,
        )
        .await?;
        Ok(true)
    }

    /// Fetch phase: only an activated worker intercepts requests
    pub async fn fetch(&self, request: &Request) -> FetchOutcome {
        if self.state().await != WorkerState::Activated {
            return FetchOutcome::Declined;
        }
        self.interceptor.handle(request).await
    }

    /// Wait for background cache writes to finish
    pub async fn flush(&self) {
        self.interceptor.flush().await;
    }
}
