//! Precache installer
//!
//! Populates the current generation with every manifest asset. Either all
//! assets end up stored or the install fails and the generation it created
//! is discarded.

use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{Method, Request};
use crate::network::Fetcher;
use crate::registry::{GenerationName, VersionRegistry};
use crate::store::{CacheStore, StoredResponse};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of a successful install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Generation that was populated
    pub generation: GenerationName,
    /// Number of assets stored
    pub assets: usize,
    /// Total body bytes stored
    pub bytes: u64,
}

/// Resolve a manifest path against the application origin
pub fn resolve_asset(origin: &Url, path: &str) -> PrecacheResult<Url> {
    origin.join(path).map_err(|e| PrecacheError::InvalidUrl {
        url: path.to_string(),
        reason: e.to_string(),
    })
}

pub struct Installer {
    registry: VersionRegistry,
    origin: Url,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
}

impl Installer {
    pub fn new(
        registry: VersionRegistry,
        origin: Url,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            registry,
            origin,
            store,
            fetcher,
        }
    }

    /// Precache the whole manifest into the current generation
    pub async fn install(&self) -> PrecacheResult<InstallReport> {
        self.install_with_progress(&|_, _, _| {}).await
    }

    /// Like `install`, calling `on_stored(done, total, path)` after each asset is stored
    pub async fn install_with_progress(
        &self,
        on_stored: &(dyn Fn(usize, usize, &str) + Send + Sync),
    ) -> PrecacheResult<InstallReport> {
        let generation = self.registry.generation();
        let manifest = self.registry.manifest();
        info!(
            "Installing generation {} ({} assets)",
            generation,
            manifest.len()
        );
        if manifest.is_empty() {
            warn!("Manifest for generation {} is empty", generation);
        }
        let requests = self.requests()?;

        let existed = self.store.has(generation.as_str()).await?;
        self.store.open(generation).await?;

        let result = self.populate(generation, requests, on_stored).await;
        if let Err(ref e) = result {
            warn!("Install of generation {} failed: {}", generation, e);
            if !existed {
                self.discard(generation).await;
            }
        }
        result
    }

    /// One GET per manifest path. Two paths naming the same URL are rejected.
    fn requests(&self) -> PrecacheResult<Vec<Request>> {
        let manifest = self.registry.manifest();
        let mut seen: HashMap<String, &str> = HashMap::with_capacity(manifest.len());
        let mut requests = Vec::with_capacity(manifest.len());

        for path in manifest.iter() {
            let url = resolve_asset(&self.origin, path)
                .map_err(|e| PrecacheError::install(path, e.to_string()))?;
            let request = Request::from_url(Method::GET, url);
            if let Some(first) = seen.insert(request.key().url, path) {
                return Err(PrecacheError::InvalidManifest(format!(
                    "'{}' and '{}' both resolve to {}",
                    first,
                    path,
                    request.url()
                )));
            }
            requests.push(request);
        }
        Ok(requests)
    }

    async fn populate(
        &self,
        generation: &GenerationName,
        requests: Vec<Request>,
        on_stored: &(dyn Fn(usize, usize, &str) + Send + Sync),
    ) -> PrecacheResult<InstallReport> {
        let manifest = self.registry.manifest();
        let total = manifest.len();

        // Fetch everything before writing anything, so a failed fetch leaves no entries
        let fetches = requests.iter().map(|request| async move {
            let forwarded = request.duplicate()?;
            self.fetcher.fetch(forwarded).await
        });
        let responses = join_all(fetches).await;

        let mut fetched = Vec::with_capacity(total);
        for ((path, request), result) in manifest.iter().zip(&requests).zip(responses) {
            let response = result.map_err(|e| PrecacheError::install(path, e.to_string()))?;
            if !response.is_ok() {
                return Err(PrecacheError::install(
                    path,
                    format!("server answered {} {}", response.status, response.status_text),
                ));
            }
            debug!("Fetched {} ({})", path, response.status);
            fetched.push((path, request.key(), response));
        }

        let mut bytes = 0u64;
        for (done, (path, key, response)) in fetched.into_iter().enumerate() {
            let entry = StoredResponse::from_response(key, response)?;
            bytes += entry.body.len() as u64;
            self.store
                .put(generation, entry)
                .await
                .map_err(|e| PrecacheError::install(path, e.to_string()))?;
            on_stored(done + 1, total, path);
        }

        info!(
            "Installed generation {}: {} assets, {} bytes",
            generation, total, bytes
        );
        Ok(InstallReport {
            generation: generation.clone(),
            assets: total,
            bytes,
        })
    }

    async fn discard(&self, generation: &GenerationName) {
        match self.store.delete(generation.as_str()).await {
            Ok(_) => debug!("Discarded partial generation {}", generation),
            Err(e) => warn!("Failed to discard partial generation {}: {}", generation, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AssetManifest;
    use crate::store::MemoryStore;
    use crate::worker::testing::{FlakyStore, StaticFetcher};
    use std::sync::Mutex;

    fn registry(generation: &str, assets: &[&str]) -> VersionRegistry {
        VersionRegistry::new(
            GenerationName::new(generation).unwrap(),
            AssetManifest::new(assets.iter().copied()).unwrap(),
        )
    }

    fn origin() -> Url {
        Url::parse("https://app.test").unwrap()
    }

    #[test]
    fn resolve_asset_against_origin() {
        assert_eq!(
            resolve_asset(&origin(), "static/icon.png").unwrap().as_str(),
            "https://app.test/static/icon.png"
        );
        assert_eq!(resolve_asset(&origin(), "/").unwrap().as_str(), "https://app.test/");
    }

    #[tokio::test]
    async fn install_stores_every_asset() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(
            StaticFetcher::new()
                .ok("https://app.test/", "<html>")
                .ok("https://app.test/app.js", "js")
                .ok("https://app.test/main.css", "css"),
        );
        let installer = Installer::new(
            registry("v1", &["/", "/app.js", "/main.css"]),
            origin(),
            store.clone(),
            fetcher,
        );

        let report = installer.install().await.unwrap();

        assert_eq!(report.assets, 3);
        assert_eq!(report.bytes, 11);
        let keys = store.entries("v1").await.unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys.iter().any(|k| k.url == "https://app.test/main.css"));
    }

    #[tokio::test]
    async fn install_fails_whole_batch_on_one_network_error() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(
            StaticFetcher::new()
                .ok("https://app.test/", "<html>")
                .ok("https://app.test/main.css", "css"),
        );
        let installer = Installer::new(
            registry("v1", &["/", "/app.js", "/main.css"]),
            origin(),
            store.clone(),
            fetcher,
        );

        let err = installer.install().await.unwrap_err();

        match err {
            PrecacheError::Install { path, .. } => assert_eq!(path, "/app.js"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn install_rejects_error_status() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(
            StaticFetcher::new()
                .ok("https://app.test/", "<html>")
                .status("https://app.test/app.js", 404, "missing"),
        );
        let installer = Installer::new(
            registry("v1", &["/", "/app.js"]),
            origin(),
            store.clone(),
            fetcher,
        );

        let err = installer.install().await.unwrap_err();

        assert!(err.to_string().contains("404"));
        assert!(!store.has("v1").await.unwrap());
    }

    #[tokio::test]
    async fn install_discards_generation_when_write_fails() {
        let store = Arc::new(FlakyStore::failing_puts_after(1));
        let fetcher = Arc::new(
            StaticFetcher::new()
                .ok("https://app.test/", "<html>")
                .ok("https://app.test/app.js", "js"),
        );
        let installer = Installer::new(
            registry("v1", &["/", "/app.js"]),
            origin(),
            store.clone(),
            fetcher,
        );

        assert!(installer.install().await.is_err());
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn install_reports_progress_in_manifest_order() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(
            StaticFetcher::new()
                .ok("https://app.test/a", "a")
                .ok("https://app.test/b", "b"),
        );
        let installer = Installer::new(registry("v1", &["/a", "/b"]), origin(), store, fetcher);
        let seen = Mutex::new(Vec::new());

        installer
            .install_with_progress(&|done, total, path| {
                seen.lock().unwrap().push(format!("{}/{} {}", done, total, path));
            })
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["1/2 /a", "2/2 /b"]);
    }

    #[tokio::test]
    async fn install_rejects_paths_resolving_to_same_url() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(StaticFetcher::new().ok("https://app.test/app.js", "js"));
        let installer = Installer::new(
            registry("v1", &["/app.js", "app.js"]),
            origin(),
            store.clone(),
            fetcher.clone(),
        );

        let err = installer.install().await.unwrap_err();

        assert!(matches!(err, PrecacheError::InvalidManifest(_)));
        assert!(err.to_string().contains("'/app.js' and 'app.js'"));
        assert!(!store.has("v1").await.unwrap());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn install_of_empty_manifest_creates_empty_generation() {
        let store = Arc::new(MemoryStore::new());
        let installer = Installer::new(
            registry("v1", &[]),
            origin(),
            store.clone(),
            Arc::new(StaticFetcher::new()),
        );

        let report = installer.install().await.unwrap();

        assert_eq!(report.assets, 0);
        assert!(store.has("v1").await.unwrap());
        assert!(store.entries("v1").await.unwrap().is_empty());
    }
}
