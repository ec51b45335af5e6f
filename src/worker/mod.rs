//! Cache lifecycle worker
//!
//! The installer fills a generation, the reaper removes the ones the
//! registry no longer names, and the interceptor answers requests
//! cache-first. `Worker` sequences the three.

mod installer;
mod interceptor;
mod lifecycle;
mod reaper;
#[cfg(test)]
pub(crate) mod testing;

pub use installer::{resolve_asset, InstallReport, Installer};
pub use interceptor::{FetchOutcome, Interceptor};
pub use lifecycle::{Worker, WorkerState};
pub use reaper::{ReapReport, Reaper};

#[cfg(test)]
mod tests {
    use super::testing::StaticFetcher;
    use super::*;
    use crate::http::Request;
    use crate::registry::{AssetManifest, GenerationName, VersionRegistry};
    use crate::store::{CacheStore, MemoryStore};
    use std::sync::Arc;
    use url::Url;

    fn registry(generation: &str) -> VersionRegistry {
        VersionRegistry::new(
            GenerationName::new(generation).unwrap(),
            AssetManifest::new(["/", "index.html", "app.js"]).unwrap(),
        )
    }

    #[tokio::test]
    async fn generation_upgrade_scenario() {
        let origin = Url::parse("https://app.test").unwrap();
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(
            StaticFetcher::new()
                .ok("https://app.test/", "<html>")
                .ok("https://app.test/index.html", "<html>")
                .ok("https://app.test/app.js", "js")
                .ok("https://app.test/favicon.ico", "icon"),
        );

        // v1 installs and serves its assets without the network
        let v1 = Worker::new(registry("v1"), origin.clone(), store.clone(), fetcher.clone());
        v1.install().await.unwrap();
        v1.activate().await.unwrap();
        let installed_calls = fetcher.calls();

        let outcome = v1
            .fetch(&Request::get("https://app.test/index.html").unwrap())
            .await;
        assert_eq!(outcome.source(), "cache");
        assert_eq!(fetcher.calls(), installed_calls);

        // v2 installs alongside v1, then activation reaps v1
        let v2 = Worker::new(registry("v2"), origin, store.clone(), fetcher.clone());
        v2.install().await.unwrap();
        assert_eq!(
            store.keys().await.unwrap(),
            vec!["v1".to_string(), "v2".to_string()]
        );
        let report = v2.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["v1".to_string()]);
        assert_eq!(store.keys().await.unwrap(), vec!["v2".to_string()]);

        // A miss goes to the network and is written back
        let favicon = Request::get("https://app.test/favicon.ico").unwrap();
        assert_eq!(v2.fetch(&favicon).await.source(), "network");
        v2.flush().await;
        let before = fetcher.calls();
        assert_eq!(v2.fetch(&favicon).await.source(), "cache");
        assert_eq!(fetcher.calls(), before);
    }
}
