//! Request interceptor: cache-first resolution with write-back
//!
//! Resolution order for one request:
//! 1. Excluded scheme: decline, the host serves the request itself
//! 2. Current generation hit: serve the stored response
//! 3. Network: return the response, persisting a copy if cacheable
//! 4. Network failure: serve the offline fallback or a typed 503

use crate::error::PrecacheError;
use crate::http::{Method, Request, RequestKey, Response};
use crate::network::Fetcher;
use crate::registry::GenerationName;
use crate::store::{CacheStore, StoredResponse};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

/// How a request was resolved
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not handled; the request is left to default platform behavior
    Declined,
    /// Served from the current generation without touching the network
    Cache(Response),
    /// Served from the network
    Network(Response),
    /// Network failed; fallback page or synthesized 503
    Offline(Response),
}

impl FetchOutcome {
    /// Short label for logs and CLI output
    pub fn source(&self) -> &'static str {
        match self {
            Self::Declined => "declined",
            Self::Cache(_) => "cache",
            Self::Network(_) => "network",
            Self::Offline(_) => "offline",
        }
    }

    pub fn response(self) -> Option<Response> {
        match self {
            Self::Declined => None,
            Self::Cache(r) | Self::Network(r) | Self::Offline(r) => Some(r),
        }
    }
}

pub struct Interceptor {
    generation: GenerationName,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    excluded_schemes: Vec<String>,
    offline_fallback: Option<RequestKey>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl Interceptor {
    pub fn new(
        generation: GenerationName,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            generation,
            store,
            fetcher,
            excluded_schemes: vec!["chrome-extension".to_string()],
            offline_fallback: None,
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    /// Replace the list of schemes the interceptor declines
    pub fn with_excluded_schemes(mut self, schemes: Vec<String>) -> Self {
        self.excluded_schemes = schemes;
        self
    }

    /// Serve this cached page (looked up as a GET) when the network is down
    pub fn with_offline_fallback(mut self, url: Option<Url>) -> Self {
        self.offline_fallback = url.map(|u| RequestKey::new(&Method::GET, &u));
        self
    }

    /// Whether the request URL uses a scheme this interceptor never handles
    pub fn is_excluded(&self, url: &Url) -> bool {
        self.excluded_schemes
            .iter()
            .any(|scheme| scheme.eq_ignore_ascii_case(url.scheme()))
    }

    /// Resolve one request. Never fails; see `FetchOutcome`.
    pub async fn handle(&self, request: &Request) -> FetchOutcome {
        if self.is_excluded(request.url()) {
            debug!("Declining {} request {}", request.url().scheme(), request.url());
            return FetchOutcome::Declined;
        }

        let key = request.key();
        match self.store.lookup(&self.generation, &key).await {
            Ok(Some(stored)) => {
                debug!("Cache hit for {}", key);
                return FetchOutcome::Cache(stored.into_response());
            }
            Ok(None) => debug!("Cache miss for {}", key),
            Err(e) => warn!("Cache lookup for {} failed, treating as miss: {}", key, e),
        }

        let forwarded = match request.duplicate() {
            Ok(forwarded) => forwarded,
            Err(e) => {
                warn!("Cannot forward {}: {}", key, e);
                return self.offline(request).await;
            }
        };

        match self.fetcher.fetch(forwarded).await {
            Ok(response) => self.write_back(key, response).await,
            Err(e) => {
                warn!("{}", e);
                self.offline(request).await
            }
        }
    }

    /// Wait for every background cache write started so far
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = self.pending_writes.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Cache write task failed: {}", e);
            }
        }
    }

    async fn write_back(&self, key: RequestKey, response: Response) -> FetchOutcome {
        if key.method != Method::GET.as_str() {
            debug!("Not caching non-GET request {}", key);
            return FetchOutcome::Network(response);
        }
        if !response.is_cacheable() {
            debug!(
                "Not caching {} ({} {})",
                key, response.status, response.response_type
            );
            return FetchOutcome::Network(response);
        }

        match response.duplicate() {
            Ok(copy) => self.persist(key, copy).await,
            Err(e) => warn!("Cannot copy response for {}: {}", key, e),
        }
        FetchOutcome::Network(response)
    }

    /// Store a response copy in the background; the caller does not wait
    async fn persist(&self, key: RequestKey, copy: Response) {
        let store = Arc::clone(&self.store);
        let generation = self.generation.clone();

        let handle = tokio::spawn(async move {
            let result = match StoredResponse::from_response(key.clone(), copy) {
                Ok(entry) => store.put(&generation, entry).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => debug!("Cached {} in {}", key, generation),
                Err(e) => {
                    let err = PrecacheError::CacheWrite {
                        generation: generation.to_string(),
                        key: key.to_string(),
                        reason: e.to_string(),
                    };
                    warn!("{}", err);
                }
            }
        });

        let mut pending = self.pending_writes.lock().await;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    async fn offline(&self, request: &Request) -> FetchOutcome {
        if *request.method() == Method::GET {
            if let Some(ref fallback) = self.offline_fallback {
                match self.store.lookup(&self.generation, fallback).await {
                    Ok(Some(stored)) => {
                        debug!("Serving offline fallback {} for {}", fallback.url, request.url());
                        return FetchOutcome::Offline(stored.into_response());
                    }
                    Ok(None) => debug!("Offline fallback {} is not cached", fallback.url),
                    Err(e) => warn!("Offline fallback lookup failed: {}", e),
                }
            }
        }
        FetchOutcome::Offline(Response::unavailable(request.url()))
    }
}
