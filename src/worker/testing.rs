//! Test doubles for the worker components

use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{Request, RequestKey, Response, ResponseType};
use crate::network::Fetcher;
use crate::registry::GenerationName;
use crate::store::{CacheStore, MemoryStore, StoredResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Fetcher answering from a fixed table; unknown URLs fail like a dead network
#[derive(Default)]
pub struct StaticFetcher {
    routes: HashMap<String, (u16, ResponseType, Vec<u8>)>,
    calls: AtomicUsize,
    offline: AtomicBool,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, url: &str, body: &str) -> Self {
        self.route(url, 200, ResponseType::Basic, body)
    }

    pub fn status(self, url: &str, status: u16, body: &str) -> Self {
        self.route(url, status, ResponseType::Basic, body)
    }

    pub fn opaque(self, url: &str, body: &str) -> Self {
        self.route(url, 0, ResponseType::Opaque, body)
    }

    pub fn cors(self, url: &str, body: &str) -> Self {
        self.route(url, 200, ResponseType::Cors, body)
    }

    fn route(mut self, url: &str, status: u16, response_type: ResponseType, body: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            (status, response_type, body.as_bytes().to_vec()),
        );
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, request: Request) -> PrecacheResult<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = request.url().to_string();

        if self.offline.load(Ordering::SeqCst) {
            return Err(PrecacheError::network(url, "network is offline"));
        }

        match self.routes.get(&url) {
            Some((status, response_type, body)) => {
                Ok(Response::new(*status, *response_type, body.clone()).with_url(url))
            }
            None => Err(PrecacheError::network(url, "connection refused")),
        }
    }
}

/// Memory store with injectable failures
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    puts_before_failure: Option<usize>,
    puts: AtomicUsize,
    undeletable: Vec<String>,
    failing_lookups: bool,
}

impl FlakyStore {
    /// Succeed for `n` puts, then fail every put
    pub fn failing_puts_after(n: usize) -> Self {
        Self {
            puts_before_failure: Some(n),
            ..Self::default()
        }
    }

    /// Refuse to delete the named generations
    pub fn undeletable(names: &[&str]) -> Self {
        Self {
            undeletable: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Fail every lookup
    pub fn failing_lookups() -> Self {
        Self {
            failing_lookups: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn open(&self, generation: &GenerationName) -> PrecacheResult<()> {
        self.inner.open(generation).await
    }

    async fn put(&self, generation: &GenerationName, entry: StoredResponse) -> PrecacheResult<()> {
        let done = self.puts.fetch_add(1, Ordering::SeqCst);
        if self.puts_before_failure.is_some_and(|limit| done >= limit) {
            return Err(PrecacheError::Internal("disk full".to_string()));
        }
        self.inner.put(generation, entry).await
    }

    async fn lookup(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
    ) -> PrecacheResult<Option<StoredResponse>> {
        if self.failing_lookups {
            return Err(PrecacheError::Internal("store unavailable".to_string()));
        }
        self.inner.lookup(generation, key).await
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        self.inner.keys().await
    }

    async fn delete(&self, generation: &str) -> PrecacheResult<bool> {
        if self.undeletable.iter().any(|n| n == generation) {
            return Err(PrecacheError::Internal("permission denied".to_string()));
        }
        self.inner.delete(generation).await
    }

    async fn entries(&self, generation: &str) -> PrecacheResult<Vec<RequestKey>> {
        self.inner.entries(generation).await
    }

    fn store_name(&self) -> &'static str {
        "flaky"
    }
}
