//! In-memory cache store

use super::{CacheStore, StoredResponse};
use crate::error::PrecacheResult;
use crate::http::RequestKey;
use crate::registry::GenerationName;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

type Generation = BTreeMap<RequestKey, StoredResponse>;

/// Store that keeps every generation in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    generations: RwLock<BTreeMap<String, Generation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, generation: &GenerationName) -> PrecacheResult<()> {
        self.generations
            .write()
            .await
            .entry(generation.to_string())
            .or_default();
        Ok(())
    }

    async fn put(&self, generation: &GenerationName, entry: StoredResponse) -> PrecacheResult<()> {
        self.generations
            .write()
            .await
            .entry(generation.to_string())
            .or_default()
            .insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn lookup(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
    ) -> PrecacheResult<Option<StoredResponse>> {
        Ok(self
            .generations
            .read()
            .await
            .get(generation.as_str())
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        Ok(self.generations.read().await.keys().cloned().collect())
    }

    async fn delete(&self, generation: &str) -> PrecacheResult<bool> {
        Ok(self.generations.write().await.remove(generation).is_some())
    }

    async fn entries(&self, generation: &str) -> PrecacheResult<Vec<RequestKey>> {
        Ok(self
            .generations
            .read()
            .await
            .get(generation)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
