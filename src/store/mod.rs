//! Cache store abstraction
//!
//! A store holds any number of named generations, each mapping a request
//! identity to a stored response. The worker components receive the store
//! as an injected `Arc<dyn CacheStore>`:
//! - `MemoryStore`: in-process, for tests and embedding hosts
//! - `DiskStore`: one directory per generation under the state dir

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::error::PrecacheResult;
use crate::http::{RequestKey, Response, ResponseType};
use crate::registry::GenerationName;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Abstract cache store interface
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the generation if it does not exist yet
    async fn open(&self, generation: &GenerationName) -> PrecacheResult<()>;

    /// Store an entry, replacing any previous entry for the same key.
    /// Creates the generation if needed.
    async fn put(&self, generation: &GenerationName, entry: StoredResponse) -> PrecacheResult<()>;

    /// Look up an entry in one generation
    async fn lookup(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
    ) -> PrecacheResult<Option<StoredResponse>>;

    /// Names of every existing generation
    async fn keys(&self) -> PrecacheResult<Vec<String>>;

    /// Delete a generation and all its entries. Returns false if it did not exist.
    async fn delete(&self, generation: &str) -> PrecacheResult<bool>;

    /// Request identities stored in a generation
    async fn entries(&self, generation: &str) -> PrecacheResult<Vec<RequestKey>>;

    /// Whether a generation exists
    async fn has(&self, generation: &str) -> PrecacheResult<bool> {
        Ok(self.keys().await?.iter().any(|k| k == generation))
    }

    /// Human-readable store name for display
    fn store_name(&self) -> &'static str;
}

/// A persisted response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub key: RequestKey,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub response_type: ResponseType,
    pub url: Option<String>,
    #[serde(with = "hex_body")]
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
    /// Consume a response into a storable entry.
    ///
    /// Reads the body, so callers that still need the response must
    /// store a duplicate.
    pub fn from_response(key: RequestKey, mut response: Response) -> PrecacheResult<Self> {
        let body = response.bytes()?;
        Ok(Self {
            key,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            response_type: response.response_type,
            url: response.url,
            body,
            stored_at: Utc::now(),
        })
    }

    /// Rebuild a fresh, unread response
    pub fn into_response(self) -> Response {
        let mut response = Response::new(self.status, self.response_type, self.body);
        response.status_text = self.status_text;
        response.headers = self.headers;
        response.url = self.url;
        response
    }
}

/// Bodies are stored hex-encoded to keep entry files valid UTF-8 JSON
mod hex_body {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
