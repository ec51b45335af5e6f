//! Filesystem-backed cache store
//!
//! Layout: `<root>/<generation>/<sha256 of request key>.json`. Entries are
//! written to a temporary file and renamed into place so a reader never
//! sees a half-written entry.

use super::{CacheStore, StoredResponse};
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::RequestKey;
use crate::registry::GenerationName;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Store that keeps each generation in its own directory
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, generation: &str) -> PathBuf {
        self.root.join(generation)
    }

    fn entry_path(&self, generation: &str, key: &RequestKey) -> PathBuf {
        self.generation_dir(generation)
            .join(format!("{}.json", entry_digest(key)))
    }

    async fn ensure_dir(&self, dir: &Path) -> PrecacheResult<()> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| PrecacheError::io(format!("creating directory {}", dir.display()), e))
    }
}

/// Write `content` to a uniquely named temp file in `dir`, then rename it to `path`
fn write_atomic(dir: &Path, path: &Path, content: &[u8]) -> PrecacheResult<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".entry-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| PrecacheError::io(format!("creating temp entry in {}", dir.display()), e))?;
    tmp.write_all(content)
        .map_err(|e| PrecacheError::io(format!("writing entry {}", tmp.path().display()), e))?;
    tmp.persist(path).map_err(|e| {
        PrecacheError::io(format!("renaming entry into {}", path.display()), e.error)
    })?;
    Ok(())
}

/// SHA256 of the request identity, used as the entry file stem
fn entry_digest(key: &RequestKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn open(&self, generation: &GenerationName) -> PrecacheResult<()> {
        let dir = self.generation_dir(generation.as_str());
        self.ensure_dir(&dir).await?;
        debug!("Opened generation {} at {}", generation, dir.display());
        Ok(())
    }

    async fn put(&self, generation: &GenerationName, entry: StoredResponse) -> PrecacheResult<()> {
        let dir = self.generation_dir(generation.as_str());
        self.ensure_dir(&dir).await?;

        let path = self.entry_path(generation.as_str(), &entry.key);
        let content = serde_json::to_vec(&entry)?;

        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &content))
            .await
            .map_err(|e| {
                PrecacheError::io("entry write task failed", std::io::Error::other(e.to_string()))
            })??;

        debug!("Stored {} in {}", entry.key, generation);
        Ok(())
    }

    async fn lookup(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
    ) -> PrecacheResult<Option<StoredResponse>> {
        let path = self.entry_path(generation.as_str(), key);

        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PrecacheError::io(
                    format!("reading entry {}", path.display()),
                    e,
                ))
            }
        };

        let entry: StoredResponse = serde_json::from_slice(&content)?;
        // Guard against digest collisions
        if entry.key != *key {
            warn!("Entry {} does not match key {}", path.display(), key);
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut dir = fs::read_dir(&self.root)
            .await
            .map_err(|e| PrecacheError::io("reading store directory", e))?;

        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io("reading store entry", e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_dir && !name.starts_with('.') {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn delete(&self, generation: &str) -> PrecacheResult<bool> {
        let dir = self.generation_dir(generation);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Deleted generation directory {}", dir.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PrecacheError::io(
                format!("removing generation {}", dir.display()),
                e,
            )),
        }
    }

    async fn entries(&self, generation: &str) -> PrecacheResult<Vec<RequestKey>> {
        let dir = self.generation_dir(generation);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut read = fs::read_dir(&dir)
            .await
            .map_err(|e| PrecacheError::io(format!("reading generation {}", dir.display()), e))?;

        let mut keys = Vec::new();
        while let Some(entry) = read
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io("reading generation entry", e))?
        {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let content = fs::read(&path)
                .await
                .map_err(|e| PrecacheError::io(format!("reading entry {}", path.display()), e))?;
            match serde_json::from_slice::<StoredResponse>(&content) {
                Ok(stored) => keys.push(stored.key),
                Err(e) => warn!("Skipping unreadable entry {}: {}", path.display(), e),
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn has(&self, generation: &str) -> PrecacheResult<bool> {
        Ok(self.generation_dir(generation).is_dir())
    }

    fn store_name(&self) -> &'static str {
        "disk"
    }
}
