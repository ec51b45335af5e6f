//! Version registry: the current cache generation and its asset manifest
//!
//! Both values are fixed per deployment. A new deployment ships a new
//! generation name, which is what makes the reaper drop the old one.

use crate::error::{PrecacheError, PrecacheResult};
use std::collections::HashSet;
use std::fmt;

/// Generation used when no configuration overrides it
pub const DEFAULT_GENERATION: &str = "my-pwa-cache-v1";

/// Assets precached when no configuration overrides them
pub const DEFAULT_ASSETS: &[&str] = &[
    "/",
    "index.html",
    "manifest.json",
    "app.js",
    "main.css",
    "static/android-chrome-144x144.png",
];

/// Name of one cache generation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationName(String);

impl GenerationName {
    /// Validate and wrap a generation name.
    ///
    /// Names become directory names in the disk store, so path separators,
    /// relative components and hidden (dot-prefixed) names are rejected.
    pub fn new(name: impl Into<String>) -> PrecacheResult<Self> {
        let name = name.into();
        let reason = if name.trim().is_empty() {
            Some("must not be empty")
        } else if name.contains('/') || name.contains('\\') {
            Some("must not contain path separators")
        } else if name == "." || name == ".." {
            Some("must not be a relative path component")
        } else if name.starts_with('.') {
            Some("must not start with '.'")
        } else if name.chars().any(char::is_control) {
            Some("must not contain control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(PrecacheError::InvalidGeneration {
                name,
                reason: reason.to_string(),
            }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for GenerationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered, duplicate-free list of asset paths to precache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    paths: Vec<String>,
}

impl AssetManifest {
    /// Build a manifest, rejecting empty entries and duplicates
    pub fn new<I, S>(paths: I) -> PrecacheResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();

        for path in paths {
            let path: String = path.into();
            let trimmed = path.trim();
            if trimmed.is_empty() {
                return Err(PrecacheError::InvalidManifest(
                    "asset paths must not be empty".to_string(),
                ));
            }
            if !seen.insert(trimmed.to_string()) {
                return Err(PrecacheError::InvalidManifest(format!(
                    "duplicate asset path '{}'",
                    trimmed
                )));
            }
            ordered.push(trimmed.to_string());
        }

        Ok(Self { paths: ordered })
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            paths: DEFAULT_ASSETS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// The current generation together with what it precaches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRegistry {
    generation: GenerationName,
    manifest: AssetManifest,
}

impl VersionRegistry {
    pub fn new(generation: GenerationName, manifest: AssetManifest) -> Self {
        Self {
            generation,
            manifest,
        }
    }

    pub fn generation(&self) -> &GenerationName {
        &self.generation
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    /// Generations allowed to survive a reap
    pub fn whitelist(&self) -> [&GenerationName; 1] {
        [&self.generation]
    }
}

impl Default for VersionRegistry {
    fn default() -> Self {
        Self {
            generation: GenerationName(DEFAULT_GENERATION.to_string()),
            manifest: AssetManifest::default(),
        }
    }
}
