//! Error types for precache
//!
//! All modules use `PrecacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for precache operations
pub type PrecacheResult<T> = Result<T, PrecacheError>;

/// All errors that can occur in precache
#[derive(Error, Debug)]
pub enum PrecacheError {
    // Lifecycle errors
    #[error("Precache failed for {path}: {reason}")]
    Install { path: String, reason: String },

    #[error("Network request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Failed to store {key} in generation {generation}: {reason}")]
    CacheWrite {
        generation: String,
        key: String,
        reason: String,
    },

    #[error("Failed to delete generation {generation}: {reason}")]
    ReaperDeletion { generation: String, reason: String },

    #[error("Cannot {action} while worker is {state}")]
    LifecycleOrder { action: String, state: String },

    // Request/response errors
    #[error("Body has already been consumed")]
    BodyUsed,

    #[error("Invalid HTTP method '{method}': {reason}")]
    InvalidMethod { method: String, reason: String },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    // Registry errors
    #[error("Invalid generation name '{name}': {reason}")]
    InvalidGeneration { name: String, reason: String },

    #[error("Invalid asset manifest: {0}")]
    InvalidManifest(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrecacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error for a URL
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an install error for a manifest path
    pub fn install(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Install {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Install { .. } | Self::Network { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Install { .. } => Some("Check connectivity to the origin and rerun: precache install"),
            Self::LifecycleOrder { .. } => {
                Some("Run `precache install` before `precache activate`")
            }
            Self::ConfigInvalid { .. } => Some("Inspect the effective config with: precache config show"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PrecacheError::install("/app.js", "status 404");
        assert_eq!(err.to_string(), "Precache failed for /app.js: status 404");
    }

    #[test]
    fn error_hint() {
        let err = PrecacheError::LifecycleOrder {
            action: "activate".to_string(),
            state: "parsed".to_string(),
        };
        assert!(err.hint().unwrap().contains("precache install"));
        assert_eq!(PrecacheError::BodyUsed.hint(), None);
    }

    #[test]
    fn error_retryable() {
        assert!(PrecacheError::network("https://example.com/", "offline").is_retryable());
        assert!(!PrecacheError::BodyUsed.is_retryable());
    }
}
