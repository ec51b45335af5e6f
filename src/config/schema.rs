//! Configuration schema for precache
//!
//! Configuration is stored at `~/.config/precache/config.toml`

use crate::registry::{DEFAULT_ASSETS, DEFAULT_GENERATION};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Generation and manifest settings
    pub cache: CacheConfig,

    /// Request interception settings
    pub interceptor: InterceptorConfig,

    /// Network client settings
    pub network: NetworkConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Generation and precache manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Current generation name; change it on every deployment
    pub generation: String,

    /// Asset paths to precache, relative to the origin
    pub assets: Vec<String>,

    /// Directory holding generation stores (defaults to the state dir)
    pub store_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            generation: DEFAULT_GENERATION.to_string(),
            assets: DEFAULT_ASSETS.iter().map(|a| a.to_string()).collect(),
            store_dir: None,
        }
    }
}

/// Request interception settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptorConfig {
    /// Origin the application is served from; manifest paths resolve against it
    pub origin: String,

    /// URL schemes the interceptor never handles
    pub excluded_schemes: Vec<String>,

    /// Cached page served when the network is unreachable
    pub offline_fallback: Option<String>,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            excluded_schemes: vec!["chrome-extension".to_string()],
            offline_fallback: None,
        }
    }
}

/// Network client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Overall request timeout in seconds (none by default)
    pub timeout_secs: Option<u64>,

    /// User-Agent header sent when the request has none
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            user_agent: format!("precache/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
