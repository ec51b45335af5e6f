//! Configuration management for precache

pub mod schema;

pub use schema::Config;

use crate::error::{PrecacheError, PrecacheResult};
use crate::registry::{AssetManifest, GenerationName, VersionRegistry};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use url::Url;

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("precache")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("precache")
    }

    /// Get the default generation store directory
    pub fn default_store_dir() -> PathBuf {
        Self::state_dir().join("generations")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> PrecacheResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> PrecacheResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PrecacheError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| PrecacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> PrecacheResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            PrecacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> PrecacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PrecacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Validate the `[cache]` table into the version registry
    pub fn registry(&self) -> PrecacheResult<VersionRegistry> {
        let generation = GenerationName::new(self.cache.generation.clone())?;
        let manifest = AssetManifest::new(self.cache.assets.iter().cloned())?;
        Ok(VersionRegistry::new(generation, manifest))
    }

    /// Parse the configured application origin
    pub fn origin(&self) -> PrecacheResult<Url> {
        let origin = Url::parse(&self.interceptor.origin).map_err(|e| PrecacheError::InvalidUrl {
            url: self.interceptor.origin.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(origin.scheme(), "http" | "https") {
            return Err(PrecacheError::InvalidUrl {
                url: self.interceptor.origin.clone(),
                reason: "origin must use http or https".to_string(),
            });
        }
        Ok(origin)
    }

    /// Store directory from config, falling back to the state dir
    pub fn store_dir(&self) -> PathBuf {
        self.cache
            .store_dir
            .clone()
            .unwrap_or_else(ConfigManager::default_store_dir)
    }
}
