//! Loading and saving `config.toml`, and the on-disk locations geocache uses

pub mod schema;

pub use schema::Config;

use crate::error::{GeocacheError, GeocacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Reads and writes one `config.toml`
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Use `path` instead of the default location (`--config`, `GEOCACHE_CONFIG`)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// `<config dir>/geocache/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("geocache")
            .join("config.toml")
    }

    /// Local data directory holding the persisted cache
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("geocache")
    }

    pub fn default_cache_path() -> PathBuf {
        Self::data_dir().join("geocode-cache.json")
    }

    /// Cache path for a configuration, falling back to the default
    pub fn cache_path(config: &Config) -> PathBuf {
        config
            .cache
            .path
            .clone()
            .unwrap_or_else(Self::default_cache_path)
    }

    /// Load configuration with environment overrides applied.
    ///
    /// A missing file yields the defaults.
    pub async fn load(&self) -> GeocacheResult<Config> {
        let mut config = if self.config_path.exists() {
            self.load_from_file(&self.config_path).await?
        } else {
            debug!("Config file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load and validate configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> GeocacheResult<Config> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            GeocacheError::io(format!("reading config from {}", path.display()), e)
        })?;

        let invalid = |reason: String| GeocacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let config: Config = toml::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        config.validate().map_err(invalid)?;
        Ok(config)
    }

    /// Write `config` as TOML, creating the directory if needed
    pub async fn save(&self, config: &Config) -> GeocacheResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            GeocacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    async fn ensure_config_dir(&self) -> GeocacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| GeocacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
