//! Configuration management for shellcache

pub mod schema;

pub use schema::Config;

use crate::error::{ShellcacheError, ShellcacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Name of the project-local config file
pub const LOCAL_CONFIG_FILE: &str = ".shellcache.toml";

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
            .join("shellcache")
            .join("config.toml")
    }

    /// Get the default state directory path
    pub fn default_state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shellcache")
    }

    /// Walk up from `start` looking for a project-local config
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> ShellcacheResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> ShellcacheResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ShellcacheError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| ShellcacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the global config with an optional local config layered on top.
    ///
    /// Local tables override global ones key by key; arrays are replaced,
    /// not concatenated.
    pub async fn load_merged(&self, local: Option<&Path>) -> ShellcacheResult<Config> {
        let global = self.load().await?;
        let Some(local_path) = local else {
            return Ok(global);
        };

        let content = fs::read_to_string(local_path).await.map_err(|e| {
            ShellcacheError::io(format!("reading config from {}", local_path.display()), e)
        })?;
        let overlay: toml::Value =
            toml::from_str(&content).map_err(|e| ShellcacheError::ConfigInvalid {
                path: local_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut base = toml::Value::try_from(&global)?;
        merge_values(&mut base, overlay);

        base.try_into().map_err(|e: toml::de::Error| ShellcacheError::ConfigInvalid {
            path: local_path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> ShellcacheResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            ShellcacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> ShellcacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ShellcacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the state directory for this config exists
    pub async fn ensure_state_dirs(config: &Config) -> ShellcacheResult<()> {
        let dir = config.state_dir();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ShellcacheError::io(format!("creating directory {}", dir.display()), e))
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

fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
