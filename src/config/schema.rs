//! Configuration schema for shellcache
//!
//! Configuration is stored at `~/.config/shellcache/config.toml`, optionally
//! overridden by a project-local `.shellcache.toml`.

use crate::config::ConfigManager;
use crate::error::{ShellcacheError, ShellcacheResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Worker version: generation tag, origin and manifest
    pub worker: WorkerConfig,

    /// Hosts that are never cached
    pub bypass: BypassConfig,

    /// HTTP client settings
    pub network: NetworkConfig,

    /// Cache store settings
    pub store: StoreConfig,
}

impl Config {
    /// Parsed app origin
    pub fn origin_url(&self) -> ShellcacheResult<Url> {
        parse_url(&self.worker.origin)
    }

    /// Scope controlled by the worker (defaults to the origin root)
    pub fn scope_url(&self) -> ShellcacheResult<Url> {
        match &self.worker.scope {
            Some(scope) => self.origin_url()?.join(scope).map_err(|e| ShellcacheError::InvalidUrl {
                url: scope.clone(),
                reason: e.to_string(),
            }),
            None => self.origin_url(),
        }
    }

    /// Manifest entries resolved against the scope, in declaration order
    pub fn manifest_urls(&self) -> ShellcacheResult<Vec<Url>> {
        let base = self.scope_url()?;
        self.worker
            .manifest
            .iter()
            .map(|entry| {
                base.join(entry).map_err(|e| ShellcacheError::InvalidUrl {
                    url: entry.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Directory holding the store, registration record and journal
    pub fn state_dir(&self) -> PathBuf {
        self.general
            .state_dir
            .clone()
            .unwrap_or_else(ConfigManager::default_state_dir)
    }

    /// Root of the disk store
    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| self.state_dir().join("store"))
    }

    /// Path of the persisted registration record
    pub fn registration_path(&self) -> PathBuf {
        self.state_dir().join("registration.json")
    }

    /// Path of the lifecycle journal
    pub fn journal_path(&self) -> PathBuf {
        self.state_dir().join("journal.log")
    }
}

fn parse_url(s: &str) -> ShellcacheResult<Url> {
    Url::parse(s).map_err(|e| ShellcacheError::InvalidUrl {
        url: s.to_string(),
        reason: e.to_string(),
    })
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable the lifecycle journal
    pub journal: bool,

    /// Override the state directory
    pub state_dir: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            journal: true,
            state_dir: None,
        }
    }
}

/// One deployed worker version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Cache generation tag; bump on every release that must force a refresh
    pub generation: String,

    /// Origin the app is served from
    pub origin: String,

    /// Scope path relative to the origin (defaults to "/")
    pub scope: Option<String>,

    /// URLs pre-cached at install, relative to the scope or absolute
    pub manifest: Vec<String>,

    /// Activate as soon as install finishes instead of waiting for old pages to close
    pub skip_waiting: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            generation: "finance-tracker-v4".to_string(),
            origin: "http://localhost:8080/".to_string(),
            scope: None,
            manifest: [
                "./",
                "./index.html",
                "./finance_manifest.json",
                "https://cdn.tailwindcss.com",
                "https://unpkg.com/react@18/umd/react.development.js",
                "https://unpkg.com/react-dom@18/umd/react-dom.development.js",
                "https://unpkg.com/@babel/standalone/babel.min.js",
                "https://www.gstatic.com/firebasejs/9.6.1/firebase-app-compat.js",
                "https://www.gstatic.com/firebasejs/9.6.1/firebase-auth-compat.js",
                "https://www.gstatic.com/firebasejs/9.6.1/firebase-firestore-compat.js",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            skip_waiting: true,
        }
    }
}

/// Live-data hosts excluded from caching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BypassConfig {
    /// A request is bypassed when its host contains any of these
    pub hosts: Vec<String>,
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self {
            hosts: vec![
                "firestore.googleapis.com".to_string(),
                "auth.googleapis.com".to_string(),
            ],
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Whole-request timeout in seconds (0 = no timeout)
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Largest response body read into memory, in bytes
    pub max_body_bytes: u64,
}

/// Default response body cap (64 MiB)
pub const DEFAULT_MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 0,
            user_agent: format!("shellcache/{}", env!("CARGO_PKG_VERSION")),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Cache store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend: "disk" or "memory"
    pub backend: String,

    /// Override the disk store root
    pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "disk".to_string(),
            path: None,
        }
    }
}
