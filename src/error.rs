//! Error types for shellcache
//!
//! All modules use `ShellcacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shellcache operations
pub type ShellcacheResult<T> = Result<T, ShellcacheError>;

/// All errors that can occur in shellcache
#[derive(Error, Debug)]
pub enum ShellcacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    // Store errors
    #[error("Failed to open cache generation {name}: {reason}")]
    StoreOpen { name: String, reason: String },

    #[error("Cache store error: {0}")]
    Store(String),

    #[error("Cache generation not found: {0}")]
    GenerationNotFound(String),

    #[error("Request cannot be stored: {method} {url}: {reason}")]
    Unstorable {
        method: String,
        url: String,
        reason: String,
    },

    #[error("Failed to pre-cache {} of {total} manifest entries", failures.len())]
    Precache {
        total: usize,
        failures: Vec<(String, String)>,
    },

    // Network errors
    #[error("Network request failed: {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Response body already consumed")]
    BodyConsumed,

    // Lifecycle errors
    #[error("Worker is {actual}, expected {expected}")]
    InvalidState { expected: String, actual: String },

    #[error("No active worker")]
    NoActiveWorker,

    #[error("No installed worker is waiting to activate")]
    NoWaitingWorker,

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

    #[error("{0}")]
    User(String),
}

impl ShellcacheError {
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

    /// Create a store-open error for a generation
    pub fn store_open(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreOpen {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Precache { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NoActiveWorker => Some("Run: shellcache install && shellcache activate"),
            Self::NoWaitingWorker => Some("Run: shellcache install"),
            Self::ConfigNotFound(_) => Some("Run: shellcache config init"),
            Self::Precache { .. } => Some("Check connectivity and re-run: shellcache install"),
            Self::InvalidUrl { .. } => Some("Check worker.origin and worker.manifest in the config"),
            _ => None,
        }
    }
}
