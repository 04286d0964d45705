//! Lifecycle journal
//!
//! Appends JSON lines to `<state_dir>/journal.log` recording install,
//! activation and generation deletions so an operator can see when each
//! generation came and went.

use crate::config::Config;
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Journal event names
pub mod events {
    pub const INSTALL_COMPLETED: &str = "install.completed";
    pub const ACTIVATE_COMPLETED: &str = "activate.completed";
    pub const GENERATION_DELETED: &str = "generation.deleted";
    pub const GENERATION_DELETE_FAILED: &str = "generation.delete_failed";
}

/// File-based journal that appends JSON lines
#[derive(Debug, Clone)]
pub struct Journal {
    enabled: bool,
    path: PathBuf,
}

impl Journal {
    /// Create a journal from config
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.journal,
            path: config.journal_path(),
        }
    }

    /// A journal that records nothing
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            path: PathBuf::new(),
        }
    }

    /// Journal file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Record an event as a JSON line.
    ///
    /// IO failures are logged and dropped; the lifecycle never waits on
    /// or fails because of the journal.
    pub async fn record(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize journal event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write journal: {}", e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
