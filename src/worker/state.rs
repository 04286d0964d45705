//! Worker lifecycle states and the persisted registration record

use crate::error::{ShellcacheError, ShellcacheResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

/// Lifecycle state of one worker version
///
/// ```text
/// parsed -> installing -> installed -> activating -> activated
///               |             |            |             |
///               +-------------+------------+-------------+--> redundant
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Script loaded, not yet installed
    Parsed,
    /// Install handler running
    Installing,
    /// Installed and waiting to activate
    Installed,
    /// Activate handler running
    Activating,
    /// Active and intercepting fetches
    Activated,
    /// Replaced or failed to install
    Redundant,
}

impl WorkerState {
    /// Whether fetches may be intercepted in this state
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, Self::Activated)
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Redundant)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (*self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Activated)
                | (Installing | Installed | Activating | Activated, Redundant)
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed => write!(f, "parsed"),
            Self::Installing => write!(f, "installing"),
            Self::Installed => write!(f, "installed"),
            Self::Activating => write!(f, "activating"),
            Self::Activated => write!(f, "activated"),
            Self::Redundant => write!(f, "redundant"),
        }
    }
}

/// Persisted view of one worker version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Worker instance ID
    pub id: Uuid,

    /// Cache generation tag this version owns
    pub generation: String,

    /// Lifecycle state when last saved
    pub state: WorkerState,

    /// When install completed
    pub installed_at: Option<DateTime<Utc>>,

    /// When activation completed
    pub activated_at: Option<DateTime<Utc>>,
}

/// Persisted registration: which versions are active and waiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Scope URL the registration controls
    pub scope: String,

    /// Version currently controlling clients
    pub active: Option<VersionRecord>,

    /// Installed version waiting to activate
    pub waiting: Option<VersionRecord>,

    /// When the record was last written
    pub updated_at: DateTime<Utc>,
}

impl RegistrationRecord {
    /// Create an empty record for a scope
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            active: None,
            waiting: None,
            updated_at: Utc::now(),
        }
    }

    /// Load the record, if one has been saved
    pub async fn load(path: &Path) -> ShellcacheResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            ShellcacheError::io(format!("reading registration {}", path.display()), e)
        })?;

        let record: RegistrationRecord = serde_json::from_str(&content)?;
        Ok(Some(record))
    }

    /// Save the record
    pub async fn save(&self, path: &Path) -> ShellcacheResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ShellcacheError::io("creating state directory", e))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await.map_err(|e| {
            ShellcacheError::io(format!("writing registration {}", path.display()), e)
        })?;

        Ok(())
    }

    /// Delete the record
    pub async fn delete(path: &Path) -> ShellcacheResult<()> {
        if path.exists() {
            fs::remove_file(path).await.map_err(|e| {
                ShellcacheError::io(format!("deleting registration {}", path.display()), e)
            })?;
        }
        Ok(())
    }
}
