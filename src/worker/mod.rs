//! The offline cache worker
//!
//! One [`Worker`] is one deployed version: a generation tag, a manifest and
//! a bypass list, plus three handlers driven by the host:
//!
//! | Handler | Runs in state | Effect |
//! |---------|---------------|--------|
//! | `install` | parsed | open generation, pre-cache manifest, request skip-waiting |
//! | `activate` | installed | delete every other generation, claim in-scope pages |
//! | `handle_fetch` | activated | bypass, cache-first, network fallback |
//!
//! The host ([`Registration`]) awaits each handler before advancing the
//! lifecycle. Background cache writes started by `handle_fetch` are tracked
//! and can be awaited with [`Worker::settle`].

mod activate;
pub mod clients;
mod fetch;
mod install;
mod registration;
pub mod state;

pub use activate::ActivateReport;
pub use clients::{Client, Clients};
pub use fetch::FetchOutcome;
pub use install::InstallReport;
pub use registration::{Registration, UpdateReport};
pub use state::{RegistrationRecord, VersionRecord, WorkerState};

use crate::config::Config;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::journal::Journal;
use crate::net::{Fetcher, Request};
use crate::store::CacheStorage;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// Configuration of one worker version, fixed for its lifetime
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Cache generation tag
    pub generation: String,
    /// Pages under this URL are controlled
    pub scope: Url,
    /// Resolved manifest URLs
    pub manifest: Vec<Url>,
    /// Host substrings that are never cached
    pub bypass_hosts: Vec<String>,
    /// Request skip-waiting at the end of install
    pub skip_waiting: bool,
}

impl WorkerSettings {
    /// Build settings for the configured version
    pub fn from_config(config: &Config) -> ShellcacheResult<Self> {
        Ok(Self {
            generation: config.worker.generation.clone(),
            scope: config.scope_url()?,
            manifest: config.manifest_urls()?,
            bypass_hosts: config
                .bypass
                .hosts
                .iter()
                .filter(|h| !h.is_empty())
                .cloned()
                .collect(),
            skip_waiting: config.worker.skip_waiting,
        })
    }

    /// Same settings under a different generation tag
    pub fn with_generation(mut self, generation: impl Into<String>) -> Self {
        self.generation = generation.into();
        self
    }

    /// Whether the request targets a live-data host
    pub fn is_bypassed(&self, request: &Request) -> bool {
        request
            .host()
            .is_some_and(|host| self.bypass_hosts.iter().any(|b| host.contains(b.as_str())))
    }
}

/// Collaborators shared by every worker version of a registration
#[derive(Clone)]
pub struct WorkerContext {
    pub storage: Arc<dyn CacheStorage>,
    pub fetcher: Arc<dyn Fetcher>,
    pub clients: Arc<Clients>,
    pub journal: Journal,
}

impl WorkerContext {
    /// Create a context with no open pages
    pub fn new(storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>, journal: Journal) -> Self {
        Self {
            storage,
            fetcher,
            clients: Arc::new(Clients::new()),
            journal,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Lifecycle {
    state: WorkerState,
    installed_at: Option<DateTime<Utc>>,
    activated_at: Option<DateTime<Utc>>,
}

/// One worker version
pub struct Worker {
    id: Uuid,
    settings: WorkerSettings,
    ctx: WorkerContext,
    lifecycle: RwLock<Lifecycle>,
    skip_waiting: AtomicBool,
    background: Mutex<JoinSet<()>>,
}

impl Worker {
    /// Create a freshly parsed worker
    pub fn new(settings: WorkerSettings, ctx: WorkerContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            settings,
            ctx,
            lifecycle: RwLock::new(Lifecycle {
                state: WorkerState::Parsed,
                installed_at: None,
                activated_at: None,
            }),
            skip_waiting: AtomicBool::new(false),
            background: Mutex::new(JoinSet::new()),
        }
    }

    /// Rebuild a worker from a persisted record
    pub fn restore(settings: WorkerSettings, ctx: WorkerContext, record: &VersionRecord) -> Self {
        let worker = Self::new(settings.with_generation(record.generation.clone()), ctx);
        Self {
            id: record.id,
            lifecycle: RwLock::new(Lifecycle {
                state: record.state,
                installed_at: record.installed_at,
                activated_at: record.activated_at,
            }),
            ..worker
        }
    }

    /// Unique worker ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Generation tag this worker owns
    pub fn generation(&self) -> &str {
        &self.settings.generation
    }

    /// Worker settings
    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        self.lifecycle().state
    }

    /// Whether install asked to skip the waiting stage
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Snapshot for persistence
    pub fn version_record(&self) -> VersionRecord {
        let lifecycle = self.lifecycle();
        VersionRecord {
            id: self.id,
            generation: self.settings.generation.clone(),
            state: lifecycle.state,
            installed_at: lifecycle.installed_at,
            activated_at: lifecycle.activated_at,
        }
    }

    /// Mark the worker redundant; no-op if already terminal or never installed
    pub fn make_redundant(&self) {
        let mut lifecycle = self.lifecycle_mut();
        if lifecycle.state.can_transition_to(WorkerState::Redundant) {
            debug!("Worker {} ({}) is now redundant", self.id, self.settings.generation);
            lifecycle.state = WorkerState::Redundant;
        }
    }

    /// Wait for every background cache write started so far
    pub async fn settle(&self) {
        let mut pending = std::mem::take(&mut *self.background.lock().await);
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                warn!("Background cache task failed: {}", e);
            }
        }
    }

    fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.read().unwrap_or_else(|e| e.into_inner())
    }

    fn lifecycle_mut(&self) -> std::sync::RwLockWriteGuard<'_, Lifecycle> {
        self.lifecycle.write().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, next: WorkerState) -> ShellcacheResult<()> {
        let mut lifecycle = self.lifecycle_mut();
        if !lifecycle.state.can_transition_to(next) {
            return Err(ShellcacheError::InvalidState {
                expected: format!("a state that can become {}", next),
                actual: lifecycle.state.to_string(),
            });
        }

        match next {
            WorkerState::Installed => lifecycle.installed_at = Some(Utc::now()),
            WorkerState::Activated => lifecycle.activated_at = Some(Utc::now()),
            _ => {}
        }
        debug!("Worker {}: {} -> {}", self.id, lifecycle.state, next);
        lifecycle.state = next;
        Ok(())
    }

    fn require_intercepting(&self) -> ShellcacheResult<()> {
        let actual = self.state();
        if actual.can_intercept_fetch() {
            Ok(())
        } else {
            Err(ShellcacheError::InvalidState {
                expected: WorkerState::Activated.to_string(),
                actual: actual.to_string(),
            })
        }
    }
}
