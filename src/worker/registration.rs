//! Registration: the host side of the worker lifecycle
//!
//! Holds at most one active and one waiting worker for a scope, runs their
//! handlers in order, and routes page fetches to whichever worker controls
//! the page.

use super::clients::in_scope;
use super::{
    ActivateReport, FetchOutcome, InstallReport, RegistrationRecord, Worker, WorkerContext,
    WorkerSettings, WorkerState,
};
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::net::Request;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Result of registering a new worker version
#[derive(Debug, Clone)]
pub struct UpdateReport {
    /// Install handler outcome
    pub install: InstallReport,
    /// Activation outcome, if the new version activated right away
    pub activation: Option<ActivateReport>,
}

/// Worker registration for one scope
pub struct Registration {
    scope: Url,
    ctx: WorkerContext,
    waiting: Option<Arc<Worker>>,
    active: Option<Arc<Worker>>,
}

impl Registration {
    /// Create an empty registration
    pub fn new(scope: Url, ctx: WorkerContext) -> Self {
        Self {
            scope,
            ctx,
            waiting: None,
            active: None,
        }
    }

    /// Rebuild a registration from its persisted record.
    ///
    /// Restored workers take their generation and state from the record and
    /// everything else from `settings`. Records in a transient state
    /// (installing, activating) or already redundant are dropped.
    pub fn restore(record: &RegistrationRecord, settings: &WorkerSettings, ctx: WorkerContext) -> Self {
        let mut registration = Self::new(settings.scope.clone(), ctx);

        registration.active = record
            .active
            .as_ref()
            .filter(|v| v.state == WorkerState::Activated)
            .map(|v| Arc::new(Worker::restore(settings.clone(), registration.ctx.clone(), v)));

        registration.waiting = record
            .waiting
            .as_ref()
            .filter(|v| v.state == WorkerState::Installed)
            .map(|v| Arc::new(Worker::restore(settings.clone(), registration.ctx.clone(), v)));

        registration
    }

    /// Scope controlled by this registration
    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// Shared collaborators
    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Worker currently controlling pages
    pub fn active(&self) -> Option<&Arc<Worker>> {
        self.active.as_ref()
    }

    /// Installed worker waiting to activate
    pub fn waiting(&self) -> Option<&Arc<Worker>> {
        self.waiting.as_ref()
    }

    /// Install a new worker version.
    ///
    /// The new worker replaces any waiting worker. It activates immediately
    /// when its install requested skip-waiting or when nothing is active yet;
    /// otherwise it stays waiting until [`Registration::activate_waiting`].
    /// A failed install leaves the registration unchanged.
    pub async fn register(&mut self, settings: WorkerSettings) -> ShellcacheResult<UpdateReport> {
        let worker = Arc::new(Worker::new(settings, self.ctx.clone()));
        info!("Installing worker {} ({})", worker.id(), worker.generation());

        let install = worker.install().await?;

        if let Some(previous) = self.waiting.replace(Arc::clone(&worker)) {
            debug!("Discarding waiting worker {}", previous.id());
            previous.make_redundant();
        }

        let activation = if worker.skip_waiting_requested() || self.active.is_none() {
            Some(self.activate_waiting().await?)
        } else {
            info!(
                "Worker {} installed and waiting for {} to be released",
                worker.id(),
                self.active
                    .as_ref()
                    .map(|a| a.generation().to_string())
                    .unwrap_or_default()
            );
            None
        };

        Ok(UpdateReport {
            install,
            activation,
        })
    }

    /// Promote the waiting worker to active.
    ///
    /// Background writes of the outgoing worker are awaited first so its
    /// generation is not written to after the purge.
    pub async fn activate_waiting(&mut self) -> ShellcacheResult<ActivateReport> {
        let next = self.waiting.take().ok_or(ShellcacheError::NoWaitingWorker)?;

        if let Some(previous) = self.active.take() {
            previous.settle().await;
            previous.make_redundant();
        }

        match next.activate().await {
            Ok(report) => {
                self.active = Some(next);
                Ok(report)
            }
            Err(e) => {
                next.make_redundant();
                Err(e)
            }
        }
    }

    /// Open a page. In-scope pages are controlled by the active worker.
    pub async fn open_client(&self, url: Url) -> Uuid {
        let controller = self
            .active
            .as_ref()
            .filter(|_| in_scope(&url, &self.scope))
            .map(|w| w.id());
        self.ctx.clients.open(url, controller).await
    }

    /// Close a page. Its later fetches are no longer controlled.
    pub async fn close_client(&self, client: Uuid) -> bool {
        self.ctx.clients.close(client).await
    }

    /// Route a fetch from a page.
    ///
    /// Requests from pages controlled by the active worker go through its
    /// fetch handler; anything else goes straight to the network.
    pub async fn dispatch_fetch(
        &self,
        client: Option<Uuid>,
        request: Request,
    ) -> ShellcacheResult<FetchOutcome> {
        let controller = match client {
            Some(id) => self.ctx.clients.get(id).await.and_then(|c| c.controller),
            None => None,
        };

        match &self.active {
            Some(active) if controller == Some(active.id()) => active.handle_fetch(request).await,
            _ => {
                debug!("Uncontrolled fetch {}", request.url);
                let response = self.ctx.fetcher.fetch(&request).await?;
                Ok(FetchOutcome::Network {
                    response,
                    stored: false,
                })
            }
        }
    }

    /// Wait for background writes of the active worker
    pub async fn settle(&self) {
        if let Some(active) = &self.active {
            active.settle().await;
        }
    }

    /// Snapshot for persistence
    pub fn record(&self) -> RegistrationRecord {
        let mut record = RegistrationRecord::new(self.scope.to_string());
        record.active = self.active.as_ref().map(|w| w.version_record());
        record.waiting = self.waiting.as_ref().map(|w| w.version_record());
        record
    }
}
