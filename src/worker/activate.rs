//! Activate handler: purge stale generations and claim open pages

use super::{Worker, WorkerState};
use crate::error::ShellcacheResult;
use crate::journal::events;
use futures_util::future::join_all;
use tracing::{info, warn};

/// Result of one activation
#[derive(Debug, Clone, Default)]
pub struct ActivateReport {
    /// Generation that remains
    pub generation: String,
    /// Stale generations deleted
    pub deleted: Vec<String>,
    /// Stale generations that could not be deleted, with the reason
    pub failed: Vec<(String, String)>,
    /// Pages that switched to this worker
    pub claimed: usize,
}

impl Worker {
    /// Run the activate handler.
    ///
    /// Deletes every generation other than this worker's and claims all
    /// in-scope pages, concurrently. Store errors during the purge are
    /// logged and reported; activation itself still completes.
    pub async fn activate(&self) -> ShellcacheResult<ActivateReport> {
        self.transition(WorkerState::Activating)?;
        info!("Activating {} ({})", self.settings.generation, self.id);

        let ((deleted, failed), claimed) = tokio::join!(
            self.purge_stale_generations(),
            self.ctx.clients.claim(self.id, &self.settings.scope),
        );

        self.transition(WorkerState::Activated)?;
        info!(
            "Activated {} (purged {}, claimed {})",
            self.settings.generation,
            deleted.len(),
            claimed
        );

        let report = ActivateReport {
            generation: self.settings.generation.clone(),
            deleted,
            failed,
            claimed,
        };

        self.ctx
            .journal
            .record(
                events::ACTIVATE_COMPLETED,
                &serde_json::json!({
                    "worker": self.id.to_string(),
                    "generation": report.generation,
                    "deleted": report.deleted,
                    "claimed": report.claimed,
                }),
            )
            .await;

        Ok(report)
    }

    async fn purge_stale_generations(&self) -> (Vec<String>, Vec<(String, String)>) {
        let current = self.settings.generation.as_str();
        let names = match self.ctx.storage.keys().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Could not list cache generations: {}", e);
                return (Vec::new(), Vec::new());
            }
        };

        let deletions = names
            .into_iter()
            .filter(|name| name != current)
            .map(|name| async move {
                let result = self.ctx.storage.delete(&name).await;
                (name, result)
            });

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in join_all(deletions).await {
            match result {
                Ok(_) => {
                    info!("Deleting old cache: {}", name);
                    self.ctx
                        .journal
                        .record(
                            events::GENERATION_DELETED,
                            &serde_json::json!({ "generation": name }),
                        )
                        .await;
                    deleted.push(name);
                }
                Err(e) => {
                    warn!("Failed to delete cache {}: {}", name, e);
                    self.ctx
                        .journal
                        .record(
                            events::GENERATION_DELETE_FAILED,
                            &serde_json::json!({ "generation": name, "reason": e.to_string() }),
                        )
                        .await;
                    failed.push((name, e.to_string()));
                }
            }
        }
        (deleted, failed)
    }
}
