//! Install handler: open the generation and pre-cache the manifest

use super::{Worker, WorkerState};
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::journal::events;
use crate::store::add_all;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

/// Result of one install
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Generation opened
    pub generation: String,
    /// Manifest entries attempted
    pub total: usize,
    /// URLs stored
    pub stored: Vec<String>,
    /// URLs that failed to pre-cache, with the reason
    pub failures: Vec<(String, String)>,
}

impl InstallReport {
    /// Whether every manifest entry was stored
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Worker {
    /// Run the install handler.
    ///
    /// Pre-cache failures are reported but do not fail the install; entries
    /// that were stored stay stored. Only a generation that cannot be opened
    /// fails the install, which leaves the worker redundant.
    pub async fn install(&self) -> ShellcacheResult<InstallReport> {
        self.transition(WorkerState::Installing)?;
        let generation = self.settings.generation.clone();
        info!("Installing {} ({})", generation, self.id);

        let cache = match self.ctx.storage.open(&generation).await {
            Ok(cache) => {
                info!("Opened cache {}", generation);
                cache
            }
            Err(e) => {
                warn!("Install of {} failed: {}", generation, e);
                self.make_redundant();
                return Err(e);
            }
        };

        let manifest = &self.settings.manifest;
        info!("Pre-caching {} entries into {}", manifest.len(), generation);

        let (stored, failures) =
            match add_all(cache.as_ref(), self.ctx.fetcher.as_ref(), manifest).await {
                Ok(report) => (report.stored, Vec::new()),
                Err(ShellcacheError::Precache { total, failures }) => {
                    warn!(
                        "Pre-cache incomplete: {} of {} entries failed",
                        failures.len(),
                        total
                    );
                    let stored = manifest
                        .iter()
                        .map(|u| u.to_string())
                        .filter(|u| !failures.iter().any(|(f, _)| f == u))
                        .collect();
                    (stored, failures)
                }
                Err(e) => {
                    self.make_redundant();
                    return Err(e);
                }
            };

        if self.settings.skip_waiting {
            self.skip_waiting.store(true, Ordering::SeqCst);
        }
        self.transition(WorkerState::Installed)?;

        let report = InstallReport {
            generation,
            total: manifest.len(),
            stored,
            failures,
        };

        self.ctx
            .journal
            .record(
                events::INSTALL_COMPLETED,
                &serde_json::json!({
                    "worker": self.id.to_string(),
                    "generation": report.generation,
                    "total": report.total,
                    "stored": report.stored.len(),
                    "failed": report.failures.len(),
                }),
            )
            .await;

        Ok(report)
    }
}
