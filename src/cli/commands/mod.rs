//! CLI command implementations
//!
//! Each invocation rebuilds the registration from `registration.json`, runs
//! one step of the lifecycle and writes the record back, so a sequence of
//! commands observes a single worker lifecycle.

pub mod activate;
pub mod cache;
pub mod completions;
pub mod config;
pub mod fetch;
pub mod install;
pub mod status;

pub use activate::execute as activate;
pub use cache::execute as cache;
pub use completions::execute as completions;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use install::execute as install;
pub use status::execute as status;

use crate::config::Config;
use crate::error::ShellcacheResult;
use crate::journal::Journal;
use crate::net::{Fetcher, HttpFetcher};
use crate::store::open_storage;
use crate::worker::{Registration, RegistrationRecord, WorkerContext, WorkerSettings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// The registration plus where to persist it
pub struct Host {
    pub registration: Registration,
    pub settings: WorkerSettings,
    record_path: Option<PathBuf>,
}

impl Host {
    /// Open the configured store with the HTTP fetcher
    pub async fn open(config: &Config, ephemeral: bool) -> ShellcacheResult<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.network, config.origin_url()?));
        Self::open_with_fetcher(config, ephemeral, fetcher).await
    }

    /// Open the configured store with a custom fetcher
    pub async fn open_with_fetcher(
        config: &Config,
        ephemeral: bool,
        fetcher: Arc<dyn Fetcher>,
    ) -> ShellcacheResult<Self> {
        let settings = WorkerSettings::from_config(config)?;
        let storage = open_storage(config, ephemeral);
        let journal = if ephemeral {
            Journal::disabled()
        } else {
            Journal::new(config)
        };
        let ctx = WorkerContext::new(storage, fetcher, journal);

        // An ephemeral store starts empty, so a saved lifecycle would lie about it
        let record_path = (!ephemeral).then(|| config.registration_path());
        let record = match &record_path {
            Some(path) => RegistrationRecord::load(path).await?,
            None => None,
        };

        let registration = match record {
            Some(record) => {
                debug!("Restoring registration for {}", record.scope);
                Registration::restore(&record, &settings, ctx)
            }
            None => Registration::new(settings.scope.clone(), ctx),
        };

        Ok(Self {
            registration,
            settings,
            record_path,
        })
    }

    /// Wait for background writes and persist the registration
    pub async fn close(self) -> ShellcacheResult<()> {
        self.registration.settle().await;
        if let Some(path) = &self.record_path {
            self.registration.record().save(path).await?;
        }
        Ok(())
    }
}
