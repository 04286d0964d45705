//! Install command - install the configured worker version

use super::Host;
use crate::config::Config;
use crate::error::ShellcacheResult;
use crate::net::{Fetcher, HttpFetcher, Request, Response};
use crate::ui::{self, Mark, PrecacheProgress, UiContext};
use async_trait::async_trait;
use std::sync::Arc;

/// Fetcher that advances the pre-cache bar as responses arrive
struct ProgressFetcher<F> {
    inner: F,
    progress: PrecacheProgress,
}

#[async_trait]
impl<F: Fetcher> Fetcher for ProgressFetcher<F> {
    async fn fetch(&self, request: &Request) -> ShellcacheResult<Response> {
        let result = self.inner.fetch(request).await;
        let status = result.as_ref().ok().map(|r| r.status);
        self.progress.on_fetched(request.url.as_str(), status);
        result
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Execute the install command
pub async fn execute(config: &Config, ephemeral: bool) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("Install {}", config.worker.generation));

    let progress = PrecacheProgress::new(
        &ctx,
        &config.worker.generation,
        config.worker.manifest.len(),
    );
    let fetcher = Arc::new(ProgressFetcher {
        inner: HttpFetcher::new(&config.network, config.origin_url()?),
        progress: progress.clone(),
    });

    let mut host = Host::open_with_fetcher(config, ephemeral, fetcher).await?;
    let result = host.registration.register(host.settings.clone()).await;
    progress.finish();
    let update = result?;

    ui::emit_all(&ctx, &ui::install_lines(&update.install));
    match &update.activation {
        Some(report) => ui::emit_all(&ctx, &ui::activation_lines(report)),
        None => {
            ui::step(
                &ctx,
                Mark::Warn,
                "Installed, waiting for the current worker to be released",
            );
            ui::remark(&ctx, "Run: shellcache activate");
        }
    }

    host.close().await?;

    let (mark, message) = ui::install_summary(&update.install);
    ui::outro(&ctx, mark, &message);
    Ok(())
}
