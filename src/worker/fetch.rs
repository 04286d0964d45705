//! Fetch interceptor: bypass, cache-first, network fallback

use super::Worker;
use crate::error::ShellcacheResult;
use crate::net::{Method, Request, Response};
use std::sync::Arc;
use tracing::{debug, warn};

/// How an intercepted request was answered
#[derive(Debug)]
pub enum FetchOutcome {
    /// Live-data host, passed straight to the network
    Bypassed(Response),
    /// Served from a cache generation
    CacheHit(Response),
    /// Fetched from the network; `stored` is true when a copy was queued
    /// for the current generation
    Network { response: Response, stored: bool },
    /// Cache miss and the network failed
    Unavailable { reason: String },
}

impl FetchOutcome {
    /// Short label for the response source
    pub fn source(&self) -> &'static str {
        match self {
            Self::Bypassed(_) => "bypass",
            Self::CacheHit(_) => "cache",
            Self::Network { .. } => "network",
            Self::Unavailable { .. } => "unavailable",
        }
    }

    /// The response, if there is one
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Bypassed(r) | Self::CacheHit(r) => Some(r),
            Self::Network { response, .. } => Some(response),
            Self::Unavailable { .. } => None,
        }
    }

    /// Take the response, if there is one
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Bypassed(r) | Self::CacheHit(r) => Some(r),
            Self::Network { response, .. } => Some(response),
            Self::Unavailable { .. } => None,
        }
    }
}

impl Worker {
    /// Answer a request from a controlled page.
    ///
    /// Bypassed hosts go to the network and their errors propagate. Other
    /// requests are looked up in every generation; on a miss the network
    /// response is returned and, when it is a same-origin 200, a copy is
    /// written to this worker's generation in the background.
    pub async fn handle_fetch(&self, request: Request) -> ShellcacheResult<FetchOutcome> {
        self.require_intercepting()?;

        if self.settings.is_bypassed(&request) {
            debug!("Bypass {}", request.url);
            let response = self.ctx.fetcher.fetch(&request).await?;
            return Ok(FetchOutcome::Bypassed(response));
        }

        if let Some(hit) = self.ctx.storage.match_any(&request).await? {
            debug!("Cache hit {}", request.url);
            return Ok(FetchOutcome::CacheHit(hit));
        }

        debug!("Cache miss {}, fetching from network", request.url);
        let response = match self.ctx.fetcher.fetch(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Offline and not cached: {}: {}", request.url, e);
                return Ok(FetchOutcome::Unavailable {
                    reason: e.to_string(),
                });
            }
        };

        if !response.is_basic_success()
            || request.method != Method::Get
            || !request.is_http()
        {
            debug!(
                "Not caching {} (status {}, type {})",
                request.url, response.status, response.response_type
            );
            return Ok(FetchOutcome::Network {
                response,
                stored: false,
            });
        }

        let (response, copy) = response.tee()?;
        self.store_in_background(request, copy).await;
        Ok(FetchOutcome::Network {
            response,
            stored: true,
        })
    }

    async fn store_in_background(&self, request: Request, copy: Response) {
        let storage = Arc::clone(&self.ctx.storage);
        let generation = self.settings.generation.clone();

        let mut background = self.background.lock().await;
        while let Some(done) = background.try_join_next() {
            if let Err(e) = done {
                warn!("Background cache task failed: {}", e);
            }
        }

        background.spawn(async move {
            let result = match storage.open(&generation).await {
                Ok(cache) => cache.put(&request, copy).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => debug!("Cached {} into {}", request.url, generation),
                Err(e) => warn!("Failed to cache {}: {}", request.url, e),
            }
        });
    }
}
