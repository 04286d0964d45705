//! Network access for the worker
//!
//! The worker only talks to the network through the [`Fetcher`] trait so the
//! host can swap in a real HTTP client or a test double.

use crate::config::schema::NetworkConfig;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::net::message::{Method, Request, Response, ResponseType};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use ureq::{Agent, ResponseExt};
use url::Url;

/// Abstract network interface
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue the request and return the full response.
    ///
    /// HTTP error statuses are responses, not errors. Only transport-level
    /// failures (DNS, refused connection, timeout) return `Err`.
    async fn fetch(&self, request: &Request) -> ShellcacheResult<Response>;

    /// Human-readable name for diagnostics
    fn name(&self) -> &'static str;
}

/// Blocking `ureq` client driven from the tokio blocking pool
#[derive(Clone)]
pub struct HttpFetcher {
    agent: Agent,
    origin: Url,
    max_body: u64,
}

impl HttpFetcher {
    /// Create a client for pages served from `origin`
    pub fn new(config: &NetworkConfig, origin: Url) -> Self {
        let mut builder = Agent::config_builder()
            .http_status_as_error(false)
            .user_agent(config.user_agent.clone());

        if config.timeout_secs > 0 {
            builder = builder.timeout_global(Some(Duration::from_secs(config.timeout_secs)));
        }

        let agent: Agent = builder.build().into();
        Self {
            agent,
            origin,
            max_body: config.max_body_bytes,
        }
    }

    fn fetch_blocking(
        agent: &Agent,
        request: &Request,
        origin: &Url,
        max_body: u64,
    ) -> ShellcacheResult<Response> {
        let url = request.url.as_str();

        let result = match request.method {
            Method::Post | Method::Put | Method::Patch => {
                let mut builder = match request.method {
                    Method::Put => agent.put(url),
                    Method::Patch => agent.patch(url),
                    _ => agent.post(url),
                };
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.send(&request.body[..])
            }
            Method::Get | Method::Head | Method::Delete | Method::Options => {
                let mut builder = match request.method {
                    Method::Head => agent.head(url),
                    Method::Delete => agent.delete(url),
                    Method::Options => agent.options(url),
                    _ => agent.get(url),
                };
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
        };

        let mut response = result.map_err(|e| ShellcacheError::network(url, e.to_string()))?;

        let final_url = Url::parse(&response.get_uri().to_string()).unwrap_or_else(|_| request.url.clone());
        let (response_type, redirected) = classify(&request.url, &final_url, origin);

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .body_mut()
            .with_config()
            .limit(max_body)
            .read_to_vec()
            .map_err(|e| ShellcacheError::network(url, format!("reading body: {}", e)))?;

        debug!(
            "{} {} -> {} ({}, {} bytes)",
            request.method,
            url,
            status,
            response_type,
            body.len()
        );

        let mut out = Response::new(status, body)
            .with_type(response_type)
            .with_redirected(redirected)
            .with_url(final_url);
        out.headers = headers;
        Ok(out)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> ShellcacheResult<Response> {
        let agent = self.agent.clone();
        let origin = self.origin.clone();
        let max_body = self.max_body;
        let request = request.clone();
        let url = request.url.to_string();

        tokio::task::spawn_blocking(move || Self::fetch_blocking(&agent, &request, &origin, max_body))
            .await
            .map_err(|e| ShellcacheError::network(url, format!("fetch task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Classify a response by where it was finally served from.
///
/// Returns the response type relative to `origin` and whether a redirect
/// moved it away from the requested URL.
pub fn classify(request_url: &Url, final_url: &Url, origin: &Url) -> (ResponseType, bool) {
    let mut requested = request_url.clone();
    requested.set_fragment(None);
    let mut served = final_url.clone();
    served.set_fragment(None);

    let redirected = requested != served;
    let response_type = if served.origin() == origin.origin() {
        ResponseType::Basic
    } else {
        ResponseType::Cors
    };

    (response_type, redirected)
}
