//! Cache store: named generations of stored responses
//!
//! A store holds any number of named generations. Each generation maps a
//! request identity (method + URL) to a whole stored response. Writes are
//! additive (`put`) or generation-wide (`delete`); a stored entry is never
//! mutated in place.
//!
//! # Backends
//!
//! | Backend | Persistence | Use |
//! |---------|-------------|-----|
//! | memory | process lifetime | tests, `--ephemeral` |
//! | disk | directory tree | default CLI host |

mod disk;
mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

use crate::config::Config;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::net::{Fetcher, Method, Request, RequestKey, Response, ResponseType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// One named cache generation
#[async_trait]
pub trait Cache: Send + Sync {
    /// Generation name
    fn name(&self) -> &str;

    /// Find the stored response for this request identity
    async fn match_request(&self, request: &Request) -> ShellcacheResult<Option<Response>>;

    /// Store a response under the request identity, replacing any previous entry
    async fn put(&self, request: &Request, response: Response) -> ShellcacheResult<()>;

    /// Remove the entry for this request identity
    async fn delete(&self, request: &Request) -> ShellcacheResult<bool>;

    /// List stored request identities
    async fn keys(&self) -> ShellcacheResult<Vec<RequestKey>>;
}

/// The set of all generations
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a generation, creating it if absent
    async fn open(&self, name: &str) -> ShellcacheResult<Arc<dyn Cache>>;

    /// Get a generation without creating it
    async fn get(&self, name: &str) -> ShellcacheResult<Option<Arc<dyn Cache>>>;

    /// Whether a generation exists
    async fn has(&self, name: &str) -> ShellcacheResult<bool> {
        Ok(self.get(name).await?.is_some())
    }

    /// Delete a generation and all its entries. Returns false if absent.
    async fn delete(&self, name: &str) -> ShellcacheResult<bool>;

    /// Generation names in creation order
    async fn keys(&self) -> ShellcacheResult<Vec<String>>;

    /// Search every generation, oldest first, for a stored response
    async fn match_any(&self, request: &Request) -> ShellcacheResult<Option<Response>> {
        for name in self.keys().await? {
            if let Some(cache) = self.get(&name).await? {
                if let Some(response) = cache.match_request(request).await? {
                    return Ok(Some(response));
                }
            }
        }
        Ok(None)
    }

    /// Backend name for display
    fn backend(&self) -> &'static str;
}

/// Metadata persisted alongside a stored body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub key: RequestKey,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub response_type: ResponseType,
    #[serde(default)]
    pub redirected: bool,
    #[serde(default)]
    pub url: Option<String>,
    pub stored_at: DateTime<Utc>,
}

impl StoredEntry {
    /// Capture metadata for a response about to be stored
    pub fn from_response(key: RequestKey, response: &Response) -> Self {
        Self {
            key,
            status: response.status,
            headers: response.headers.clone(),
            response_type: response.response_type,
            redirected: response.redirected,
            url: response.url.as_ref().map(Url::to_string),
            stored_at: Utc::now(),
        }
    }

    /// Rebuild a fresh, readable response
    pub fn to_response(&self, body: Vec<u8>) -> Response {
        let mut response = Response::new(self.status, body)
            .with_type(self.response_type)
            .with_redirected(self.redirected);
        response.headers = self.headers.clone();
        response.url = self.url.as_deref().and_then(|u| Url::parse(u).ok());
        response
    }
}

/// Reject requests and responses a cache generation cannot hold
pub fn check_storable(request: &Request, response: &Response) -> ShellcacheResult<()> {
    let reason = if request.method != Method::Get {
        Some("only GET requests can be stored")
    } else if !request.is_http() {
        Some("URL scheme is not http or https")
    } else if response.status == 206 {
        Some("partial responses are not stored")
    } else if response.body().is_consumed() {
        Some("response body already consumed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ShellcacheError::Unstorable {
            method: request.method.to_string(),
            url: request.url.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Outcome of a bulk pre-cache
#[derive(Debug, Clone, Default)]
pub struct AddAllReport {
    /// URLs stored successfully
    pub stored: Vec<String>,
    /// URLs that failed, with the reason
    pub failures: Vec<(String, String)>,
}

/// Fetch every URL concurrently and store each 2xx response.
///
/// All-or-partial: successful entries stay stored even when others fail.
/// Any failure is reported as `ShellcacheError::Precache` after all URLs
/// have been attempted.
pub async fn add_all(
    cache: &dyn Cache,
    fetcher: &dyn Fetcher,
    urls: &[Url],
) -> ShellcacheResult<AddAllReport> {
    let fetches = urls.iter().map(|url| async move {
        let request = Request::get(url.clone());
        let outcome = match fetcher.fetch(&request).await {
            Ok(response) if response.is_ok() => cache.put(&request, response).await,
            Ok(response) => Err(ShellcacheError::network(
                url.as_str(),
                format!("bad status {}", response.status),
            )),
            Err(e) => Err(e),
        };
        (url.to_string(), outcome)
    });

    let mut report = AddAllReport::default();
    for (url, outcome) in join_all(fetches).await {
        match outcome {
            Ok(()) => {
                debug!("Pre-cached {}", url);
                report.stored.push(url);
            }
            Err(e) => {
                warn!("Failed to pre-cache {}: {}", url, e);
                report.failures.push((url, e.to_string()));
            }
        }
    }

    if report.failures.is_empty() {
        Ok(report)
    } else {
        Err(ShellcacheError::Precache {
            total: urls.len(),
            failures: report.failures,
        })
    }
}

/// Create the configured store backend
pub fn open_storage(config: &Config, ephemeral: bool) -> Arc<dyn CacheStorage> {
    if ephemeral || config.store.backend == "memory" {
        debug!("Using in-memory cache store");
        Arc::new(MemoryStorage::new())
    } else {
        let root = config.store_path();
        debug!("Using disk cache store at {}", root.display());
        Arc::new(DiskStorage::new(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storable_get_http() {
        let req = Request::parse(Method::Get, "https://app.test/").unwrap();
        assert!(check_storable(&req, &Response::new(200, b"ok".to_vec())).is_ok());
        // Error statuses can still be put explicitly
        assert!(check_storable(&req, &Response::new(500, vec![])).is_ok());
    }

    #[test]
    fn unstorable_post() {
        let req = Request::parse(Method::Post, "https://app.test/api").unwrap();
        let err = check_storable(&req, &Response::new(200, vec![])).unwrap_err();
        assert!(err.to_string().contains("only GET"));
    }

    #[test]
    fn unstorable_scheme() {
        let req = Request::parse(Method::Get, "data:text/plain,hello").unwrap();
        assert!(check_storable(&req, &Response::new(200, vec![])).is_err());
    }

    #[test]
    fn unstorable_partial() {
        let req = Request::parse(Method::Get, "https://app.test/video").unwrap();
        assert!(check_storable(&req, &Response::new(206, vec![])).is_err());
    }

    #[test]
    fn stored_entry_rebuilds_response() {
        let req = Request::parse(Method::Get, "https://app.test/a.css").unwrap();
        let fetched = Response::new(200, b"body".to_vec())
            .with_header("content-type", "text/css")
            .with_type(ResponseType::Cors);
        let entry = StoredEntry::from_response(req.key(), &fetched);

        let rebuilt = entry.to_response(b"body".to_vec());
        assert_eq!(rebuilt.status, 200);
        assert_eq!(rebuilt.response_type, ResponseType::Cors);
        assert_eq!(rebuilt.header("content-type"), Some("text/css"));
        assert_eq!(rebuilt.bytes().unwrap(), b"body");
    }
}
