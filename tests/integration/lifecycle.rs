//! Worker lifecycle properties, run against every store backend

use async_trait::async_trait;
use shellcache::journal::Journal;
use shellcache::net::{Fetcher, Method, Request, Response, ResponseType};
use shellcache::store::{CacheStorage, DiskStorage, MemoryStorage};
use shellcache::worker::{FetchOutcome, Registration, WorkerContext, WorkerSettings};
use shellcache::{ShellcacheError, ShellcacheResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;

const SCOPE: &str = "http://app.test/";

/// Fake network: same-origin assets on app.test, libraries on cdn.test,
/// live data on api.test. Counts every request.
#[derive(Default)]
struct Network {
    calls: Mutex<HashMap<String, usize>>,
    offline: AtomicBool,
}

impl Network {
    fn total(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Fetcher for Network {
    async fn fetch(&self, request: &Request) -> ShellcacheResult<Response> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(request.url.to_string())
            .or_default() += 1;

        if self.offline.load(Ordering::SeqCst) {
            return Err(ShellcacheError::network(request.url.as_str(), "offline"));
        }

        let body = format!("body of {}", request.url).into_bytes();
        let response = match (request.url.host_str(), request.url.path()) {
            (Some("app.test"), "/missing.js") => Response::new(404, b"not found".to_vec()),
            (Some("app.test"), "/moved") => Response::new(200, body).with_redirected(true),
            (Some("app.test"), _) => Response::new(200, body),
            _ => Response::new(200, body).with_type(ResponseType::Cors),
        };
        Ok(response.with_header("content-type", "text/plain"))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Both store backends; the temp dir keeps the disk store alive
fn backends() -> Vec<(Arc<dyn CacheStorage>, Option<TempDir>)> {
    let dir = TempDir::new().unwrap();
    let disk: Arc<dyn CacheStorage> = Arc::new(DiskStorage::new(dir.path().join("store")));
    vec![
        (Arc::new(MemoryStorage::new()), None),
        (disk, Some(dir)),
    ]
}

fn settings(generation: &str, manifest: &[&str]) -> WorkerSettings {
    let scope = Url::parse(SCOPE).unwrap();
    WorkerSettings {
        generation: generation.to_string(),
        manifest: manifest.iter().map(|m| scope.join(m).unwrap()).collect(),
        scope,
        bypass_hosts: vec!["api.test".to_string()],
        skip_waiting: true,
    }
}

const MANIFEST: &[&str] = &["./", "./index.html", "./app.js", "https://cdn.test/react.js"];

fn registration(storage: &Arc<dyn CacheStorage>, network: &Arc<Network>) -> Registration {
    let ctx = WorkerContext::new(storage.clone(), network.clone(), Journal::disabled());
    Registration::new(Url::parse(SCOPE).unwrap(), ctx)
}

fn get(url: &str) -> Request {
    Request::parse(Method::Get, url).unwrap()
}

async fn entry_count(storage: &Arc<dyn CacheStorage>) -> usize {
    let mut total = 0;
    for name in storage.keys().await.unwrap() {
        total += storage.get(&name).await.unwrap().unwrap().keys().await.unwrap().len();
    }
    total
}

async fn page(reg: &Registration) -> uuid::Uuid {
    reg.open_client(Url::parse(SCOPE).unwrap()).await
}

#[tokio::test]
async fn reinstall_same_generation_is_idempotent() {
    for (storage, _dir) in backends() {
        let network = Arc::new(Network::default());
        let mut reg = registration(&storage, &network);

        reg.register(settings("finance-tracker-v4", MANIFEST)).await.unwrap();
        let first = entry_count(&storage).await;
        reg.register(settings("finance-tracker-v4", MANIFEST)).await.unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["finance-tracker-v4"]);
        assert_eq!(entry_count(&storage).await, first);
        assert_eq!(first, MANIFEST.len());
    }
}

#[tokio::test]
async fn activation_leaves_only_current_generation() {
    for (storage, _dir) in backends() {
        let network = Arc::new(Network::default());
        storage.open("finance-tracker-v2").await.unwrap();
        let mut reg = registration(&storage, &network);

        reg.register(settings("finance-tracker-v3", MANIFEST)).await.unwrap();
        let update = reg.register(settings("finance-tracker-v4", MANIFEST)).await.unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["finance-tracker-v4"]);
        assert_eq!(
            update.activation.unwrap().deleted,
            vec!["finance-tracker-v3".to_string()]
        );
    }
}

#[tokio::test]
async fn bypassed_hosts_never_touch_the_store() {
    for (storage, _dir) in backends() {
        let network = Arc::new(Network::default());
        let mut reg = registration(&storage, &network);
        reg.register(settings("finance-tracker-v4", MANIFEST)).await.unwrap();
        let client = page(&reg).await;
        let before = entry_count(&storage).await;
        let url = "https://api.test/v1/documents/expenses";

        for _ in 0..3 {
            let outcome = reg.dispatch_fetch(Some(client), get(url)).await.unwrap();
            assert!(matches!(outcome, FetchOutcome::Bypassed(_)));
        }
        reg.settle().await;

        assert_eq!(network.calls_to(url), 3);
        assert_eq!(entry_count(&storage).await, before);
        assert!(storage.match_any(&get(url)).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn bypass_ignores_a_stored_copy_of_the_api_url() {
    for (storage, _dir) in backends() {
        let network = Arc::new(Network::default());
        let mut reg = registration(&storage, &network);
        reg.register(settings("finance-tracker-v4", MANIFEST)).await.unwrap();
        let client = page(&reg).await;
        let url = "https://api.test/v1/documents/budget";

        let cache = storage.open("finance-tracker-v4").await.unwrap();
        cache
            .put(&get(url), Response::new(200, b"stale budget".to_vec()))
            .await
            .unwrap();

        let outcome = reg.dispatch_fetch(Some(client), get(url)).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Bypassed(_)));
        assert_eq!(network.calls_to(url), 1);
        assert_eq!(
            outcome.into_response().unwrap().text().unwrap(),
            format!("body of {}", url)
        );
    }
}

#[tokio::test]
async fn cached_entries_skip_the_network() {
    for (storage, _dir) in backends() {
        let network = Arc::new(Network::default());
        let mut reg = registration(&storage, &network);
        reg.register(settings("finance-tracker-v4", MANIFEST)).await.unwrap();
        let client = page(&reg).await;
        network.reset();

        for entry in MANIFEST {
            let url = Url::parse(SCOPE).unwrap().join(entry).unwrap();
            let outcome = reg
                .dispatch_fetch(Some(client), get(url.as_str()))
                .await
                .unwrap();
            assert_eq!(outcome.source(), "cache", "{}", url);
            assert_eq!(
                outcome.into_response().unwrap().text().unwrap(),
                format!("body of {}", url)
            );
        }

        assert_eq!(network.total(), 0);
    }
}

#[tokio::test]
async fn miss_populates_current_generation() {
    for (storage, _dir) in backends() {
        let network = Arc::new(Network::default());
        let mut reg = registration(&storage, &network);
        reg.register(settings("finance-tracker-v4", MANIFEST)).await.unwrap();
        let client = page(&reg).await;
        let url = "http://app.test/icons/wallet.svg";

        let outcome = reg.dispatch_fetch(Some(client), get(url)).await.unwrap();
        let returned = outcome.into_response().unwrap().bytes().unwrap();
        reg.settle().await;

        let cache = storage.get("finance-tracker-v4").await.unwrap().unwrap();
        let stored = cache.match_request(&get(url)).await.unwrap().unwrap();
        assert_eq!(stored.status, 200);
        assert_eq!(stored.header("content-type"), Some("text/plain"));
        assert_eq!(stored.bytes().unwrap(), returned);

        network.reset();
        let again = reg.dispatch_fetch(Some(client), get(url)).await.unwrap();
        assert_eq!(again.source(), "cache");
        assert_eq!(network.total(), 0);
    }
}

#[tokio::test]
async fn partial_precache_failure_keeps_the_rest() {
    for (storage, _dir) in backends() {
        let network = Arc::new(Network::default());
        let mut reg = registration(&storage, &network);
        let manifest = ["./index.html", "./missing.js", "./app.js"];

        let update = reg.register(settings("finance-tracker-v4", &manifest)).await.unwrap();

        assert_eq!(update.install.stored.len(), 2);
        assert_eq!(update.install.failures.len(), 1);
        assert!(update.install.failures[0].0.ends_with("/missing.js"));
        assert!(update.activation.is_some());

        let cache = storage.get("finance-tracker-v4").await.unwrap().unwrap();
        assert!(cache.match_request(&get("http://app.test/index.html")).await.unwrap().is_some());
        assert!(cache.match_request(&get("http://app.test/app.js")).await.unwrap().is_some());
        assert!(cache.match_request(&get("http://app.test/missing.js")).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn returned_and_stored_copies_are_both_readable() {
    for (storage, _dir) in backends() {
        let network = Arc::new(Network::default());
        let mut reg = registration(&storage, &network);
        reg.register(settings("finance-tracker-v4", &[])).await.unwrap();
        let client = page(&reg).await;
        let url = "http://app.test/report.csv";

        let outcome = reg.dispatch_fetch(Some(client), get(url)).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Network { stored: true, .. }));
        let returned = outcome.into_response().unwrap().text().unwrap();
        reg.settle().await;

        let stored = storage.match_any(&get(url)).await.unwrap().unwrap();
        assert_eq!(stored.text().unwrap(), returned);
        assert_eq!(returned, format!("body of {}", url));
    }
}

/// CDN libraries are stored at install but a cross-origin runtime miss is
/// never stored. This mirrors the deployed worker and is intentional.
#[tokio::test]
async fn cdn_asymmetry_between_install_and_runtime() {
    for (storage, _dir) in backends() {
        let network = Arc::new(Network::default());
        let mut reg = registration(&storage, &network);
        reg.register(settings("finance-tracker-v4", MANIFEST)).await.unwrap();
        let client = page(&reg).await;
        network.reset();

        let precached = "https://cdn.test/react.js";
        let outcome = reg.dispatch_fetch(Some(client), get(precached)).await.unwrap();
        assert_eq!(outcome.source(), "cache");

        let runtime = "https://cdn.test/react-dom.js";
        for _ in 0..2 {
            let outcome = reg.dispatch_fetch(Some(client), get(runtime)).await.unwrap();
            assert!(matches!(outcome, FetchOutcome::Network { stored: false, .. }));
        }
        reg.settle().await;

        assert_eq!(network.calls_to(precached), 0);
        assert_eq!(network.calls_to(runtime), 2);
        assert!(storage.match_any(&get(runtime)).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn redirected_and_error_responses_are_not_stored() {
    for (storage, _dir) in backends() {
        let network = Arc::new(Network::default());
        let mut reg = registration(&storage, &network);
        reg.register(settings("finance-tracker-v4", &[])).await.unwrap();
        let client = page(&reg).await;

        for url in ["http://app.test/moved", "http://app.test/missing.js"] {
            let outcome = reg.dispatch_fetch(Some(client), get(url)).await.unwrap();
            assert!(matches!(outcome, FetchOutcome::Network { stored: false, .. }));
        }
        reg.settle().await;

        assert_eq!(entry_count(&storage).await, 0);
    }
}

#[tokio::test]
async fn offline_serves_cache_and_reports_misses() {
    for (storage, _dir) in backends() {
        let network = Arc::new(Network::default());
        let mut reg = registration(&storage, &network);
        reg.register(settings("finance-tracker-v4", MANIFEST)).await.unwrap();
        let client = page(&reg).await;
        network.offline.store(true, Ordering::SeqCst);

        let hit = reg
            .dispatch_fetch(Some(client), get("http://app.test/index.html"))
            .await
            .unwrap();
        assert_eq!(hit.source(), "cache");

        let miss = reg
            .dispatch_fetch(Some(client), get("http://app.test/new-page.html"))
            .await
            .unwrap();
        assert!(matches!(miss, FetchOutcome::Unavailable { .. }));

        let api = reg
            .dispatch_fetch(Some(client), get("https://api.test/v1/documents"))
            .await;
        assert!(matches!(api, Err(ShellcacheError::Network { .. })));
    }
}

#[tokio::test]
async fn disk_registration_survives_restart() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("store");
    let record_path = dir.path().join("registration.json");
    let network = Arc::new(Network::default());

    {
        let storage: Arc<dyn CacheStorage> = Arc::new(DiskStorage::new(root.clone()));
        let mut reg = registration(&storage, &network);
        reg.register(settings("finance-tracker-v4", MANIFEST)).await.unwrap();
        reg.record().save(&record_path).await.unwrap();
    }

    network.reset();
    let storage: Arc<dyn CacheStorage> = Arc::new(DiskStorage::new(root));
    let ctx = WorkerContext::new(storage, network.clone(), Journal::disabled());
    let record = shellcache::worker::RegistrationRecord::load(&record_path)
        .await
        .unwrap()
        .unwrap();
    let reg = Registration::restore(&record, &settings("finance-tracker-v4", MANIFEST), ctx);
    let client = page(&reg).await;

    let outcome = reg
        .dispatch_fetch(Some(client), get("http://app.test/app.js"))
        .await
        .unwrap();
    assert_eq!(outcome.source(), "cache");
    assert_eq!(network.total(), 0);
}
