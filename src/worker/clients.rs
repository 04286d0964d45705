//! Open pages and which worker controls them

use std::collections::HashMap;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

/// An open page
#[derive(Debug, Clone)]
pub struct Client {
    pub id: Uuid,
    pub url: Url,
    /// Worker currently intercepting this page's fetches
    pub controller: Option<Uuid>,
}

/// Whether `url` falls under `scope`
pub fn in_scope(url: &Url, scope: &Url) -> bool {
    url.as_str().starts_with(scope.as_str())
}

/// Registry of open pages shared by the host and its workers
#[derive(Debug, Default)]
pub struct Clients {
    inner: RwLock<HashMap<Uuid, Client>>,
}

impl Clients {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened page
    pub async fn open(&self, url: Url, controller: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.write().await.insert(
            id,
            Client {
                id,
                url,
                controller,
            },
        );
        id
    }

    /// Forget a closed page
    pub async fn close(&self, id: Uuid) -> bool {
        self.inner.write().await.remove(&id).is_some()
    }

    /// Look up a page
    pub async fn get(&self, id: Uuid) -> Option<Client> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Take control of every in-scope page. Returns how many changed controller.
    pub async fn claim(&self, worker: Uuid, scope: &Url) -> usize {
        let mut clients = self.inner.write().await;
        let mut claimed = 0;
        for client in clients.values_mut() {
            if in_scope(&client.url, scope) && client.controller != Some(worker) {
                client.controller = Some(worker);
                claimed += 1;
            }
        }
        claimed
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn scope_prefix_match() {
        let scope = url("https://app.test/finance/");
        assert!(in_scope(&url("https://app.test/finance/index.html"), &scope));
        assert!(!in_scope(&url("https://app.test/other/"), &scope));
        assert!(!in_scope(&url("https://evil.test/finance/"), &scope));
    }

    #[tokio::test]
    async fn claim_takes_in_scope_pages_only() {
        let clients = Clients::new();
        let old_worker = Uuid::new_v4();
        let new_worker = Uuid::new_v4();

        let a = clients.open(url("https://app.test/"), Some(old_worker)).await;
        let b = clients.open(url("https://app.test/index.html"), None).await;
        let c = clients.open(url("https://elsewhere.test/"), None).await;

        let claimed = clients.claim(new_worker, &url("https://app.test/")).await;

        assert_eq!(claimed, 2);
        assert_eq!(clients.get(a).await.unwrap().controller, Some(new_worker));
        assert_eq!(clients.get(b).await.unwrap().controller, Some(new_worker));
        assert_eq!(clients.get(c).await.unwrap().controller, None);
    }

    #[tokio::test]
    async fn close_forgets_page() {
        let clients = Clients::new();
        let id = clients.open(url("https://app.test/"), None).await;
        assert!(clients.close(id).await);
        assert!(clients.get(id).await.is_none());
        assert!(!clients.close(id).await);
        assert_eq!(clients.claim(Uuid::new_v4(), &url("https://app.test/")).await, 0);
    }
}
