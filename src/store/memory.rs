//! In-memory cache store

use super::{check_storable, Cache, CacheStorage, StoredEntry};
use crate::error::ShellcacheResult;
use crate::net::{Request, RequestKey, Response};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A generation held in memory
pub struct MemoryCache {
    name: String,
    entries: RwLock<BTreeMap<RequestKey, (StoredEntry, Vec<u8>)>>,
}

impl MemoryCache {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> ShellcacheResult<Option<Response>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&request.key())
            .map(|(entry, body)| entry.to_response(body.clone())))
    }

    async fn put(&self, request: &Request, mut response: Response) -> ShellcacheResult<()> {
        check_storable(request, &response)?;
        let key = request.key();
        let entry = StoredEntry::from_response(key.clone(), &response);
        let body = response.take_body()?;

        self.entries.write().await.insert(key, (entry, body));
        Ok(())
    }

    async fn delete(&self, request: &Request) -> ShellcacheResult<bool> {
        Ok(self.entries.write().await.remove(&request.key()).is_some())
    }

    async fn keys(&self) -> ShellcacheResult<Vec<RequestKey>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

/// Store whose generations live for the life of the process
#[derive(Clone, Default)]
pub struct MemoryStorage {
    generations: Arc<RwLock<Vec<Arc<MemoryCache>>>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> ShellcacheResult<Arc<dyn Cache>> {
        let mut generations = self.generations.write().await;
        if let Some(existing) = generations.iter().find(|c| c.name == name) {
            return Ok(existing.clone());
        }

        let cache = Arc::new(MemoryCache::new(name));
        generations.push(cache.clone());
        Ok(cache)
    }

    async fn get(&self, name: &str) -> ShellcacheResult<Option<Arc<dyn Cache>>> {
        let generations = self.generations.read().await;
        Ok(generations
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.clone() as Arc<dyn Cache>))
    }

    async fn delete(&self, name: &str) -> ShellcacheResult<bool> {
        let mut generations = self.generations.write().await;
        let before = generations.len();
        generations.retain(|c| c.name != name);
        Ok(generations.len() != before)
    }

    async fn keys(&self) -> ShellcacheResult<Vec<String>> {
        let generations = self.generations.read().await;
        Ok(generations.iter().map(|c| c.name.clone()).collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
