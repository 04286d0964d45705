//! Directory-backed cache store
//!
//! ```text
//! <root>/
//!   generations.json          # [{name, dir, created_at}] in creation order
//!   <dir>/
//!     <sha256(identity)>.json # StoredEntry
//!     <sha256(identity)>.body # raw body bytes
//! ```
//!
//! The `.json` file is written last and is what marks an entry as present,
//! so a crash mid-put leaves at most an orphaned `.body`.

use super::{check_storable, Cache, CacheStorage, StoredEntry};
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::net::{Request, RequestKey, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

const INDEX_FILE: &str = "generations.json";

/// Hash used for entry file names and generation directories
fn digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Write via a temp file and rename so readers never see a partial file
async fn write_atomic(path: &Path, content: &[u8]) -> ShellcacheResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content)
        .await
        .map_err(|e| ShellcacheError::io(format!("writing {}", tmp.display()), e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| ShellcacheError::io(format!("renaming into {}", path.display()), e))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenerationRecord {
    name: String,
    dir: String,
    created_at: DateTime<Utc>,
}

/// A generation stored as a directory
pub struct DiskCache {
    name: String,
    dir: PathBuf,
}

impl DiskCache {
    fn entry_paths(&self, key: &RequestKey) -> (PathBuf, PathBuf) {
        let hash = digest(&key.to_string());
        (
            self.dir.join(format!("{}.json", hash)),
            self.dir.join(format!("{}.body", hash)),
        )
    }

    async fn read_entry(path: &Path) -> ShellcacheResult<StoredEntry> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ShellcacheError::io(format!("reading {}", path.display()), e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl Cache for DiskCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> ShellcacheResult<Option<Response>> {
        let key = request.key();
        let (meta_path, body_path) = self.entry_paths(&key);

        if !meta_path.exists() {
            return Ok(None);
        }

        let entry = Self::read_entry(&meta_path).await?;
        if entry.key != key {
            // Hash collision: treat as a miss rather than serve the wrong body
            warn!("Entry {} does not match {}", meta_path.display(), key);
            return Ok(None);
        }

        let body = fs::read(&body_path)
            .await
            .map_err(|e| ShellcacheError::io(format!("reading {}", body_path.display()), e))?;

        Ok(Some(entry.to_response(body)))
    }

    async fn put(&self, request: &Request, mut response: Response) -> ShellcacheResult<()> {
        check_storable(request, &response)?;

        if !self.dir.exists() {
            return Err(ShellcacheError::GenerationNotFound(self.name.clone()));
        }

        let key = request.key();
        let (meta_path, body_path) = self.entry_paths(&key);
        let entry = StoredEntry::from_response(key, &response);
        let body = response.take_body()?;

        write_atomic(&body_path, &body).await?;
        write_atomic(&meta_path, serde_json::to_string_pretty(&entry)?.as_bytes()).await?;

        debug!("Stored {} in {}", entry.key, self.name);
        Ok(())
    }

    async fn delete(&self, request: &Request) -> ShellcacheResult<bool> {
        let (meta_path, body_path) = self.entry_paths(&request.key());
        if !meta_path.exists() {
            return Ok(false);
        }

        fs::remove_file(&meta_path)
            .await
            .map_err(|e| ShellcacheError::io(format!("removing {}", meta_path.display()), e))?;
        // Body without metadata is invisible anyway
        let _ = fs::remove_file(&body_path).await;
        Ok(true)
    }

    async fn keys(&self) -> ShellcacheResult<Vec<RequestKey>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut keys = vec![];
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| ShellcacheError::io(format!("reading {}", self.dir.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ShellcacheError::io("reading generation entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match Self::read_entry(&path).await {
                    Ok(stored) => keys.push(stored.key),
                    Err(e) => warn!("Skipping unreadable entry {}: {}", path.display(), e),
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Store persisted under a root directory
pub struct DiskStorage {
    root: PathBuf,
    index_lock: Mutex<()>,
}

impl DiskStorage {
    /// Create a store rooted at `root` (created lazily)
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            index_lock: Mutex::new(()),
        }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn load_index(&self) -> ShellcacheResult<Vec<GenerationRecord>> {
        let path = self.root.join(INDEX_FILE);
        if !path.exists() {
            return Ok(vec![]);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| ShellcacheError::io(format!("reading {}", path.display()), e))?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save_index(&self, index: &[GenerationRecord]) -> ShellcacheResult<()> {
        let path = self.root.join(INDEX_FILE);
        write_atomic(&path, serde_json::to_string_pretty(index)?.as_bytes()).await
    }

    fn cache_for(&self, record: &GenerationRecord) -> Arc<dyn Cache> {
        Arc::new(DiskCache {
            name: record.name.clone(),
            dir: self.root.join(&record.dir),
        })
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> ShellcacheResult<Arc<dyn Cache>> {
        let _guard = self.index_lock.lock().await;

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ShellcacheError::store_open(name, e.to_string()))?;

        let mut index = self.load_index().await?;
        if let Some(record) = index.iter().find(|r| r.name == name) {
            return Ok(self.cache_for(record));
        }

        let record = GenerationRecord {
            name: name.to_string(),
            dir: format!("gen-{}", &digest(name)[..16]),
            created_at: Utc::now(),
        };
        fs::create_dir_all(self.root.join(&record.dir))
            .await
            .map_err(|e| ShellcacheError::store_open(name, e.to_string()))?;

        index.push(record.clone());
        self.save_index(&index).await?;

        debug!("Created generation {} at {}", name, record.dir);
        Ok(self.cache_for(&record))
    }

    async fn get(&self, name: &str) -> ShellcacheResult<Option<Arc<dyn Cache>>> {
        let index = self.load_index().await?;
        Ok(index
            .iter()
            .find(|r| r.name == name)
            .map(|r| self.cache_for(r)))
    }

    async fn delete(&self, name: &str) -> ShellcacheResult<bool> {
        let _guard = self.index_lock.lock().await;

        let mut index = self.load_index().await?;
        let Some(pos) = index.iter().position(|r| r.name == name) else {
            return Ok(false);
        };

        let record = index.remove(pos);
        let dir = self.root.join(&record.dir);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .await
                .map_err(|e| ShellcacheError::io(format!("removing {}", dir.display()), e))?;
        }

        self.save_index(&index).await?;
        Ok(true)
    }

    async fn keys(&self) -> ShellcacheResult<Vec<String>> {
        Ok(self
            .load_index()
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect())
    }

    fn backend(&self) -> &'static str {
        "disk"
    }
}
