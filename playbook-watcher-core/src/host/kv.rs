use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::KvStore;
use crate::error::{WatcherError, WatcherResult};

/// Reads `key` and decodes it as JSON.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> WatcherResult<Option<T>> {
    match store.get(key).await? {
        Some(bytes) if !bytes.is_empty() => Ok(Some(serde_json::from_slice(&bytes)?)),
        _ => Ok(None),
    }
}

/// Encodes `value` as JSON and stores it under `key`.
pub async fn set_json<T: Serialize + Sync>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
) -> WatcherResult<()> {
    let bytes = serde_json::to_vec(value)?;
    store.set(key, bytes).await
}

#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> WatcherResult<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| WatcherError::internal("kv store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> WatcherResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| WatcherError::internal("kv store lock poisoned"))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Key-value store persisted as a single JSON object on disk.
///
/// Values must be UTF-8. Every `set` rewrites the file through a temporary
/// sibling and a rename, so a crash never leaves a half-written store.
pub struct FileKvStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileKvStore {
    pub async fn open(path: impl Into<PathBuf>) -> WatcherResult<Self> {
        let path = path.into();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "kv store file does not exist yet");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), keys = entries.len(), "Opened kv store");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> WatcherResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> WatcherResult<Option<Vec<u8>>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).map(|v| v.as_bytes().to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> WatcherResult<()> {
        let value = String::from_utf8(value).map_err(|e| {
            WatcherError::SerializationError(format!("kv value for '{}' is not UTF-8: {}", key, e))
        })?;

        let mut entries = self.entries.lock().await;
        let previous = entries.insert(key.to_string(), value);

        if let Err(e) = self.persist(&entries).await {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }

        debug!(key = key, "Persisted kv entry");
        Ok(())
    }
}
