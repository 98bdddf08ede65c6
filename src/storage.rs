//! Bundled storage adapters.
//!
//! Hosts with their own database plug in a [`StorageAdapter`] of their own;
//! these two cover tests, examples, and small single-process bots.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::MenuFlowError;
use crate::session::StorageAdapter;
use crate::Result;

/// In-memory adapter. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.lock().map_err(|_| MenuFlowError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| MenuFlowError::LockPoisoned)?;
        entries.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| MenuFlowError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// File-backed adapter: one JSON document holding the whole key→value map,
/// loaded at open and rewritten after every mutation.
pub struct JsonFileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, Value>>,
}

impl JsonFileStorage {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(MenuFlowError::storage)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "file storage opened");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: HashMap<String, Value>) -> Result<()> {
        let raw = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(MenuFlowError::storage)
    }
}

#[async_trait]
impl StorageAdapter for JsonFileStorage {
    async fn read(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.lock().map_err(|_| MenuFlowError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<()> {
        // Snapshot under the lock; the write itself happens without it.
        let snapshot = {
            let mut entries = self.entries.lock().map_err(|_| MenuFlowError::LockPoisoned)?;
            entries.insert(key.to_owned(), value);
            entries.clone()
        };
        self.persist(snapshot).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let snapshot = {
            let mut entries = self.entries.lock().map_err(|_| MenuFlowError::LockPoisoned)?;
            if entries.remove(key).is_none() {
                return Ok(());
            }
            entries.clone()
        };
        self.persist(snapshot).await
    }
}
