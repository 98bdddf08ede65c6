//! Session storage on top of a pluggable key/value backend.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::serialize::SessionSerializer;
use super::state::MenuSession;
use crate::Result;

/// Durable key/value persistence backend.
///
/// Implementations must treat values as opaque JSON documents. A missing key
/// reads as `None`; `delete` on a missing key is a no-op.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<Value>>;
    async fn write(&self, key: &str, value: Value) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Session store: key derivation aside, every state transition goes through
/// here.
pub struct SessionStore {
    adapter: Arc<dyn StorageAdapter>,
    serializer: Arc<dyn SessionSerializer>,
    history_limit: Option<usize>,
}

impl SessionStore {
    pub fn new(
        adapter: Arc<dyn StorageAdapter>,
        serializer: Arc<dyn SessionSerializer>,
        history_limit: Option<usize>,
    ) -> Self {
        Self {
            adapter,
            serializer,
            history_limit,
        }
    }

    /// Read the session stored under `key`.
    ///
    /// A missing key is not an error; it reads as an empty session.
    pub async fn read(&self, key: &str) -> Result<MenuSession> {
        match self.adapter.read(key).await? {
            Some(raw) => self.serializer.deserialize(raw),
            None => Ok(MenuSession::default()),
        }
    }

    /// Persist `session` under `key`, trimming history to the configured
    /// limit first. Trimming is silent: the oldest entries are dropped.
    pub async fn write(&self, key: &str, session: &mut MenuSession) -> Result<()> {
        self.enforce_history_limit(session);
        let stored = self.serializer.serialize(session)?;
        self.adapter.write(key, stored).await?;
        tracing::debug!(key, history = session.history.len(), "session written");
        Ok(())
    }

    /// Delete the record under `key` outright.
    pub async fn clear(&self, key: &str) -> Result<()> {
        self.adapter.delete(key).await?;
        tracing::debug!(key, "session cleared");
        Ok(())
    }

    /// Read-modify-write cycle: read, deep-clone into a draft, apply
    /// `mutator`, then delete the key if the draft became empty or write it
    /// back otherwise. Returns the draft and the mutator's result.
    ///
    /// There is no cross-call locking. Two concurrent `with_session` calls
    /// on the same key race read-to-write and the last write wins; the host
    /// pipeline is expected to serialize update processing per key.
    pub async fn with_session<R, F>(&self, key: &str, mutator: F) -> Result<(MenuSession, R)>
    where
        F: FnOnce(&mut MenuSession) -> R,
    {
        let session = self.read(key).await?;
        let mut draft = self.serializer.clone_session(&session)?;
        let result = mutator(&mut draft);
        if draft.is_empty() {
            self.adapter.delete(key).await?;
            tracing::debug!(key, "session emptied, record deleted");
        } else {
            self.write(key, &mut draft).await?;
        }
        Ok((draft, result))
    }

    fn enforce_history_limit(&self, session: &mut MenuSession) {
        let Some(limit) = self.history_limit else {
            return;
        };
        if limit == 0 {
            return;
        }
        let excess = session.history.len().saturating_sub(limit);
        if excess > 0 {
            session.history.drain(..excess);
        }
    }
}
