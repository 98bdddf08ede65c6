//! Segmentation key derivation.
//!
//! One session exists per segmentation key. The default derivation keys on
//! chat, thread, and actor, so the same user gets independent menu stacks in
//! different chats and topics.

use std::sync::Arc;

use crate::error::MenuFlowError;
use crate::Result;

/// The chat coordinates one inbound update carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpdateScope {
    pub chat_id: i64,
    pub thread_id: Option<i64>,
    pub actor_id: Option<i64>,
}

impl UpdateScope {
    pub fn chat(chat_id: i64) -> Self {
        Self {
            chat_id,
            thread_id: None,
            actor_id: None,
        }
    }

    pub fn with_thread(mut self, thread_id: i64) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    pub fn with_actor(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Build a scope from optional update fields.
    ///
    /// Updates without a chat (polls, channel service events) cannot own a
    /// menu session; those yield [`MenuFlowError::MissingChatContext`].
    pub fn from_update(
        chat_id: Option<i64>,
        thread_id: Option<i64>,
        actor_id: Option<i64>,
    ) -> Result<Self> {
        let chat_id = chat_id.ok_or(MenuFlowError::MissingChatContext)?;
        Ok(Self {
            chat_id,
            thread_id,
            actor_id,
        })
    }
}

/// Caller-supplied override for session key derivation.
pub type KeyBuilder = Arc<dyn Fn(&UpdateScope) -> Result<String> + Send + Sync>;

/// Default key: `"{chat}:{thread or 0}:{actor or anon}"`.
pub fn default_session_key(scope: &UpdateScope) -> String {
    let thread = scope.thread_id.unwrap_or(0);
    match scope.actor_id {
        Some(actor) => format!("{}:{}:{}", scope.chat_id, thread, actor),
        None => format!("{}:{}:anon", scope.chat_id, thread),
    }
}
