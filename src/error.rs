//! Error types for menuflow.

use thiserror::Error;

/// Main error type for menuflow operations.
#[derive(Error, Debug)]
pub enum MenuFlowError {
    /// Two menu definitions were registered under the same id.
    #[error("duplicate menu id: {0}")]
    DuplicateMenu(String),

    /// A navigation operation referenced a menu id that was never registered.
    #[error("unknown menu id: {0}")]
    UnknownMenu(String),

    /// A menu definition carried an empty id.
    #[error("menu definitions must include a non-empty id")]
    InvalidMenuId,

    /// `edit` could not resolve a target chat id and message id.
    #[error("edit requires a known chat id and message id")]
    EditTargetMissing,

    /// A button token was minted outside an open render pass.
    #[error("button tokens can only be minted during an open render pass")]
    RenderPassClosed,

    /// A segmentation key was requested for an update without chat context.
    #[error("cannot derive a session key without chat context")]
    MissingChatContext,

    /// The plugin was built without a storage adapter.
    #[error("a storage adapter is required")]
    MissingStorage,

    /// The plugin was built without a gateway client.
    #[error("a gateway client is required")]
    MissingGateway,

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// The persistence backend failed.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The messaging gateway failed.
    #[error("gateway error: {0}")]
    Gateway(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Session (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// An application-supplied render or lifecycle hook failed.
    #[error("menu hook failed: {0}")]
    Hook(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl MenuFlowError {
    /// Wrap a backend error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }

    /// Wrap a gateway client error.
    pub fn gateway<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Gateway(Box::new(err))
    }

    /// Wrap an application hook error.
    pub fn hook<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Hook(Box::new(err))
    }
}

/// Convenience Result type for menuflow operations.
pub type Result<T> = std::result::Result<T, MenuFlowError>;
