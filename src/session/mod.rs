//! Session management module.
//!
//! Data model, segmentation-key derivation, serialization, and the storage
//! layer all navigation state flows through.

mod key;
mod serialize;
mod state;
mod store;

pub use key::{default_session_key, KeyBuilder, UpdateScope};
pub use serialize::{JsonSessionSerializer, SessionSerializer};
pub use state::{MenuButtonState, MenuHistoryEntry, MenuSession, MenuState};
pub use store::{SessionStore, StorageAdapter};
