//! Pluggable session serialization.

use serde_json::Value;

use super::state::MenuSession;
use crate::Result;

/// Converts sessions to and from the persistence backend's value type.
///
/// The stored type is fixed to [`serde_json::Value`]: every key/value
/// backend this subsystem targets can hold a JSON document, and the default
/// implementation is a plain `serde_json` round trip. Implementations must be
/// lossless: `deserialize(serialize(s))` has to equal `s` in content.
pub trait SessionSerializer: Send + Sync {
    fn serialize(&self, session: &MenuSession) -> Result<Value>;

    fn deserialize(&self, value: Value) -> Result<MenuSession>;

    /// Deep, aliasing-free copy used for read-modify-write drafts.
    ///
    /// Defaults to a serialize/deserialize round trip so that custom
    /// serializers that drop fields also drop them from drafts.
    fn clone_session(&self, session: &MenuSession) -> Result<MenuSession> {
        self.deserialize(self.serialize(session)?)
    }
}

/// Default serializer: structural JSON round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSessionSerializer;

impl SessionSerializer for JsonSessionSerializer {
    fn serialize(&self, session: &MenuSession) -> Result<Value> {
        Ok(serde_json::to_value(session)?)
    }

    fn deserialize(&self, value: Value) -> Result<MenuSession> {
        if value.is_null() {
            return Ok(MenuSession::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    fn clone_session(&self, session: &MenuSession) -> Result<MenuSession> {
        // All session data is owned; derive(Clone) is already deep.
        Ok(session.clone())
    }
}
