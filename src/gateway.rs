//! Messaging gateway interface.
//!
//! The actual chat platform client lives in the host application. This trait
//! is the narrow seam the navigation layer needs: send a text+keyboard
//! screen, edit one in place, get the resulting message id back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::keyboard::Keyboard;
use crate::Result;

/// Result of a completed send/edit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
    pub chat_id: i64,
}

/// Chat platform client.
///
/// `options` is an opaque passthrough document (parse mode, notification
/// flags, whatever the platform accepts); this subsystem never inspects it.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
        options: Option<&Value>,
    ) -> Result<SentMessage>;

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
        options: Option<&Value>,
    ) -> Result<SentMessage>;
}
