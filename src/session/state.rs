//! Session data model.
//!
//! A session records what is currently on screen (`active`) and the stack of
//! previously shown screens (`history`). Everything here is owned data with
//! `serde` derives; `Clone` therefore produces the deep, aliasing-free copy
//! the read-modify-write cycle depends on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::keyboard::Keyboard;
use crate::token::ActionToken;

/// One button minted during a render pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuButtonState {
    /// Random id, unique within the render that produced it.
    pub id: String,
    /// Menu that minted the button.
    pub menu_id: String,
    /// Semantic action dispatched when the button resolves.
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// The screen currently shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuState {
    pub menu_id: String,
    /// Opaque application payload.
    #[serde(default)]
    pub payload: Value,
    /// Breadcrumb of menu ids, root first.
    pub path: Vec<String>,
    /// Gateway message id, once the correlator has observed the send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    /// Unix milliseconds at the time of the last transition.
    pub timestamp: i64,
    /// Identifier of the most recent render pass for this menu.
    pub render_id: String,
    /// Buttons frozen by that render pass.
    pub buttons: Vec<MenuButtonState>,
}

/// Frozen snapshot of a past screen, kept for back-navigation and late
/// correlation with gateway responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuHistoryEntry {
    pub menu_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<Keyboard>,
    #[serde(default)]
    pub payload: Value,
    pub path: Vec<String>,
    pub timestamp: i64,
    pub render_id: String,
    pub buttons: Vec<MenuButtonState>,
}

/// The persisted record for one segmentation key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<MenuState>,
    #[serde(default)]
    pub history: Vec<MenuHistoryEntry>,
}

impl MenuSession {
    /// An absent session: nothing active, nothing in history.
    ///
    /// Absent sessions are never persisted; the store deletes the backing
    /// key instead of writing an empty record.
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.history.is_empty()
    }

    /// Locate the button a decoded token refers to.
    ///
    /// Searches the active state first, then history from most recent to
    /// oldest, for a matching menu id + render id holding the token's button
    /// id. Returns the owning menu id and the button, or `None` when the
    /// render has been superseded or evicted.
    pub fn resolve_token(&self, token: &ActionToken) -> Option<(&str, &MenuButtonState)> {
        if let Some(active) = &self.active {
            if let Some(button) = match_render(
                &active.menu_id,
                &active.render_id,
                &active.buttons,
                token,
            ) {
                return Some((active.menu_id.as_str(), button));
            }
        }
        for entry in self.history.iter().rev() {
            if let Some(button) =
                match_render(&entry.menu_id, &entry.render_id, &entry.buttons, token)
            {
                return Some((entry.menu_id.as_str(), button));
            }
        }
        None
    }
}

fn match_render<'a>(
    menu_id: &str,
    render_id: &str,
    buttons: &'a [MenuButtonState],
    token: &ActionToken,
) -> Option<&'a MenuButtonState> {
    if menu_id != token.menu_id || render_id != token.render_id {
        return None;
    }
    buttons.iter().find(|button| button.id == token.button_id)
}
