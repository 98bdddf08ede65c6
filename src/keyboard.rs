//! Inline keyboard model.
//!
//! Keyboards are plain owned data so history snapshots serialize and
//! round-trip without referencing live gateway objects.

use serde::{Deserialize, Serialize};

use crate::token::ActionToken;

/// A single keyboard button.
///
/// Exactly one of `callback_data` or `url` is normally set; the gateway
/// client decides how to map anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl KeyboardButton {
    /// A button that reports back through callback data (usually a token).
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            url: None,
        }
    }

    /// A button that opens an external link.
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            url: Some(url.into()),
        }
    }
}

/// A button grid, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyboard {
    rows: Vec<Vec<KeyboardButton>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new row. Subsequent buttons land on it.
    pub fn row(mut self) -> Self {
        self.rows.push(Vec::new());
        self
    }

    /// Append a callback button to the current row.
    pub fn text(self, label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        self.push(KeyboardButton::callback(label, callback_data))
    }

    /// Append a link button to the current row.
    pub fn link(self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.push(KeyboardButton::link(label, url))
    }

    /// Append a prebuilt button to the current row.
    pub fn push(mut self, button: KeyboardButton) -> Self {
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        if let Some(last) = self.rows.last_mut() {
            last.push(button);
        }
        self
    }

    pub fn rows(&self) -> &[Vec<KeyboardButton>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.is_empty())
    }

    /// Find the first button carrying a token in `namespace`.
    ///
    /// The correlator uses this to decide whether an outgoing send/edit call
    /// belongs to this subsystem at all.
    pub fn detect_token(&self, namespace: &str) -> Option<ActionToken> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|button| button.callback_data.as_deref())
            .find_map(|data| ActionToken::decode(data, namespace))
    }
}

impl From<Vec<Vec<KeyboardButton>>> for Keyboard {
    fn from(rows: Vec<Vec<KeyboardButton>>) -> Self {
        Self { rows }
    }
}
