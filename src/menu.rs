//! Menu definitions and the registry they live in.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::controller::MenuController;
use crate::error::MenuFlowError;
use crate::keyboard::Keyboard;
use crate::render::RenderPass;
use crate::session::{MenuSession, MenuState};
use crate::Result;

/// What a render callback hands back: the screen text, an optional keyboard,
/// and an optional payload replacing the one passed to `show`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderResult {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<Keyboard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl RenderResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            payload: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// A button press resolved against stored session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    /// Menu the token was minted for.
    pub menu_id: String,
    /// Menu owning the state the token matched (equal to `menu_id` today;
    /// kept separate because resolution searches history, not the registry).
    pub source_menu_id: String,
    pub render_id: String,
    pub button_id: String,
    pub action: String,
    pub data: Option<String>,
}

/// An application-supplied menu.
///
/// `render` is called on every `show`/`back` pass with the open render pass
/// for minting button tokens. The lifecycle hooks are optional; the defaults
/// do nothing.
#[async_trait]
pub trait Menu: Send + Sync {
    /// Unique id this menu registers under.
    fn id(&self) -> &str;

    async fn render(
        &self,
        pass: &mut RenderPass,
        state: &MenuState,
        session: &MenuSession,
    ) -> Result<RenderResult>;

    /// Called when a button minted by this menu resolves.
    async fn on_action(&self, nav: &mut MenuController, action: &ResolvedAction) -> Result<()> {
        let _ = (nav, action);
        Ok(())
    }

    /// Called after navigation lands on this menu from a different one.
    async fn on_enter(&self, session: &MenuSession) -> Result<()> {
        let _ = session;
        Ok(())
    }

    /// Called when navigation leaves this menu for a different one.
    async fn on_leave(&self, session: &MenuSession) -> Result<()> {
        let _ = session;
        Ok(())
    }
}

impl std::fmt::Debug for dyn Menu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Menu").field("id", &self.id()).finish()
    }
}

/// Immutable id → definition table, validated at setup time.
#[derive(Debug)]
pub struct MenuRegistry {
    menus: HashMap<String, Arc<dyn Menu>>,
}

impl MenuRegistry {
    /// Build the registry. Empty and duplicate ids are fatal configuration
    /// errors, raised here rather than at first use.
    pub fn new(menus: impl IntoIterator<Item = Arc<dyn Menu>>) -> Result<Self> {
        let mut table: HashMap<String, Arc<dyn Menu>> = HashMap::new();
        for menu in menus {
            let id = menu.id().to_owned();
            if id.is_empty() {
                return Err(MenuFlowError::InvalidMenuId);
            }
            if table.contains_key(&id) {
                return Err(MenuFlowError::DuplicateMenu(id));
            }
            table.insert(id, menu);
        }
        Ok(Self { menus: table })
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Menu>> {
        self.menus.get(id)
    }

    /// Like [`get`](Self::get), but an unknown id is an error.
    pub fn expect(&self, id: &str) -> Result<&Arc<dyn Menu>> {
        self.menus
            .get(id)
            .ok_or_else(|| MenuFlowError::UnknownMenu(id.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }
}
