//! Render pass and button registry.
//!
//! A render pass exists for exactly one execution of a menu's render
//! callback. It mints the render id, collects every button the callback
//! requests, and is frozen immediately after the callback returns. Tokens
//! minted here are resolvable later purely from the stored session.

use uuid::Uuid;

use crate::error::MenuFlowError;
use crate::session::MenuButtonState;
use crate::token::ActionToken;
use crate::Result;

/// Render ids are 16 hex chars and button ids 8: collision-resistant within
/// a session's lifetime while keeping a full token inside the 64-byte
/// callback-data budget common to chat gateways.
const RENDER_ID_BYTES: usize = 8;
const BUTTON_ID_BYTES: usize = 4;

pub(crate) fn random_render_id() -> String {
    random_hex(RENDER_ID_BYTES)
}

fn random_button_id() -> String {
    random_hex(BUTTON_ID_BYTES)
}

fn random_hex(bytes: usize) -> String {
    Uuid::new_v4().as_bytes()[..bytes]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// One open render pass.
pub struct RenderPass {
    namespace: String,
    menu_id: String,
    render_id: String,
    buttons: Vec<MenuButtonState>,
    open: bool,
}

impl RenderPass {
    pub(crate) fn open(namespace: &str, menu_id: &str) -> Self {
        Self::resume(namespace, menu_id, random_render_id())
    }

    /// Open a pass for a render id minted ahead of time.
    pub(crate) fn resume(namespace: &str, menu_id: &str, render_id: String) -> Self {
        Self {
            namespace: namespace.to_owned(),
            menu_id: menu_id.to_owned(),
            render_id,
            buttons: Vec::new(),
            open: true,
        }
    }

    pub fn menu_id(&self) -> &str {
        &self.menu_id
    }

    pub fn render_id(&self) -> &str {
        &self.render_id
    }

    /// Buttons minted so far, in minting order.
    pub fn buttons(&self) -> &[MenuButtonState] {
        &self.buttons
    }

    /// Mint a button token for `action`.
    pub fn mint(&mut self, action: &str) -> Result<String> {
        self.mint_with(action, None)
    }

    /// Mint a button token for `action` carrying extra `data`.
    ///
    /// Fails with [`MenuFlowError::RenderPassClosed`] once the pass has been
    /// frozen; tokens must never be minted outside the render callback that
    /// owns the pass.
    pub fn mint_with(&mut self, action: &str, data: Option<&str>) -> Result<String> {
        if !self.open {
            return Err(MenuFlowError::RenderPassClosed);
        }
        let button_id = random_button_id();
        let token =
            ActionToken::new(&self.menu_id, &self.render_id, &button_id).encode(&self.namespace);
        self.buttons.push(MenuButtonState {
            id: button_id,
            menu_id: self.menu_id.clone(),
            action: action.to_owned(),
            data: data.map(str::to_owned),
        });
        Ok(token)
    }

    /// Close the pass and hand back the frozen render metadata.
    pub(crate) fn freeze(&mut self) -> RenderFrame {
        self.open = false;
        RenderFrame {
            render_id: self.render_id.clone(),
            buttons: std::mem::take(&mut self.buttons),
        }
    }
}

/// Frozen output of a render pass.
#[derive(Debug, Clone)]
pub(crate) struct RenderFrame {
    pub render_id: String,
    pub buttons: Vec<MenuButtonState>,
}
