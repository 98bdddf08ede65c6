//! Navigation controller.
//!
//! The per-update capability object application code drives. Every
//! operation advances the stored session through the store's
//! read-modify-write primitive, runs the menu lifecycle hooks, and keeps a
//! cached copy of the session for the pure accessors.

use std::sync::Arc;

use serde_json::Value;

use crate::config::Clock;
use crate::correlate::{CorrelatedGateway, PendingKind, PendingOutgoing};
use crate::error::MenuFlowError;
use crate::gateway::{GatewayClient, SentMessage};
use crate::menu::{MenuRegistry, RenderResult, ResolvedAction};
use crate::render::{random_render_id, RenderPass};
use crate::session::{MenuHistoryEntry, MenuSession, MenuState, SessionStore, UpdateScope};
use crate::token::ActionToken;
use crate::Result;

/// Options for `show` and `back`.
#[derive(Debug, Clone, Default)]
pub struct ShowOptions {
    /// When `Some(false)`, the new screen replaces the last history entry
    /// instead of stacking on top of it. Defaults to stacking.
    pub stack: Option<bool>,
    /// Explicit breadcrumb override.
    pub path: Option<Vec<String>>,
}

impl ShowOptions {
    pub fn replace() -> Self {
        Self {
            stack: Some(false),
            path: None,
        }
    }
}

/// Options passed through to the gateway on `reply`.
#[derive(Debug, Clone, Default)]
pub struct ReplyOptions {
    /// Opaque gateway passthrough (parse mode, notification flags, ...).
    pub extra: Option<Value>,
}

/// Options for `edit`.
#[derive(Debug, Clone, Default)]
pub struct EditOptions {
    /// Explicit target message; defaults to the currently tracked one.
    pub message_id: Option<i64>,
    /// Explicit target chat; defaults to the update's chat.
    pub chat_id: Option<i64>,
    pub extra: Option<Value>,
}

/// The menu-navigation state machine for one session.
pub struct MenuController {
    registry: Arc<MenuRegistry>,
    store: Arc<SessionStore>,
    gateway: Arc<CorrelatedGateway>,
    namespace: String,
    clock: Clock,
    scope: UpdateScope,
    key: String,
    session: MenuSession,
}

impl MenuController {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        registry: Arc<MenuRegistry>,
        store: Arc<SessionStore>,
        gateway: Arc<CorrelatedGateway>,
        namespace: String,
        clock: Clock,
        scope: UpdateScope,
        key: String,
        session: MenuSession,
    ) -> Self {
        Self {
            registry,
            store,
            gateway,
            namespace,
            clock,
            scope,
            key,
            session,
        }
    }

    /// Segmentation key this controller operates on.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn scope(&self) -> &UpdateScope {
        &self.scope
    }

    /// The active screen, if any.
    pub fn current(&self) -> Option<&MenuState> {
        self.session.active.as_ref()
    }

    /// Detached copy of the history stack, oldest first.
    pub fn history(&self) -> Vec<MenuHistoryEntry> {
        self.session.history.clone()
    }

    /// Re-read the cached session from storage.
    pub async fn refresh(&mut self) -> Result<()> {
        self.session = self.store.read(&self.key).await?;
        Ok(())
    }

    /// Render `menu_id` and make it the active screen.
    ///
    /// Persists the transition and returns the rendered screen; issuing the
    /// gateway call is the caller's business (or use [`reply`](Self::reply)/
    /// [`edit`](Self::edit)).
    pub async fn show(
        &mut self,
        menu_id: &str,
        payload: Value,
        options: ShowOptions,
    ) -> Result<RenderResult> {
        let menu = self.registry.expect(menu_id)?.clone();
        let mut pass = RenderPass::open(&self.namespace, menu_id);
        let render_id = pass.render_id().to_owned();
        let timestamp = (self.clock)();

        tracing::debug!(key = %self.key, menu_id, render_id = %render_id, "show");

        let state_payload = payload;
        let (session, (previous, state)) = self
            .store
            .with_session(&self.key, |draft| {
                let previous = draft.active.take();
                let path = resolve_path(previous.as_ref(), menu_id, &options);
                if options.stack == Some(false) && !draft.history.is_empty() {
                    draft.history.pop();
                }
                let state = MenuState {
                    menu_id: menu_id.to_owned(),
                    payload: state_payload,
                    path,
                    message_id: previous.as_ref().and_then(|state| state.message_id),
                    timestamp,
                    render_id: render_id.clone(),
                    buttons: Vec::new(),
                };
                draft.active = Some(state.clone());
                (previous, state)
            })
            .await?;
        self.session = session;

        let entering = previous.as_ref().map(|state| state.menu_id.as_str()) != Some(menu_id);
        if entering {
            if let Some(previous) = &previous {
                if let Some(left) = self.registry.get(&previous.menu_id) {
                    left.on_leave(&self.session).await?;
                }
            }
            menu.on_enter(&self.session).await?;
        }

        let rendered = menu.render(&mut pass, &state, &self.session).await?;

        self.freeze_into_session(&mut pass, &rendered, None).await?;
        Ok(rendered)
    }

    /// `show`, then send the screen as a new message.
    pub async fn reply(
        &mut self,
        menu_id: &str,
        payload: Value,
        options: ReplyOptions,
    ) -> Result<SentMessage> {
        let pending_payload = payload.clone();
        let rendered = self.show(menu_id, payload, ShowOptions::default()).await?;
        let chat_id = self.scope.chat_id;

        self.enqueue_pending(PendingKind::Send, menu_id, chat_id, &rendered, pending_payload, None);
        let sent = self
            .gateway
            .send_message(chat_id, &rendered.text, rendered.keyboard.as_ref(), options.extra.as_ref())
            .await?;

        self.refresh().await?;
        Ok(sent)
    }

    /// `show` with `stack=false`, then edit the tracked message in place.
    ///
    /// Fails with [`MenuFlowError::EditTargetMissing`] when neither the
    /// options nor the session know which message to edit.
    pub async fn edit(
        &mut self,
        menu_id: &str,
        payload: Value,
        options: EditOptions,
    ) -> Result<SentMessage> {
        let pending_payload = payload.clone();
        let rendered = self.show(menu_id, payload, ShowOptions::replace()).await?;

        let chat_id = options.chat_id.unwrap_or(self.scope.chat_id);
        let message_id = options
            .message_id
            .or_else(|| self.session.active.as_ref().and_then(|state| state.message_id))
            .ok_or(MenuFlowError::EditTargetMissing)?;

        self.enqueue_pending(
            PendingKind::Edit,
            menu_id,
            chat_id,
            &rendered,
            pending_payload,
            Some(message_id),
        );
        let sent = self
            .gateway
            .edit_message_text(
                chat_id,
                message_id,
                &rendered.text,
                rendered.keyboard.as_ref(),
                options.extra.as_ref(),
            )
            .await?;

        self.refresh().await?;
        Ok(sent)
    }

    /// Pop the current screen and restore the one beneath it.
    ///
    /// Returns `None` once there is nothing left to go back to; the session
    /// record is deleted in that case. The restored screen is re-rendered
    /// under a fresh render id, so tokens minted for its earlier renders
    /// stop resolving.
    pub async fn back(&mut self, options: ShowOptions) -> Result<Option<RenderResult>> {
        let timestamp = (self.clock)();
        let render_id = random_render_id();

        let (session, target) = self
            .store
            .with_session(&self.key, |draft| {
                if draft.history.is_empty() {
                    draft.active = None;
                    return None;
                }
                draft.history.pop();
                let Some(target) = draft.history.last() else {
                    draft.active = None;
                    return None;
                };
                let target = target.clone();
                let path = options
                    .path
                    .clone()
                    .unwrap_or_else(|| target.path.clone());
                let state = MenuState {
                    menu_id: target.menu_id.clone(),
                    payload: target.payload.clone(),
                    path,
                    message_id: target.message_id,
                    timestamp,
                    render_id: render_id.clone(),
                    buttons: Vec::new(),
                };
                draft.active = Some(state.clone());
                Some((target, state))
            })
            .await?;
        self.session = session;

        let Some((target, state)) = target else {
            tracing::debug!(key = %self.key, "back past the root, session cleared");
            return Ok(None);
        };

        tracing::debug!(key = %self.key, menu_id = %target.menu_id, "back");

        let menu = self.registry.expect(&target.menu_id)?.clone();
        let mut pass = RenderPass::resume(&self.namespace, &target.menu_id, render_id);
        let rendered = menu.render(&mut pass, &state, &self.session).await?;

        self.freeze_into_session(&mut pass, &rendered, Some(timestamp)).await?;
        Ok(Some(rendered))
    }

    /// Drop the whole session and delete the backing record.
    pub async fn clear(&mut self) -> Result<()> {
        self.store.clear(&self.key).await?;
        self.session = MenuSession::default();
        Ok(())
    }

    /// Resolve raw callback data against the stored session.
    ///
    /// Foreign, stale, and superseded tokens all come back as `None`.
    pub fn parse_action_data(&self, raw: &str) -> Option<ResolvedAction> {
        let token = ActionToken::decode(raw, &self.namespace)?;
        let (source_menu_id, button) = self.session.resolve_token(&token)?;
        Some(ResolvedAction {
            menu_id: button.menu_id.clone(),
            source_menu_id: source_menu_id.to_owned(),
            render_id: token.render_id,
            button_id: token.button_id,
            action: button.action.clone(),
            data: button.data.clone(),
        })
    }

    /// Write a frozen render pass back into the active state (and, for
    /// `back`, into the promoted history entry so its old buttons die).
    async fn freeze_into_session(
        &mut self,
        pass: &mut RenderPass,
        rendered: &RenderResult,
        refresh_last_entry: Option<i64>,
    ) -> Result<()> {
        let frame = pass.freeze();
        let rendered = rendered.clone();
        let (session, _) = self
            .store
            .with_session(&self.key, move |draft| {
                if let Some(active) = draft.active.as_mut() {
                    if active.render_id == frame.render_id {
                        active.buttons = frame.buttons.clone();
                        if let Some(payload) = rendered.payload.clone() {
                            active.payload = payload;
                        }
                    }
                }
                if let Some(timestamp) = refresh_last_entry {
                    if let Some(last) = draft.history.last_mut() {
                        last.render_id = frame.render_id.clone();
                        last.buttons = frame.buttons;
                        last.text = rendered.text;
                        last.keyboard = rendered.keyboard;
                        last.timestamp = timestamp;
                        if let Some(payload) = rendered.payload {
                            last.payload = payload;
                        }
                    }
                }
            })
            .await?;
        self.session = session;
        Ok(())
    }

    fn enqueue_pending(
        &self,
        kind: PendingKind,
        menu_id: &str,
        chat_id: i64,
        rendered: &RenderResult,
        payload: Value,
        message_id: Option<i64>,
    ) {
        let (render_id, buttons, path) = match &self.session.active {
            Some(active) => (
                active.render_id.clone(),
                active.buttons.clone(),
                active.path.clone(),
            ),
            None => (String::new(), Vec::new(), vec![menu_id.to_owned()]),
        };
        self.gateway.enqueue(PendingOutgoing {
            kind,
            session_key: self.key.clone(),
            menu_id: menu_id.to_owned(),
            chat_id,
            text: rendered.text.clone(),
            keyboard: rendered.keyboard.clone(),
            payload,
            path,
            render_id,
            buttons,
            message_id,
        });
    }
}

fn resolve_path(
    previous: Option<&MenuState>,
    menu_id: &str,
    options: &ShowOptions,
) -> Vec<String> {
    if let Some(path) = &options.path {
        return path.clone();
    }
    let mut path = previous.map(|state| state.path.clone()).unwrap_or_default();
    if options.stack == Some(false) && !path.is_empty() {
        path.pop();
    }
    path.push(menu_id.to_owned());
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_path(path: &[&str]) -> MenuState {
        MenuState {
            menu_id: path.last().map(|s| s.to_string()).unwrap_or_default(),
            payload: Value::Null,
            path: path.iter().map(|s| s.to_string()).collect(),
            message_id: None,
            timestamp: 0,
            render_id: "r".into(),
            buttons: vec![],
        }
    }

    #[test]
    fn test_resolve_path_appends_by_default() {
        let previous = state_with_path(&["main"]);
        let path = resolve_path(Some(&previous), "settings", &ShowOptions::default());
        assert_eq!(path, vec!["main", "settings"]);
    }

    #[test]
    fn test_resolve_path_replaces_last_when_not_stacking() {
        let previous = state_with_path(&["main", "settings"]);
        let path = resolve_path(Some(&previous), "profile", &ShowOptions::replace());
        assert_eq!(path, vec!["main", "profile"]);
    }

    #[test]
    fn test_resolve_path_without_previous() {
        assert_eq!(
            resolve_path(None, "main", &ShowOptions::default()),
            vec!["main"]
        );
        assert_eq!(
            resolve_path(None, "main", &ShowOptions::replace()),
            vec!["main"]
        );
    }

    #[test]
    fn test_resolve_path_explicit_override_wins() {
        let previous = state_with_path(&["main"]);
        let options = ShowOptions {
            stack: Some(false),
            path: Some(vec!["a".into(), "b".into()]),
        };
        assert_eq!(resolve_path(Some(&previous), "c", &options), vec!["a", "b"]);
    }
}
