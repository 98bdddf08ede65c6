//! Navigation integration tests.
//!
//! These drive the full stack end-to-end: plugin assembly, render passes,
//! session persistence, the correlation interceptor, and token resolution,
//! against an in-memory backend and a simulated gateway.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use menuflow::{
    CallbackOutcome, EditOptions, GatewayClient, Keyboard, MemoryStorage, Menu, MenuController,
    MenuFlowConfig, MenuFlowError, MenuPlugin, MenuSession, MenuState, RenderPass, RenderResult,
    ResolvedAction, Result, SentMessage, ShowOptions, UpdateScope,
};
use serde_json::{json, Value};

/// Simulated gateway: sends get sequential message ids, edits echo theirs.
struct MockGateway {
    next_message_id: AtomicI64,
}

impl MockGateway {
    fn new() -> Self {
        Self {
            next_message_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    async fn send_message(
        &self,
        chat_id: i64,
        _text: &str,
        _keyboard: Option<&Keyboard>,
        _options: Option<&Value>,
    ) -> Result<SentMessage> {
        Ok(SentMessage {
            message_id: self.next_message_id.fetch_add(1, Ordering::Relaxed),
            chat_id,
        })
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        _text: &str,
        _keyboard: Option<&Keyboard>,
        _options: Option<&Value>,
    ) -> Result<SentMessage> {
        Ok(SentMessage { message_id, chat_id })
    }
}

/// Renders `menu:{payload}` with a single "open" button; `on_action`
/// captures the resolved action and navigates.
struct MainMenu {
    captured: Arc<Mutex<Option<ResolvedAction>>>,
}

#[async_trait]
impl Menu for MainMenu {
    fn id(&self) -> &str {
        "main"
    }

    async fn render(
        &self,
        pass: &mut RenderPass,
        state: &MenuState,
        _session: &MenuSession,
    ) -> Result<RenderResult> {
        let token = pass.mint("open")?;
        Ok(
            RenderResult::new(format!("menu:{}", state.payload.as_str().unwrap_or("root")))
                .with_keyboard(Keyboard::new().text("go", token)),
        )
    }

    async fn on_action(&self, nav: &mut MenuController, action: &ResolvedAction) -> Result<()> {
        if let Ok(mut captured) = self.captured.lock() {
            *captured = Some(action.clone());
        }
        nav.show("main", json!("action"), ShowOptions::default()).await?;
        Ok(())
    }
}

struct ChildMenu;

#[async_trait]
impl Menu for ChildMenu {
    fn id(&self) -> &str {
        "child"
    }

    async fn render(
        &self,
        pass: &mut RenderPass,
        _state: &MenuState,
        _session: &MenuSession,
    ) -> Result<RenderResult> {
        let token = pass.mint("close")?;
        Ok(RenderResult::new("child").with_keyboard(Keyboard::new().text("back", token)))
    }
}

struct Harness {
    storage: Arc<MemoryStorage>,
    plugin: MenuPlugin,
    captured: Arc<Mutex<Option<ResolvedAction>>>,
}

fn harness(config: MenuFlowConfig) -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    let captured = Arc::new(Mutex::new(None));
    let plugin = MenuPlugin::builder()
        .config(config)
        .storage(storage.clone())
        .gateway(Arc::new(MockGateway::new()))
        .menu(Arc::new(MainMenu {
            captured: captured.clone(),
        }))
        .menu(Arc::new(ChildMenu))
        .build()
        .expect("plugin should assemble");
    Harness {
        storage,
        plugin,
        captured,
    }
}

fn scope() -> UpdateScope {
    UpdateScope::chat(100).with_thread(10).with_actor(200)
}

/// First callback token on a rendered keyboard.
fn first_token(keyboard: &Keyboard) -> String {
    keyboard.rows()[0][0]
        .callback_data
        .clone()
        .expect("button should carry callback data")
}

// ============================================================================
// Reply & correlation
// ============================================================================

#[tokio::test]
async fn test_reply_stores_history_and_correlates_message_id() {
    let h = harness(MenuFlowConfig::default());
    let mut nav = h.plugin.controller(scope()).await.unwrap();

    let sent = nav.reply("main", json!("root"), Default::default()).await.unwrap();
    assert_eq!(sent.message_id, 1);
    assert_eq!(sent.chat_id, 100);

    // Exactly one record, under the chat:thread:actor key.
    assert_eq!(h.storage.len(), 1);
    assert_eq!(nav.key(), "100:10:200");

    let history = nav.history();
    assert_eq!(history.len(), 1);
    let entry = &history[0];
    assert_eq!(entry.text, "menu:root");
    assert_eq!(entry.message_id, Some(1));
    assert_eq!(entry.buttons.len(), 1);
    assert_eq!(entry.buttons[0].action, "open");
    assert_eq!(entry.buttons[0].menu_id, "main");
    assert!(!entry.render_id.is_empty());

    let active = nav.current().expect("active state");
    assert_eq!(active.message_id, Some(1));
    assert_eq!(active.render_id, entry.render_id);
    assert_eq!(active.buttons.len(), 1);
    assert_eq!(active.path, vec!["main".to_string()]);
}

#[tokio::test]
async fn test_reply_token_resolves_to_semantic_action() {
    let h = harness(MenuFlowConfig::default());
    let mut nav = h.plugin.controller(scope()).await.unwrap();
    nav.reply("main", json!("root"), Default::default()).await.unwrap();

    let history = nav.history();
    let entry = &history[0];
    let token = first_token(entry.keyboard.as_ref().unwrap());

    let action = nav.parse_action_data(&token).expect("token should resolve");
    assert_eq!(action.menu_id, "main");
    assert_eq!(action.source_menu_id, "main");
    assert_eq!(action.action, "open");
    assert_eq!(action.render_id, entry.render_id);
    assert_eq!(action.button_id, entry.buttons[0].id);
    assert_eq!(action.data, None);
}

#[tokio::test]
async fn test_callback_dispatches_to_on_action() {
    let h = harness(MenuFlowConfig::default());
    let mut nav = h.plugin.controller(scope()).await.unwrap();
    nav.reply("main", json!("root"), Default::default()).await.unwrap();
    let token = first_token(nav.history()[0].keyboard.as_ref().unwrap());

    let outcome = h.plugin.handle_callback(scope(), &token).await.unwrap();
    assert!(matches!(outcome, CallbackOutcome::Handled(_)));

    let captured = h.captured.lock().unwrap().clone().expect("action captured");
    assert_eq!(captured.menu_id, "main");
    assert_eq!(captured.action, "open");

    // on_action navigated: the stored active payload reflects the show call.
    let nav = h.plugin.controller(scope()).await.unwrap();
    assert_eq!(nav.current().unwrap().payload, json!("action"));
}

#[tokio::test]
async fn test_foreign_callback_data_is_unresolved() {
    let h = harness(MenuFlowConfig::default());
    let mut nav = h.plugin.controller(scope()).await.unwrap();
    nav.reply("main", json!("root"), Default::default()).await.unwrap();

    let outcome = h
        .plugin
        .handle_callback(scope(), "poll-vote:42")
        .await
        .unwrap();
    assert_eq!(outcome, CallbackOutcome::Unresolved);
    assert!(h.captured.lock().unwrap().is_none());
}

// ============================================================================
// Edit semantics
// ============================================================================

#[tokio::test]
async fn test_edit_replaces_history_never_appends() {
    let h = harness(MenuFlowConfig::default());
    let mut nav = h.plugin.controller(scope()).await.unwrap();

    nav.reply("main", json!("root"), Default::default()).await.unwrap();
    let before = nav.history()[0].clone();

    let sent = nav
        .edit("main", json!("updated"), EditOptions::default())
        .await
        .unwrap();
    assert_eq!(sent.message_id, 1);

    let history = nav.history();
    assert_eq!(history.len(), 1);
    let after = &history[0];
    assert_eq!(after.text, "menu:updated");
    assert_ne!(after.render_id, before.render_id);
    assert_eq!(after.buttons.len(), 1);
    assert_ne!(after.buttons[0].id, before.buttons[0].id);
    assert_eq!(after.message_id, Some(1));

    // The breadcrumb did not grow.
    assert_eq!(nav.current().unwrap().path, vec!["main".to_string()]);
}

#[tokio::test]
async fn test_stale_token_rejected_after_edit() {
    let h = harness(MenuFlowConfig::default());
    let mut nav = h.plugin.controller(scope()).await.unwrap();

    nav.reply("main", json!("root"), Default::default()).await.unwrap();
    let stale = first_token(nav.history()[0].keyboard.as_ref().unwrap());

    nav.edit("main", json!("updated"), EditOptions::default())
        .await
        .unwrap();

    assert!(nav.parse_action_data(&stale).is_none());
    let outcome = h.plugin.handle_callback(scope(), &stale).await.unwrap();
    assert_eq!(outcome, CallbackOutcome::Unresolved);

    // The fresh render's token resolves.
    let fresh = first_token(nav.history()[0].keyboard.as_ref().unwrap());
    assert!(nav.parse_action_data(&fresh).is_some());
}

#[tokio::test]
async fn test_edit_without_target_is_a_usage_error() {
    let h = harness(MenuFlowConfig::default());
    let mut nav = h.plugin.controller(scope()).await.unwrap();

    let err = nav
        .edit("main", json!("x"), EditOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MenuFlowError::EditTargetMissing));
}

// ============================================================================
// Back navigation
// ============================================================================

#[tokio::test]
async fn test_back_restores_previous_screen_and_breadcrumb() {
    let h = harness(MenuFlowConfig::default());
    let mut nav = h.plugin.controller(scope()).await.unwrap();

    nav.reply("main", json!("root"), Default::default()).await.unwrap();
    nav.reply("child", Value::Null, Default::default()).await.unwrap();

    assert_eq!(nav.history().len(), 2);
    assert_eq!(
        nav.current().unwrap().path,
        vec!["main".to_string(), "child".to_string()]
    );
    let child_render = nav.current().unwrap().render_id.clone();
    let main_render_before = nav.history()[0].render_id.clone();

    let restored = nav.back(ShowOptions::default()).await.unwrap().unwrap();
    assert_eq!(restored.text, "menu:root");

    let active = nav.current().expect("promoted state");
    assert_eq!(active.menu_id, "main");
    assert_eq!(active.path, vec!["main".to_string()]);
    assert_eq!(active.message_id, Some(1));
    assert_ne!(active.render_id, child_render);
    assert_ne!(active.render_id, main_render_before);
    assert_eq!(nav.history().len(), 1);

    // Going back past the root clears everything, including the record.
    let nothing = nav.back(ShowOptions::default()).await.unwrap();
    assert!(nothing.is_none());
    assert!(nav.current().is_none());
    assert!(nav.history().is_empty());
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_back_invalidates_restored_screens_old_tokens() {
    let h = harness(MenuFlowConfig::default());
    let mut nav = h.plugin.controller(scope()).await.unwrap();

    nav.reply("main", json!("root"), Default::default()).await.unwrap();
    let old_main_token = first_token(nav.history()[0].keyboard.as_ref().unwrap());
    nav.reply("child", Value::Null, Default::default()).await.unwrap();

    nav.back(ShowOptions::default()).await.unwrap();

    assert!(nav.parse_action_data(&old_main_token).is_none());
    let fresh = first_token(nav.history()[0].keyboard.as_ref().unwrap());
    let action = nav.parse_action_data(&fresh).expect("fresh token resolves");
    assert_eq!(action.menu_id, "main");
}

#[tokio::test]
async fn test_back_on_empty_history_returns_none() {
    let h = harness(MenuFlowConfig::default());
    let mut nav = h.plugin.controller(scope()).await.unwrap();

    assert!(nav.back(ShowOptions::default()).await.unwrap().is_none());
    assert!(h.storage.is_empty());
}

// ============================================================================
// Clear, trimming, isolation
// ============================================================================

#[tokio::test]
async fn test_clear_deletes_the_record() {
    let h = harness(MenuFlowConfig::default());
    let mut nav = h.plugin.controller(scope()).await.unwrap();

    nav.reply("main", json!("root"), Default::default()).await.unwrap();
    assert_eq!(h.storage.len(), 1);

    nav.clear().await.unwrap();
    assert!(nav.current().is_none());
    assert!(nav.history().is_empty());
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_history_trimming_keeps_most_recent_entries() {
    let h = harness(MenuFlowConfig {
        history_limit: Some(2),
        ..Default::default()
    });
    let mut nav = h.plugin.controller(scope()).await.unwrap();

    nav.reply("main", json!("one"), Default::default()).await.unwrap();
    nav.reply("child", Value::Null, Default::default()).await.unwrap();
    nav.reply("main", json!("three"), Default::default()).await.unwrap();

    let history = nav.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].menu_id, "child");
    assert_eq!(history[1].menu_id, "main");
    assert_eq!(history[1].text, "menu:three");
}

#[tokio::test]
async fn test_sessions_are_isolated_per_segmentation_key() {
    let h = harness(MenuFlowConfig::default());

    let mut first = h.plugin.controller(scope()).await.unwrap();
    first.reply("main", json!("root"), Default::default()).await.unwrap();

    let other_scope = UpdateScope::chat(100).with_thread(10).with_actor(999);
    let mut second = h.plugin.controller(other_scope).await.unwrap();
    assert!(second.current().is_none());

    second.reply("child", Value::Null, Default::default()).await.unwrap();
    assert_eq!(h.storage.len(), 2);

    // Tokens do not leak across sessions.
    let token = first_token(first.history()[0].keyboard.as_ref().unwrap());
    assert!(second.parse_action_data(&token).is_none());
}

#[tokio::test]
async fn test_custom_namespace_scopes_tokens() {
    let h = harness(MenuFlowConfig {
        namespace: "shop".into(),
        ..Default::default()
    });
    let mut nav = h.plugin.controller(scope()).await.unwrap();
    nav.reply("main", json!("root"), Default::default()).await.unwrap();

    let token = first_token(nav.history()[0].keyboard.as_ref().unwrap());
    assert!(token.starts_with("shop:"));
    assert!(nav.parse_action_data(&token).is_some());
}
