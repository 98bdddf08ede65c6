//! # menuflow
//!
//! Navigable, button-driven chat menus with persisted sessions.
//!
//! Applications register menu definitions; menuflow renders them into
//! text+keyboard screens, tracks navigation (drill-down, back, replace) in a
//! compact per-chat session record, and resolves button presses back to
//! semantic actions through tamper-resistant tokens. Only the session record
//! is persisted, never rendered content.
//!
//! ## Features
//!
//! - **Session store**: read-modify-write cycles over any key/value backend
//! - **Action tokens**: namespace-scoped, replay-resistant button encoding
//! - **Render registry**: per-render button minting, frozen into the session
//! - **Correlation**: gateway send/edit results folded back asynchronously
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use menuflow::{
//!     Keyboard, Menu, MenuPlugin, MenuSession, MenuState, MemoryStorage, RenderPass,
//!     RenderResult, Result, UpdateScope,
//! };
//! use serde_json::Value;
//!
//! struct MainMenu;
//!
//! #[async_trait]
//! impl Menu for MainMenu {
//!     fn id(&self) -> &str {
//!         "main"
//!     }
//!
//!     async fn render(
//!         &self,
//!         pass: &mut RenderPass,
//!         state: &MenuState,
//!         _session: &MenuSession,
//!     ) -> Result<RenderResult> {
//!         let open = pass.mint("open")?;
//!         Ok(RenderResult::new(format!("menu:{}", state.payload))
//!             .with_keyboard(Keyboard::new().text("Open", open)))
//!     }
//! }
//!
//! async fn run(gateway: Arc<dyn menuflow::GatewayClient>) -> Result<()> {
//!     let plugin = MenuPlugin::builder()
//!         .storage(Arc::new(MemoryStorage::new()))
//!         .gateway(gateway)
//!         .menu(Arc::new(MainMenu))
//!         .build()?;
//!
//!     let scope = UpdateScope::chat(100).with_actor(200);
//!     let mut nav = plugin.controller(scope).await?;
//!     nav.reply("main", Value::from("root"), Default::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod correlate;
pub mod error;
pub mod gateway;
pub mod keyboard;
pub mod logging;
pub mod menu;
pub mod plugin;
pub mod render;
pub mod session;
pub mod storage;
pub mod token;

// Re-export commonly used types
pub use config::{system_clock, Clock, MenuFlowConfig};
pub use controller::{EditOptions, MenuController, ReplyOptions, ShowOptions};
pub use correlate::{CorrelatedGateway, DiagnosticsFn, GatewayId};
pub use error::{MenuFlowError, Result};
pub use gateway::{GatewayClient, SentMessage};
pub use keyboard::{Keyboard, KeyboardButton};
pub use menu::{Menu, MenuRegistry, RenderResult, ResolvedAction};
pub use plugin::{CallbackOutcome, MenuPlugin, MenuPluginBuilder};
pub use render::RenderPass;
pub use session::{
    default_session_key, JsonSessionSerializer, KeyBuilder, MenuButtonState, MenuHistoryEntry,
    MenuSession, MenuState, SessionSerializer, SessionStore, StorageAdapter, UpdateScope,
};
pub use storage::{JsonFileStorage, MemoryStorage};
pub use token::{ActionToken, DEFAULT_NAMESPACE};
