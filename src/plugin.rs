//! Plugin assembly and the host-pipeline surface.
//!
//! The host middleware obtains one [`MenuController`] per inbound update and
//! hands button-press callback data to [`MenuPlugin::handle_callback`]. Both
//! entry points derive the segmentation key from the update's chat scope.

use std::sync::Arc;

use crate::config::{system_clock, Clock, MenuFlowConfig};
use crate::controller::MenuController;
use crate::correlate::{CorrelatedGateway, Correlator, DiagnosticsFn, GatewayRegistry};
use crate::error::MenuFlowError;
use crate::gateway::GatewayClient;
use crate::menu::{Menu, MenuRegistry, ResolvedAction};
use crate::session::{
    default_session_key, JsonSessionSerializer, KeyBuilder, SessionSerializer, SessionStore,
    StorageAdapter, UpdateScope,
};
use crate::Result;

/// What handling a button press amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The token resolved and the owning menu's `on_action` ran.
    Handled(ResolvedAction),
    /// Foreign or stale callback data; the host should fall through to its
    /// other handlers.
    Unresolved,
}

/// The assembled menu subsystem.
pub struct MenuPlugin {
    registry: Arc<MenuRegistry>,
    store: Arc<SessionStore>,
    gateway_registry: GatewayRegistry,
    gateway: Arc<CorrelatedGateway>,
    namespace: String,
    clock: Clock,
    key_builder: Option<KeyBuilder>,
}

impl std::fmt::Debug for MenuPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuPlugin")
            .field("namespace", &self.namespace)
            .field("menus", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl MenuPlugin {
    pub fn builder() -> MenuPluginBuilder {
        MenuPluginBuilder::default()
    }

    /// The correlation-wrapped gateway client menu sends must go through.
    pub fn gateway(&self) -> Arc<CorrelatedGateway> {
        self.gateway.clone()
    }

    /// Wrap an additional gateway client instance.
    ///
    /// Idempotent per instance: the same client gets the same wrapper (and
    /// pending queue) back.
    pub fn register_gateway(
        &self,
        client: Arc<dyn GatewayClient>,
    ) -> Result<Arc<CorrelatedGateway>> {
        self.gateway_registry.register(client)
    }

    /// Derive the segmentation key for `scope`.
    pub fn session_key(&self, scope: &UpdateScope) -> Result<String> {
        match &self.key_builder {
            Some(builder) => builder(scope),
            None => Ok(default_session_key(scope)),
        }
    }

    /// Build the per-update navigation controller.
    pub async fn controller(&self, scope: UpdateScope) -> Result<MenuController> {
        let key = self.session_key(&scope)?;
        let session = self.store.read(&key).await?;
        Ok(MenuController::new(
            self.registry.clone(),
            self.store.clone(),
            self.gateway.clone(),
            self.namespace.clone(),
            self.clock.clone(),
            scope,
            key,
            session,
        ))
    }

    /// Decode, resolve, and dispatch one button press.
    pub async fn handle_callback(
        &self,
        scope: UpdateScope,
        callback_data: &str,
    ) -> Result<CallbackOutcome> {
        let mut controller = self.controller(scope).await?;
        let Some(action) = controller.parse_action_data(callback_data) else {
            tracing::debug!(data = callback_data, "callback data did not resolve");
            return Ok(CallbackOutcome::Unresolved);
        };

        // The minting menu handles its own buttons; fall back to the menu
        // currently on screen when the definition has since been dropped.
        let menu = self
            .registry
            .get(&action.menu_id)
            .or_else(|| {
                controller
                    .current()
                    .and_then(|state| self.registry.get(&state.menu_id))
            })
            .cloned();
        let Some(menu) = menu else {
            return Ok(CallbackOutcome::Unresolved);
        };

        menu.on_action(&mut controller, &action).await?;
        Ok(CallbackOutcome::Handled(action))
    }
}

/// Builder for [`MenuPlugin`].
#[derive(Default)]
pub struct MenuPluginBuilder {
    config: MenuFlowConfig,
    storage: Option<Arc<dyn StorageAdapter>>,
    gateway: Option<Arc<dyn GatewayClient>>,
    menus: Vec<Arc<dyn Menu>>,
    serializer: Option<Arc<dyn SessionSerializer>>,
    key_builder: Option<KeyBuilder>,
    clock: Option<Clock>,
    diagnostics: Option<DiagnosticsFn>,
}

impl MenuPluginBuilder {
    pub fn config(mut self, config: MenuFlowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, adapter: Arc<dyn StorageAdapter>) -> Self {
        self.storage = Some(adapter);
        self
    }

    pub fn gateway(mut self, client: Arc<dyn GatewayClient>) -> Self {
        self.gateway = Some(client);
        self
    }

    pub fn menu(mut self, menu: Arc<dyn Menu>) -> Self {
        self.menus.push(menu);
        self
    }

    pub fn menus(mut self, menus: impl IntoIterator<Item = Arc<dyn Menu>>) -> Self {
        self.menus.extend(menus);
        self
    }

    /// Replace the default JSON session serializer.
    pub fn serializer(mut self, serializer: Arc<dyn SessionSerializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Replace the default chat/thread/actor key derivation.
    pub fn key_builder(mut self, builder: KeyBuilder) -> Self {
        self.key_builder = Some(builder);
        self
    }

    /// Replace the wall clock (tests pin timestamps through this).
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Receive every swallowed correlation bookkeeping error.
    pub fn diagnostics(mut self, diagnostics: DiagnosticsFn) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Validate the configuration and assemble the plugin.
    pub fn build(self) -> Result<MenuPlugin> {
        let storage = self.storage.ok_or(MenuFlowError::MissingStorage)?;
        let gateway_client = self.gateway.ok_or(MenuFlowError::MissingGateway)?;
        let registry = Arc::new(MenuRegistry::new(self.menus)?);

        let serializer = self
            .serializer
            .unwrap_or_else(|| Arc::new(JsonSessionSerializer));
        let clock = self.clock.unwrap_or_else(system_clock);
        let store = Arc::new(SessionStore::new(
            storage,
            serializer,
            self.config.history_limit,
        ));

        let correlator = Arc::new(Correlator::new(
            store.clone(),
            self.config.namespace.clone(),
            clock.clone(),
            self.diagnostics,
        ));
        let gateway_registry = GatewayRegistry::new(correlator);
        let gateway = gateway_registry.register(gateway_client)?;

        tracing::debug!(
            menus = registry.len(),
            namespace = %self.config.namespace,
            "menu plugin assembled"
        );

        Ok(MenuPlugin {
            registry,
            store,
            gateway_registry,
            gateway,
            namespace: self.config.namespace,
            clock,
            key_builder: self.key_builder,
        })
    }
}
