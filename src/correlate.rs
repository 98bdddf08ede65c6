//! Outgoing-call correlation.
//!
//! `reply`/`edit` render a screen and persist session state before the
//! gateway call happens, so the resulting message id arrives after the fact.
//! The controller queues an expectation here, the wrapped gateway client
//! observes the completed call, matches it back to the oldest structurally
//! compatible expectation, and folds the message id into the stored session.
//!
//! Bookkeeping is strictly best-effort: the gateway call's own result is
//! authoritative and is returned to the caller unchanged no matter what the
//! bookkeeping does.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Clock;
use crate::error::MenuFlowError;
use crate::gateway::{GatewayClient, SentMessage};
use crate::keyboard::Keyboard;
use crate::session::{MenuButtonState, MenuHistoryEntry, SessionStore};
use crate::Result;

/// Callback invoked with every swallowed bookkeeping error.
pub type DiagnosticsFn = Arc<dyn Fn(&MenuFlowError) + Send + Sync>;

static GATEWAY_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque id assigned to a gateway client at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GatewayId(u64);

impl GatewayId {
    fn next() -> Self {
        Self(GATEWAY_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for GatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gw-{:04x}", self.0)
    }
}

/// Which gateway operation an expectation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingKind {
    Send,
    Edit,
}

/// One queued expectation. In-memory only, never persisted.
#[derive(Debug, Clone)]
pub(crate) struct PendingOutgoing {
    pub kind: PendingKind,
    pub session_key: String,
    pub menu_id: String,
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub payload: Value,
    pub path: Vec<String>,
    pub render_id: String,
    pub buttons: Vec<MenuButtonState>,
    /// Target message for edits; `None` matches any edit in the chat.
    pub message_id: Option<i64>,
}

/// Shared bookkeeping context, one per plugin.
pub(crate) struct Correlator {
    store: Arc<SessionStore>,
    namespace: String,
    clock: Clock,
    diagnostics: Option<DiagnosticsFn>,
}

impl Correlator {
    pub fn new(
        store: Arc<SessionStore>,
        namespace: String,
        clock: Clock,
        diagnostics: Option<DiagnosticsFn>,
    ) -> Self {
        Self {
            store,
            namespace,
            clock,
            diagnostics,
        }
    }

    fn report(&self, err: &MenuFlowError) {
        tracing::warn!(error = %err, "menu correlation bookkeeping failed");
        if let Some(diagnostics) = &self.diagnostics {
            diagnostics(err);
        }
    }
}

/// Explicit registry of wrapped gateway clients.
///
/// Registration assigns a [`GatewayId`] and is idempotent per client
/// instance: registering the same `Arc` twice returns the wrapper (and the
/// pending queue) created the first time.
pub(crate) struct GatewayRegistry {
    correlator: Arc<Correlator>,
    entries: Mutex<HashMap<usize, Arc<CorrelatedGateway>>>,
}

impl GatewayRegistry {
    pub fn new(correlator: Arc<Correlator>) -> Self {
        Self {
            correlator,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, client: Arc<dyn GatewayClient>) -> Result<Arc<CorrelatedGateway>> {
        let identity = Arc::as_ptr(&client) as *const () as usize;
        let mut entries = self.entries.lock().map_err(|_| MenuFlowError::LockPoisoned)?;
        if let Some(existing) = entries.get(&identity) {
            return Ok(existing.clone());
        }
        let wrapped = Arc::new(CorrelatedGateway {
            id: GatewayId::next(),
            inner: client,
            correlator: self.correlator.clone(),
            pending: Mutex::new(VecDeque::new()),
        });
        tracing::debug!(gateway = %wrapped.id, "gateway client registered");
        entries.insert(identity, wrapped.clone());
        Ok(wrapped)
    }
}

/// A gateway client with the correlation interceptor wrapped around every
/// call. Hosts route their menu sends/edits through this handle.
pub struct CorrelatedGateway {
    id: GatewayId,
    inner: Arc<dyn GatewayClient>,
    correlator: Arc<Correlator>,
    pending: Mutex<VecDeque<PendingOutgoing>>,
}

impl CorrelatedGateway {
    pub fn id(&self) -> GatewayId {
        self.id
    }

    /// Queue an expectation for the next matching call.
    ///
    /// Called synchronously before the gateway call is issued. If that call
    /// later fails, the entry stays queued; FIFO matching per chat+kind is
    /// the only ordering guarantee.
    pub(crate) fn enqueue(&self, entry: PendingOutgoing) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push_back(entry);
        }
    }

    fn take_matching(
        &self,
        kind: PendingKind,
        chat_id: i64,
        message_id: Option<i64>,
    ) -> Option<PendingOutgoing> {
        let mut pending = self.pending.lock().ok()?;
        let index = pending.iter().position(|entry| {
            entry.kind == kind
                && entry.chat_id == chat_id
                && match (kind, entry.message_id, message_id) {
                    (PendingKind::Send, _, _) => true,
                    (PendingKind::Edit, None, _) => true,
                    (PendingKind::Edit, Some(expected), Some(actual)) => expected == actual,
                    (PendingKind::Edit, Some(_), None) => false,
                }
        })?;
        pending.remove(index)
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Fold a completed call into the stored session.
    async fn settle(
        &self,
        kind: PendingKind,
        chat_id: i64,
        message_id: i64,
        target_message_id: Option<i64>,
    ) -> Result<()> {
        let Some(entry) = self.take_matching(kind, chat_id, target_message_id) else {
            tracing::debug!(
                gateway = %self.id,
                chat_id,
                "completed call had no matching pending entry"
            );
            return Ok(());
        };

        let correlator = &self.correlator;
        let timestamp = (correlator.clock)();
        let mut session = correlator.store.read(&entry.session_key).await?;

        let history_entry = MenuHistoryEntry {
            menu_id: entry.menu_id.clone(),
            message_id: Some(message_id),
            text: entry.text,
            keyboard: entry.keyboard,
            payload: entry.payload.clone(),
            path: entry.path,
            timestamp,
            render_id: entry.render_id,
            buttons: entry.buttons,
        };

        if kind == PendingKind::Edit && !session.history.is_empty() {
            let last = session.history.len() - 1;
            session.history[last] = history_entry;
        } else {
            session.history.push(history_entry);
        }

        if let Some(active) = session.active.as_mut() {
            if active.menu_id == entry.menu_id {
                active.message_id = Some(message_id);
                active.payload = entry.payload;
                active.timestamp = timestamp;
            }
        }

        correlator.store.write(&entry.session_key, &mut session).await
    }

    fn is_menu_call(&self, keyboard: Option<&Keyboard>) -> bool {
        keyboard
            .map(|kb| kb.detect_token(&self.correlator.namespace).is_some())
            .unwrap_or(false)
    }
}

#[async_trait]
impl GatewayClient for CorrelatedGateway {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
        options: Option<&Value>,
    ) -> Result<SentMessage> {
        let sent = self.inner.send_message(chat_id, text, keyboard, options).await?;
        if self.is_menu_call(keyboard) {
            if let Err(err) = self
                .settle(PendingKind::Send, chat_id, sent.message_id, None)
                .await
            {
                self.correlator.report(&err);
            }
        }
        Ok(sent)
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
        options: Option<&Value>,
    ) -> Result<SentMessage> {
        let sent = self
            .inner
            .edit_message_text(chat_id, message_id, text, keyboard, options)
            .await?;
        if self.is_menu_call(keyboard) {
            if let Err(err) = self
                .settle(PendingKind::Edit, chat_id, message_id, Some(message_id))
                .await
            {
                self.correlator.report(&err);
            }
        }
        Ok(sent)
    }
}
