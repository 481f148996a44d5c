//! Capability surface of a remote browser session.
//!
//! The render coordinator only depends on [`BrowserSession`]; the DevTools
//! implementation lives in [`super::cdp`]. Event delivery is session-wide:
//! one handler slot per event name, shared by every tab.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use super::dom::{Document, NodeId};
use super::error::Result;

/// Fired by the `Page` domain once a navigated page finished loading.
pub const LOAD_EVENT: &str = "Page.loadEventFired";

/// A remote browser tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabHandle {
    /// DevTools target id.
    pub id: String,
    /// URL the tab was opened for.
    pub url: String,
    /// Page WebSocket endpoint, when the session exposes one.
    pub debugger_url: Option<String>,
}

impl TabHandle {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            debugger_url: None,
        }
    }

    pub fn with_debugger_url(mut self, debugger_url: impl Into<String>) -> Self {
        self.debugger_url = Some(debugger_url.into());
        self
    }
}

/// An event pushed by the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEvent {
    /// The event method name (e.g. "Page.loadEventFired").
    pub method: String,
    pub params: Value,
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Opens a new tab for `url` and makes it the session's active page.
    async fn new_tab(&self, url: &str) -> Result<TabHandle>;

    async fn close_tab(&self, tab: &TabHandle) -> Result<()>;

    /// Turns page-lifecycle event delivery on or off for the active page.
    async fn page_events(&self, enable: bool) -> Result<()>;

    /// Registers the handler for `event`, replacing any existing one.
    fn subscribe(&self, event: &str) -> EventSubscription;

    async fn get_document(&self) -> Result<Document>;

    async fn get_outer_html(&self, node_id: NodeId) -> Result<String>;
}

#[derive(Debug)]
struct Registration {
    id: u64,
    tx: mpsc::UnboundedSender<Value>,
}

/// Session-wide event handler table, one slot per event name.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    slots: Arc<Mutex<HashMap<String, Registration>>>,
    next_id: Arc<AtomicU64>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a fresh handler for `event`. A previous subscriber for the
    /// same name loses its slot and sees its stream end.
    pub fn subscribe(&self, event: &str) -> EventSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .slots
            .lock()
            .insert(event.to_string(), Registration { id, tx });
        if previous.is_some() {
            tracing::debug!(event, "replaced existing event handler");
        }
        EventSubscription {
            event: event.to_string(),
            id,
            rx,
            registry: self.clone(),
        }
    }

    /// Delivers an event to its registered handler, if any.
    /// Returns whether a live handler received it.
    pub fn dispatch(&self, event: CdpEvent) -> bool {
        let slots = self.slots.lock();
        match slots.get(&event.method) {
            Some(registration) => registration.tx.send(event.params).is_ok(),
            None => {
                tracing::trace!(method = %event.method, "no handler for event");
                false
            }
        }
    }

    pub fn is_registered(&self, event: &str) -> bool {
        self.slots.lock().contains_key(event)
    }

    fn unregister(&self, event: &str, id: u64) {
        let mut slots = self.slots.lock();
        if slots.get(event).is_some_and(|r| r.id == id) {
            slots.remove(event);
        }
    }
}

/// A scoped handler registration. Dropping it clears the slot unless a
/// newer subscription already took it over.
#[derive(Debug)]
pub struct EventSubscription {
    event: String,
    id: u64,
    rx: mpsc::UnboundedReceiver<Value>,
    registry: EventRegistry,
}

impl EventSubscription {
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Waits for the next event params. `None` once the slot was replaced
    /// or the registry dropped.
    pub async fn next(&mut self) -> Option<Value> {
        self.rx.recv().await
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.registry.unregister(&self.event, self.id);
    }
}
