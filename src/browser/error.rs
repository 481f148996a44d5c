//! Error types for the browser session layer.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the automation endpoint.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The DevTools HTTP endpoint could not be reached at startup.
    #[error("failed to connect to Chrome DevTools at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// A DevTools HTTP request (`/json/*`) failed.
    #[error("DevTools HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The page WebSocket failed or closed.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Unexpected message shape (serialization, missing fields, etc.).
    #[error("CDP protocol error: {detail}")]
    Protocol { detail: String },

    /// A CDP command returned an error response.
    #[error("CDP error {code}: {message}")]
    Cdp { code: i64, message: String },

    /// A CDP command timed out waiting for a response.
    #[error("CDP command '{method}' timed out after {duration:?}")]
    Timeout { method: String, duration: Duration },

    /// `Page.navigate` reported an error for the target URL.
    #[error("navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    /// `DOM.getDocument` answered without a root node.
    #[error("document response has no root node")]
    MissingRoot,

    /// A page-level command was issued with no tab attached.
    #[error("no tab is attached to the session")]
    NoActiveTab,

    /// The event subscription was replaced or its session went away.
    #[error("subscription for '{event}' closed before the event fired")]
    SubscriptionClosed { event: String },
}

impl BrowserError {
    pub(crate) fn protocol(detail: impl Into<String>) -> Self {
        BrowserError::Protocol {
            detail: detail.into(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BrowserError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        BrowserError::WebSocket(err.to_string())
    }
}

impl From<serde_json::Error> for BrowserError {
    fn from(err: serde_json::Error) -> Self {
        BrowserError::protocol(format!("malformed CDP payload: {err}"))
    }
}

pub type Result<T, E = BrowserError> = std::result::Result<T, E>;
