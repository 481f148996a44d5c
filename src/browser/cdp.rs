//! Chrome DevTools implementation of [`BrowserSession`].
//!
//! Tabs are created and closed through the `/json/*` HTTP endpoints; page
//! commands travel as JSON-RPC over the active tab's WebSocket. Responses
//! are correlated by id, events are handed to the session-wide
//! [`EventRegistry`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use super::dom::{outer_html_from_result, Document, NodeId};
use super::error::{BrowserError, Result};
use super::protocol::{
    parse_incoming, BrowserVersion, CdpCommand, CdpResponse, Incoming, TargetInfo,
};
use super::session::{BrowserSession, EventRegistry, EventSubscription, TabHandle};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>>;

/// Turns `host:port` into an HTTP base URL; full URLs are kept as given.
pub fn endpoint_base_url(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// JSON-RPC connection to one page target.
struct PageConnection {
    target_id: String,
    next_id: AtomicU64,
    pending: PendingMap,
    writer: tokio::sync::Mutex<WsSink>,
    reader: JoinHandle<()>,
}

impl PageConnection {
    async fn connect(target_id: &str, ws_url: &str, events: EventRegistry) -> Result<Self> {
        debug!(target_id, url = ws_url, "attaching to page WebSocket");
        let (stream, _) = tokio_tungstenite::connect_async(ws_url).await?;
        let (writer, reader) = stream.split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(Self::read_loop(reader, Arc::clone(&pending), events));

        Ok(Self {
            target_id: target_id.to_string(),
            next_id: AtomicU64::new(1),
            pending,
            writer: tokio::sync::Mutex::new(writer),
            reader,
        })
    }

    async fn send_command(&self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let json = serde_json::to_string(&CdpCommand { id, method, params })?;

        // Register before sending so a fast reply cannot slip past us.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        trace!(id, method, "sending CDP command");
        let sent = self.writer.lock().await.send(Message::Text(json.into())).await;
        if let Err(err) = sent {
            self.pending.lock().remove(&id);
            return Err(err.into());
        }

        let response = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(BrowserError::WebSocket(
                    "connection closed before the response arrived".to_string(),
                ))
            }
            Err(_) => {
                self.pending.lock().remove(&id);
                return Err(BrowserError::Timeout {
                    method: method.to_string(),
                    duration: timeout,
                });
            }
        };

        if let Some(err) = response.error {
            return Err(BrowserError::Cdp {
                code: err.code,
                message: err.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn read_loop(mut reader: WsSource, pending: PendingMap, events: EventRegistry) {
        while let Some(frame) = reader.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text.as_str().to_string(),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(_) => continue,
                },
                Ok(Message::Close(_)) => {
                    debug!("page WebSocket closed by remote");
                    break;
                }
                Ok(_) => continue,
                Err(err) => {
                    warn!(error = %err, "page WebSocket read failed, stopping reader");
                    break;
                }
            };

            match parse_incoming(&text) {
                Some(Incoming::Response(response)) => {
                    let waiter = pending.lock().remove(&response.id);
                    match waiter {
                        Some(tx) => {
                            let _ = tx.send(response);
                        }
                        None => debug!(id = response.id, "response for unknown command id"),
                    }
                }
                Some(Incoming::Event(event)) => {
                    trace!(method = %event.method, "CDP event");
                    events.dispatch(event);
                }
                None => debug!("ignoring unrecognized CDP frame"),
            }
        }

        // Dropping the senders wakes every waiter with a closed-channel error.
        pending.lock().clear();
    }
}

impl Drop for PageConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// A connection to a Chrome instance started with `--remote-debugging-port`.
pub struct CdpSession {
    http: reqwest::Client,
    base_url: String,
    command_timeout: Duration,
    version: BrowserVersion,
    events: EventRegistry,
    active: Mutex<Option<Arc<PageConnection>>>,
}

impl CdpSession {
    /// Connects to the DevTools endpoint (`host:port` or an HTTP URL) and
    /// checks that it answers `/json/version`.
    pub async fn connect(endpoint: &str, command_timeout: Duration) -> Result<Self> {
        let base_url = endpoint_base_url(endpoint);
        let connection_failed = |err: reqwest::Error| BrowserError::ConnectionFailed {
            url: base_url.clone(),
            reason: err.to_string(),
        };

        let http = reqwest::Client::builder()
            .timeout(command_timeout)
            .build()
            .map_err(connection_failed)?;

        let version: BrowserVersion = http
            .get(format!("{base_url}/json/version"))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(connection_failed)?
            .json()
            .await
            .map_err(connection_failed)?;

        info!(
            endpoint = %base_url,
            browser = %version.browser,
            protocol = %version.protocol_version,
            "connected to Chrome DevTools"
        );

        Ok(Self {
            http,
            base_url,
            command_timeout,
            version,
            events: EventRegistry::new(),
            active: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn browser_version(&self) -> &BrowserVersion {
        &self.version
    }

    async fn command(&self, method: &str, params: Value) -> Result<Value> {
        let page = self.active.lock().clone().ok_or(BrowserError::NoActiveTab)?;
        page.send_command(method, params, self.command_timeout).await
    }

    async fn create_target(&self) -> Result<TargetInfo> {
        let target = self
            .http
            .put(format!("{}/json/new?about:blank", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json::<TargetInfo>()
            .await?;
        Ok(target)
    }

    async fn close_target(&self, target_id: &str) -> Result<()> {
        self.http
            .get(format!("{}/json/close/{}", self.base_url, target_id))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Closes a target that never became usable. The open error wins; a
    /// close failure is only logged.
    async fn discard_target(&self, target_id: &str) {
        if let Err(close_err) = self.close_target(target_id).await {
            warn!(tab_id = %target_id, error = %close_err, "failed to close tab, tab leaked");
        }
    }

    /// `Page.enable` goes out before navigating so the load event of the
    /// target URL cannot fire unobserved.
    async fn navigate(&self, url: &str) -> Result<()> {
        self.command("Page.enable", json!({})).await?;
        let result = self.command("Page.navigate", json!({ "url": url })).await?;
        if let Some(reason) = result.get("errorText").and_then(Value::as_str) {
            return Err(BrowserError::NavigationFailed {
                url: url.to_string(),
                reason: reason.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn new_tab(&self, url: &str) -> Result<TabHandle> {
        let target = self.create_target().await?;
        let Some(ws_url) = target.web_socket_debugger_url.clone() else {
            self.discard_target(&target.id).await;
            return Err(BrowserError::protocol(format!(
                "target {} has no webSocketDebuggerUrl",
                target.id
            )));
        };

        let page = match PageConnection::connect(&target.id, &ws_url, self.events.clone()).await {
            Ok(page) => Arc::new(page),
            Err(err) => {
                self.discard_target(&target.id).await;
                return Err(err);
            }
        };
        *self.active.lock() = Some(page);

        let tab = TabHandle::new(target.id, url).with_debugger_url(ws_url);
        if let Err(err) = self.navigate(url).await {
            if let Err(close_err) = self.close_tab(&tab).await {
                warn!(tab_id = %tab.id, error = %close_err, "failed to close tab, tab leaked");
            }
            return Err(err);
        }

        debug!(tab_id = %tab.id, url, "opened tab");
        Ok(tab)
    }

    async fn close_tab(&self, tab: &TabHandle) -> Result<()> {
        {
            let mut active = self.active.lock();
            if active.as_ref().is_some_and(|page| page.target_id == tab.id) {
                active.take();
            }
        }
        self.close_target(&tab.id).await?;
        debug!(tab_id = %tab.id, "closed tab");
        Ok(())
    }

    async fn page_events(&self, enable: bool) -> Result<()> {
        let method = if enable { "Page.enable" } else { "Page.disable" };
        self.command(method, json!({})).await?;
        Ok(())
    }

    fn subscribe(&self, event: &str) -> EventSubscription {
        self.events.subscribe(event)
    }

    async fn get_document(&self) -> Result<Document> {
        let result = self.command("DOM.getDocument", json!({})).await?;
        Document::from_result(result)
    }

    async fn get_outer_html(&self, node_id: NodeId) -> Result<String> {
        let result = self
            .command("DOM.getOuterHTML", json!({ "nodeId": node_id }))
            .await?;
        outer_html_from_result(result)
    }
}
