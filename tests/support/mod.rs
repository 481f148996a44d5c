//! In-memory browser session for exercising the coordinator and gateway.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use prerender_lib::{
    BrowserError, BrowserSession, CdpEvent, Document, DomNode, EventRegistry, EventSubscription,
    NodeId, RenderOptions, TabHandle, LOAD_EVENT,
};
use serde_json::json;

pub const ROOT_NODE_ID: NodeId = 1;

/// Where the next call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Open,
    PageEvents,
    Document,
    MissingRoot,
    OuterHtml,
    Close,
}

/// Open/close window of one tab.
#[derive(Debug, Clone)]
pub struct TabWindow {
    pub url: String,
    pub opened_at: Instant,
    pub closed_at: Option<Instant>,
}

#[derive(Default)]
struct Inner {
    windows: Vec<TabWindow>,
    active: Option<TabHandle>,
    next_id: usize,
    fail_once: Option<FailPoint>,
}

pub struct FakeSession {
    events: EventRegistry,
    inner: Mutex<Inner>,
    open_now: AtomicUsize,
    max_open: AtomicUsize,
    suppress_load: AtomicBool,
    load_delay: Duration,
}

impl FakeSession {
    pub fn new() -> Arc<Self> {
        Self::with_load_delay(Duration::from_millis(5))
    }

    pub fn with_load_delay(load_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            events: EventRegistry::new(),
            inner: Mutex::new(Inner::default()),
            open_now: AtomicUsize::new(0),
            max_open: AtomicUsize::new(0),
            suppress_load: AtomicBool::new(false),
            load_delay,
        })
    }

    pub fn fail_once(&self, point: FailPoint) {
        self.inner.lock().unwrap().fail_once = Some(point);
    }

    /// Stops firing load events until re-enabled.
    pub fn suppress_load(&self, suppress: bool) {
        self.suppress_load.store(suppress, Ordering::SeqCst);
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    pub fn windows(&self) -> Vec<TabWindow> {
        self.inner.lock().unwrap().windows.clone()
    }

    pub fn tabs_opened(&self) -> usize {
        self.inner.lock().unwrap().windows.len()
    }

    pub fn tabs_closed(&self) -> usize {
        self.windows()
            .iter()
            .filter(|w| w.closed_at.is_some())
            .count()
    }

    pub fn open_now(&self) -> usize {
        self.open_now.load(Ordering::SeqCst)
    }

    pub fn max_open(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }

    fn take_failure(&self, point: FailPoint) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_once == Some(point) {
            inner.fail_once = None;
            true
        } else {
            false
        }
    }

    fn active_url(&self) -> Result<String, BrowserError> {
        self.inner
            .lock()
            .unwrap()
            .active
            .as_ref()
            .map(|tab| tab.url.clone())
            .ok_or(BrowserError::NoActiveTab)
    }
}

/// Body the fake "renders" for `url`.
pub fn rendered_html(url: &str) -> String {
    format!("<html><head></head><body data-src=\"{url}\">rendered</body></html>")
}

/// Short timings so failure paths finish quickly.
pub fn fast_options() -> RenderOptions {
    RenderOptions {
        load_timeout: Duration::from_millis(500),
        settle_delay: Duration::from_millis(5),
        command_timeout: Duration::from_secs(1),
    }
}

fn injected(step: &str) -> BrowserError {
    BrowserError::Cdp {
        code: -32000,
        message: format!("injected {step} failure"),
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_tab(&self, url: &str) -> Result<TabHandle, BrowserError> {
        if self.take_failure(FailPoint::Open) {
            return Err(injected("open"));
        }
        let now_open = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now_open, Ordering::SeqCst);

        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let tab = TabHandle::new(format!("TAB-{}", inner.next_id), url);
        inner.windows.push(TabWindow {
            url: url.to_string(),
            opened_at: Instant::now(),
            closed_at: None,
        });
        inner.active = Some(tab.clone());
        Ok(tab)
    }

    async fn close_tab(&self, tab: &TabHandle) -> Result<(), BrowserError> {
        let fail = self.take_failure(FailPoint::Close);
        let mut inner = self.inner.lock().unwrap();
        if inner.active.as_ref() == Some(tab) {
            inner.active = None;
        }
        if fail {
            return Err(injected("close"));
        }
        let index: usize = tab
            .id
            .trim_start_matches("TAB-")
            .parse()
            .map_err(|_| BrowserError::NoActiveTab)?;
        if let Some(window) = inner.windows.get_mut(index - 1) {
            window.closed_at = Some(Instant::now());
        }
        self.open_now.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn page_events(&self, enable: bool) -> Result<(), BrowserError> {
        if self.take_failure(FailPoint::PageEvents) {
            return Err(injected("page events"));
        }
        if enable && !self.suppress_load.load(Ordering::SeqCst) {
            let events = self.events.clone();
            let delay = self.load_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                events.dispatch(CdpEvent {
                    method: LOAD_EVENT.to_string(),
                    params: json!({ "timestamp": 1.0 }),
                });
            });
        }
        Ok(())
    }

    fn subscribe(&self, event: &str) -> EventSubscription {
        self.events.subscribe(event)
    }

    async fn get_document(&self) -> Result<Document, BrowserError> {
        if self.take_failure(FailPoint::Document) {
            return Err(injected("document"));
        }
        if self.take_failure(FailPoint::MissingRoot) {
            return Err(BrowserError::MissingRoot);
        }
        self.active_url()?;
        Ok(Document::new(DomNode {
            node_id: ROOT_NODE_ID,
            node_name: "#document".to_string(),
            document_url: None,
        }))
    }

    async fn get_outer_html(&self, node_id: NodeId) -> Result<String, BrowserError> {
        if self.take_failure(FailPoint::OuterHtml) {
            return Err(injected("outer html"));
        }
        if node_id != ROOT_NODE_ID {
            return Err(BrowserError::Cdp {
                code: -32000,
                message: "Could not find node with given id".to_string(),
            });
        }
        Ok(rendered_html(&self.active_url()?))
    }
}

/// Asserts that no two tab windows overlap in time.
pub fn assert_windows_disjoint(windows: &[TabWindow]) {
    let mut sorted = windows.to_vec();
    sorted.sort_by_key(|w| w.opened_at);
    for pair in sorted.windows(2) {
        let closed = pair[0]
            .closed_at
            .unwrap_or_else(|| panic!("tab for {} was never closed", pair[0].url));
        assert!(
            pair[1].opened_at >= closed,
            "tab for {} opened before tab for {} closed",
            pair[1].url,
            pair[0].url
        );
    }
}
