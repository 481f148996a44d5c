//! Render coordinator with exclusive access to the browser session.
//!
//! Event handlers are registered session-wide rather than per tab, so two
//! renders in flight would observe each other's load events. The
//! coordinator therefore holds a single permit: at most one render runs
//! at any instant, from tab open to tab close.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::BrowserError;
use super::session::{BrowserSession, EventSubscription, TabHandle, LOAD_EVENT};
use crate::error::{RenderError, RenderStep};

/// Default bound on the wait for the page load event.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Default pause after the load event before the DOM is read.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Default bound on any single DevTools command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Timing knobs for a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// How long to wait for the load event before giving up.
    pub load_timeout: Duration,
    /// Pause after the load event so post-load scripts can touch the DOM.
    /// A heuristic: pages that keep mutating later are captured mid-flight.
    pub settle_delay: Duration,
    /// Timeout for each DevTools command.
    pub command_timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// Serializes renders against one [`BrowserSession`].
pub struct RenderCoordinator {
    session: Arc<dyn BrowserSession>,
    options: RenderOptions,
    permit: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl RenderCoordinator {
    pub fn new(session: Arc<dyn BrowserSession>, options: RenderOptions) -> Self {
        Self {
            session,
            options,
            permit: Arc::new(Semaphore::new(1)),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Whether a render currently holds the session.
    pub fn is_busy(&self) -> bool {
        self.permit.available_permits() == 0
    }

    /// Renders `url` and returns the document's outer HTML.
    ///
    /// Waits for any render in progress to finish first. Once the session
    /// is acquired the job runs on its own task, so a caller that stops
    /// waiting cannot strand an open tab or the permit.
    pub async fn render(&self, url: &str) -> Result<Bytes, RenderError> {
        if self.shutdown.is_cancelled() {
            return Err(RenderError::Unavailable);
        }

        let permit = Arc::clone(&self.permit)
            .acquire_owned()
            .await
            .map_err(|_| RenderError::Unavailable)?;

        let job = RenderJob::new(url);
        let session = Arc::clone(&self.session);
        let options = self.options.clone();
        let shutdown = self.shutdown.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            job.run(session.as_ref(), &options, &shutdown).await
        });

        match handle.await {
            Ok(result) => result,
            Err(err) => {
                error!(url, error = %err, "render task aborted");
                Err(RenderError::Unavailable)
            }
        }
    }

    /// Fails in-flight renders (their tabs still get closed) and refuses
    /// new ones.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.permit.close();
    }
}

/// One URL's trip through open → load → extract → close.
struct RenderJob {
    url: String,
    buffer: Vec<u8>,
    started: Instant,
}

impl RenderJob {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            buffer: Vec::new(),
            started: Instant::now(),
        }
    }

    async fn run(
        mut self,
        session: &dyn BrowserSession,
        options: &RenderOptions,
        shutdown: &CancellationToken,
    ) -> Result<Bytes, RenderError> {
        // Subscribe before the tab exists: the load event may arrive as
        // soon as navigation starts.
        let mut load = session.subscribe(LOAD_EVENT);

        debug!(url = %self.url, "opening tab");
        let tab = match session.new_tab(&self.url).await {
            Ok(tab) => tab,
            Err(source) => {
                let err = RenderError::step(RenderStep::OpenTab, source);
                warn!(url = %self.url, error = %err, category = %err.category(), "render failed");
                return Err(err);
            }
        };

        let outcome = tokio::select! {
            result = self.extract(session, &tab, &mut load, options) => result,
            _ = shutdown.cancelled() => Err(RenderError::Cancelled),
        };

        drop(load);
        let closed = session.close_tab(&tab).await;
        self.finish(&tab, outcome, closed)
    }

    async fn extract(
        &mut self,
        session: &dyn BrowserSession,
        tab: &TabHandle,
        load: &mut EventSubscription,
        options: &RenderOptions,
    ) -> Result<(), RenderError> {
        session
            .page_events(true)
            .await
            .map_err(|source| RenderError::step(RenderStep::EnablePageEvents, source))?;

        debug!(url = %self.url, tab_id = %tab.id, "awaiting load event");
        match timeout(options.load_timeout, load.next()).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(RenderError::step(
                    RenderStep::AwaitLoad,
                    BrowserError::SubscriptionClosed {
                        event: load.event().to_string(),
                    },
                ))
            }
            Err(_) => {
                return Err(RenderError::LoadTimeout {
                    timeout: options.load_timeout,
                })
            }
        }

        if !options.settle_delay.is_zero() {
            sleep(options.settle_delay).await;
        }

        debug!(url = %self.url, tab_id = %tab.id, "extracting document");
        let document = session
            .get_document()
            .await
            .map_err(|source| RenderError::step(RenderStep::QueryDocument, source))?;
        let html = session
            .get_outer_html(document.root_node_id())
            .await
            .map_err(|source| RenderError::step(RenderStep::FetchOuterHtml, source))?;

        self.buffer.extend_from_slice(html.as_bytes());
        Ok(())
    }

    fn finish(
        self,
        tab: &TabHandle,
        outcome: Result<(), RenderError>,
        closed: Result<(), BrowserError>,
    ) -> Result<Bytes, RenderError> {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;

        if let Err(err) = &closed {
            warn!(
                tab_id = %tab.id,
                url = %self.url,
                error = %err,
                "failed to close tab, tab leaked"
            );
        }

        let err = match (outcome, closed) {
            (Ok(()), Ok(())) => {
                info!(
                    url = %self.url,
                    tab_id = %tab.id,
                    bytes = self.buffer.len(),
                    elapsed_ms,
                    "rendered page"
                );
                return Ok(Bytes::from(self.buffer));
            }
            (Ok(()), Err(source)) => RenderError::step(RenderStep::CloseTab, source),
            (Err(err), _) => err,
        };

        warn!(
            url = %self.url,
            tab_id = %tab.id,
            step = ?err.failed_step(),
            category = %err.category(),
            error = %err,
            elapsed_ms,
            "render failed"
        );
        Err(err)
    }
}
