//! Prerender Library
//!
//! Serves JavaScript-rendered HTML for arbitrary URLs. Pages are rendered
//! in a remote Chrome instance driven over the DevTools protocol, one at a
//! time, and the result is cached for a fixed TTL.
//!
//! # Module Overview
//!
//! - [`browser`] - Browser session capability, DevTools client, render coordinator
//! - [`cache`] - TTL cache of rendered pages keyed by literal URL
//! - [`web`] - axum gateway (`GET /?url=...`, `GET /health`)
//! - [`config`] - Configuration file support
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```no_run
//! use prerender_lib::{connect_session, serve, Config};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> prerender_lib::Result<()> {
//! let config = Config::default();
//! let session = connect_session(&config).await?;
//! serve(config, session, CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod cache;
pub mod config;
pub mod error;
pub mod state;
pub mod telemetry;
pub mod web;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

// Browser module re-exports
pub use browser::{
    BrowserError, BrowserSession, CdpEvent, CdpSession, Document, DomNode, EventRegistry,
    EventSubscription, NodeId, RenderCoordinator, RenderOptions, TabHandle, LOAD_EVENT,
};
pub use cache::TtlCache;
pub use config::Config;
pub use error::{ErrorCategory, PrerenderError, RenderError, RenderStep, Result};
pub use state::AppState;
pub use web::build_router;

/// Connects to the configured DevTools endpoint. Failure here is fatal for
/// the service.
pub async fn connect_session(config: &Config) -> Result<Arc<dyn BrowserSession>> {
    let session = CdpSession::connect(&config.chrome, config.render.command_timeout)
        .await
        .map_err(|source| PrerenderError::connection(&config.chrome, source))?;
    Ok(Arc::new(session))
}

/// Wires cache and coordinator around `session` into app state.
pub fn build_state(config: &Config, session: Arc<dyn BrowserSession>) -> AppState {
    let cache = Arc::new(TtlCache::new(config.cache.ttl));
    let coordinator = Arc::new(RenderCoordinator::new(session, config.render_options()));
    AppState::new(cache, coordinator)
}

/// Runs the gateway on `config.listen` until `shutdown` fires.
pub async fn serve(
    config: Config,
    session: Arc<dyn BrowserSession>,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(config.listen.as_str()).await?;
    serve_with_listener(listener, config, session, shutdown).await
}

/// Same as [`serve`] on an already bound listener.
///
/// When `shutdown` fires the coordinator is shut down right away, so an
/// in-flight render fails with `Cancelled` and queued callers get
/// `Unavailable` instead of holding the graceful drain open.
pub async fn serve_with_listener(
    listener: TcpListener,
    config: Config,
    session: Arc<dyn BrowserSession>,
    shutdown: CancellationToken,
) -> Result<()> {
    let state = build_state(&config, session);
    state
        .cache
        .spawn_sweeper(config.cache.sweep_interval, shutdown.child_token());
    let coordinator = Arc::clone(&state.coordinator);

    info!(addr = %listener.local_addr()?, chrome = %config.chrome, "listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("shutting down");
            coordinator.shutdown();
        })
        .await?;

    Ok(())
}
