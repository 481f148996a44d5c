//! Browser automation: the session capability surface, its DevTools
//! implementation, and the single-flight render coordinator.
//!
//! # Module Structure
//!
//! - [`session`] - The `BrowserSession` trait and scoped event subscriptions
//! - [`cdp`] - Chrome DevTools implementation over HTTP and WebSocket
//! - [`manager`] - Render coordination with exclusive session access
//! - [`dom`] - Typed DOM responses
//!
//! # Example
//!
//! ```no_run
//! use prerender_lib::{CdpSession, RenderCoordinator, RenderOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> prerender_lib::Result<()> {
//! let options = RenderOptions::default();
//! let session = CdpSession::connect("localhost:9222", options.command_timeout)
//!     .await
//!     .map_err(|source| prerender_lib::PrerenderError::connection("localhost:9222", source))?;
//! let coordinator = RenderCoordinator::new(Arc::new(session), options);
//! let html = coordinator.render("https://example.com").await?;
//! println!("{} bytes of rendered HTML", html.len());
//! # Ok(())
//! # }
//! ```

pub mod cdp;
pub mod dom;
pub mod error;
mod manager;
pub mod protocol;
pub mod session;

pub use cdp::CdpSession;
pub use dom::{Document, DomNode, NodeId};
pub use error::BrowserError;
pub use manager::{
    RenderCoordinator, RenderOptions, DEFAULT_COMMAND_TIMEOUT, DEFAULT_LOAD_TIMEOUT,
    DEFAULT_SETTLE_DELAY,
};
pub use session::{
    BrowserSession, CdpEvent, EventRegistry, EventSubscription, TabHandle, LOAD_EVENT,
};
