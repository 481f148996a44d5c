//! HTTP gateway: one render endpoint plus a liveness probe.

pub mod handlers;
pub mod router;

pub use router::build_router;
