use axum::{routing::get, Router};

use super::handlers::{health, render};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(render))
        .route("/health", get(health))
        .with_state(state)
}
