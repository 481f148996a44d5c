use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, error};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RenderQuery {
    pub url: Option<String>,
}

/// `GET /?url=...`: cached HTML when fresh, otherwise a new render.
/// Failures carry no body; the detail only goes to the log.
pub async fn render(State(state): State<AppState>, Query(query): Query<RenderQuery>) -> Response {
    let Some(url) = query.url.filter(|url| !url.is_empty()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    if let Some(html) = state.cache.get(&url) {
        debug!(%url, bytes = html.len(), "served from cache");
        return html_response(html);
    }

    match state.coordinator.render(&url).await {
        Ok(html) => {
            state.cache.set_default(url, html.clone());
            html_response(html)
        }
        Err(err) => {
            error!(%url, error = %err, category = %err.category(), "render request failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}

fn html_response(html: Bytes) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response()
}
