use std::sync::Arc;

use crate::browser::RenderCoordinator;
use crate::cache::TtlCache;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<TtlCache>,
    pub coordinator: Arc<RenderCoordinator>,
}

impl AppState {
    pub fn new(cache: Arc<TtlCache>, coordinator: Arc<RenderCoordinator>) -> Self {
        Self { cache, coordinator }
    }
}
