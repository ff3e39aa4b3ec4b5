use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::registry::RegistryService;

use super::handlers::{get_url_stats, health_check, list_urls, shorten_url, AppState};

pub fn create_api_router(registry: Arc<RegistryService>) -> Router {
    let state = Arc::new(AppState { registry });

    Router::new()
        .route("/health", get(health_check))
        .route("/api/shorten", post(shorten_url))
        .route("/api/urls", get(list_urls))
        .route("/api/urls/{code}", get(get_url_stats))
        .with_state(state)
}
