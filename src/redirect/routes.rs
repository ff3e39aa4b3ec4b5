use axum::{routing::get, Router};
use std::sync::Arc;

use crate::config::ClientIpConfig;
use crate::registry::RegistryService;

use super::handlers::{redirect_url, RedirectState};

pub fn create_redirect_router(registry: Arc<RegistryService>, client_ip: ClientIpConfig) -> Router {
    let state = Arc::new(RedirectState {
        registry,
        client_ip,
    });

    Router::new()
        .route("/{code}", get(redirect_url))
        .with_state(state)
}
