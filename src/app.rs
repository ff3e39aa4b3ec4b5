use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware, Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::api::create_api_router;
use crate::config::{ClientIpConfig, CorsConfig};
use crate::middleware::log_request;
use crate::redirect::create_redirect_router;
use crate::registry::RegistryService;

/// Build the full HTTP surface: API, redirects, request log and CORS.
pub fn create_app(
    registry: Arc<RegistryService>,
    client_ip: ClientIpConfig,
    cors: &CorsConfig,
) -> anyhow::Result<Router> {
    let router = create_api_router(Arc::clone(&registry))
        .merge(create_redirect_router(registry, client_ip))
        .layer(middleware::from_fn(log_request))
        .layer(cors_layer(cors)?);

    Ok(router)
}

fn cors_layer(config: &CorsConfig) -> anyhow::Result<CorsLayer> {
    let allow_origin = if config.allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = config
            .allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("invalid origin in CORS_ALLOWED_ORIGINS: {origin}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}
