use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Log method, path, status and latency of every request.
pub async fn log_request(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Endpoint {method} {path} hit"
    );
    response
}
