use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::models::{LinkStats, ShortenRequest, ShortenResponse};
use crate::registry::{RegistryError, RegistryService};

pub struct AppState {
    pub registry: Arc<RegistryService>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map registry failures onto HTTP statuses. Storage details stay in the logs.
fn registry_error(err: RegistryError) -> ApiError {
    match err {
        RegistryError::InvalidInput(message) => error_response(StatusCode::BAD_REQUEST, message),
        RegistryError::CodeConflict(_) => {
            error_response(StatusCode::CONFLICT, "Shortcode already exists")
        }
        RegistryError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "URL not found"),
        RegistryError::Expired(_) => error_response(StatusCode::GONE, "Link expired"),
        RegistryError::Exhausted { attempts } => {
            tracing::error!(attempts, "short code generation exhausted");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate unique short code",
            )
        }
        RegistryError::StorageUnavailable(err) => {
            tracing::error!(error = %err, "storage failure while serving API request");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Create a new short link
pub async fn shorten_url(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortenResponse>), ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid request body: {}", rejection.body_text()),
        )
    })?;

    let short_id = state
        .registry
        .create_link(payload.into())
        .await
        .map_err(registry_error)?;

    Ok((StatusCode::CREATED, Json(ShortenResponse { short_id })))
}

/// List every link with its click history
pub async fn list_urls(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LinkStats>>, ApiError> {
    state
        .registry
        .list_statistics()
        .await
        .map(Json)
        .map_err(registry_error)
}

/// Statistics for a single link
pub async fn get_url_stats(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<LinkStats>, ApiError> {
    state
        .registry
        .link_statistics(&code)
        .await
        .map(Json)
        .map_err(registry_error)
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
    })
}
