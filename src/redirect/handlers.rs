use axum::{
    extract::{ConnectInfo, FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::clicks::{extract_client_ip, ClickContext};
use crate::config::ClientIpConfig;
use crate::registry::{RegistryError, RegistryService};

pub struct RedirectState {
    pub registry: Arc<RegistryService>,
    pub client_ip: ClientIpConfig,
}

/// Socket peer of the request, if the server was started with connect info.
///
/// Unlike `ConnectInfo`, a missing peer is not a rejection: the click is
/// recorded with an unknown location instead.
pub struct PeerAddr(pub Option<SocketAddr>);

impl<S> FromRequestParts<S> for PeerAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let addr = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|ConnectInfo(addr)| addr);
        Ok(PeerAddr(addr))
    }
}

/// Redirect to original URL
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
    PeerAddr(peer): PeerAddr,
    headers: HeaderMap,
) -> Response {
    let client_addr =
        peer.map(|addr| extract_client_ip(&headers, addr.ip(), &state.client_ip));
    let context = ClickContext::new(ClickContext::referrer_from_headers(&headers), client_addr);

    match state.registry.resolve_link(&code, context).await {
        Ok(original_url) => match HeaderValue::from_str(&original_url) {
            Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            Err(err) => {
                tracing::error!(short_code = %code, error = %err, "stored URL is not a valid Location header");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        },
        Err(RegistryError::NotFound(_)) => (StatusCode::NOT_FOUND, "Link not found").into_response(),
        Err(RegistryError::Expired(_)) => (StatusCode::GONE, "Link expired").into_response(),
        Err(err) => {
            tracing::error!(short_code = %code, error = %err, "failed to resolve short code");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}
