//! Click recording: turns request metadata into stored click events.

pub mod ip_extractor;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use std::net::IpAddr;

use crate::models::{ClickEvent, DIRECT_SOURCE, UNKNOWN_LOCATION};

pub use ip_extractor::extract_client_ip;

/// Request metadata captured for a redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickContext {
    pub referrer: Option<String>,
    pub client_addr: Option<IpAddr>,
}

impl ClickContext {
    pub fn new(referrer: Option<String>, client_addr: Option<IpAddr>) -> Self {
        Self {
            referrer,
            client_addr,
        }
    }

    /// Read the `Referer` header. Blank or non-UTF-8 values count as absent.
    pub fn referrer_from_headers(headers: &HeaderMap) -> Option<String> {
        headers
            .get(header::REFERER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn into_event(self, timestamp: DateTime<Utc>) -> ClickEvent {
        ClickEvent {
            timestamp,
            source: self
                .referrer
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DIRECT_SOURCE.to_string()),
            location: self
                .client_addr
                .map(|addr| addr.to_string())
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        }
    }
}
