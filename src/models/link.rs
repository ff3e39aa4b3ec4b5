use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Referrer recorded when a visit carries no `Referer` header.
pub const DIRECT_SOURCE: &str = "direct";

/// Location recorded when the client address cannot be determined.
pub const UNKNOWN_LOCATION: &str = "unknown";

/// A single successful redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub location: String,
}

/// A stored short link together with its full click history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub clicks: Vec<ClickEvent>,
}

impl LinkRecord {
    /// Returns `None` when `created_at + validity_minutes` is not representable.
    pub fn new(
        code: impl Into<String>,
        original_url: impl Into<String>,
        created_at: DateTime<Utc>,
        validity_minutes: i64,
    ) -> Option<Self> {
        let expires_at = Duration::try_minutes(validity_minutes)
            .and_then(|validity| created_at.checked_add_signed(validity))?;

        Some(Self {
            code: code.into(),
            original_url: original_url.into(),
            created_at,
            expires_at,
            clicks: Vec::new(),
        })
    }

    /// Expiry is inclusive: a link stops resolving at `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> LinkStatus {
        if self.is_expired_at(now) {
            LinkStatus::Expired
        } else {
            LinkStatus::Active
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Active,
    Expired,
}

/// Input to link creation, after transport-level decoding.
#[derive(Debug, Clone, Default)]
pub struct NewLink {
    pub original_url: String,
    pub validity_minutes: Option<i64>,
    pub custom_code: Option<String>,
}

/// Request body of `POST /api/shorten`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenRequest {
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_minutes")]
    pub validity: Option<i64>,
    #[serde(default)]
    pub shortcode: Option<String>,
}

impl From<ShortenRequest> for NewLink {
    fn from(request: ShortenRequest) -> Self {
        Self {
            original_url: request.original_url.unwrap_or_default(),
            validity_minutes: request.validity,
            custom_code: request.shortcode,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_id: String,
}

/// Read-only projection of a link served by the statistics endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStats {
    pub short_code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
    pub status: LinkStatus,
    pub clicks: Vec<ClickEvent>,
}

impl LinkStats {
    pub fn from_record(record: LinkRecord, now: DateTime<Utc>) -> Self {
        let status = record.status_at(now);
        Self {
            short_code: record.code,
            original_url: record.original_url,
            created_at: record.created_at,
            expiry: record.expires_at,
            status,
            clicks: record.clicks,
        }
    }
}

/// Accepts integers, floats (truncated) and numeric strings. Anything else is
/// treated as absent so the default validity applies.
fn lenient_minutes<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| parse_minutes(&v)))
}

fn parse_minutes(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}
