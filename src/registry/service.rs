use std::sync::Arc;

use url::Url;

use crate::clicks::ClickContext;
use crate::clock::{Clock, SystemClock};
use crate::codegen::{validate_custom_code, CodeGenerator, RandomCodeGenerator};
use crate::config::RegistryConfig;
use crate::events::{EventKind, EventSink, ServiceEvent, TracingEventSink};
use crate::models::{LinkRecord, LinkStats, NewLink};
use crate::registry::{RegistryError, RegistryResult};
use crate::storage::LinkStore;

/// Creates and resolves short links on top of a [`LinkStore`].
///
/// The store is the only place records are mutated; the service decides
/// *whether* to insert or append, never how.
pub struct RegistryService {
    store: Arc<dyn LinkStore>,
    generator: Arc<dyn CodeGenerator>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    config: RegistryConfig,
}

impl RegistryService {
    pub fn new(store: Arc<dyn LinkStore>, config: RegistryConfig) -> Self {
        Self {
            store,
            generator: Arc::new(RandomCodeGenerator),
            clock: Arc::new(SystemClock),
            events: Arc::new(TracingEventSink::default()),
            config,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Register a new link and return its short code.
    pub async fn create_link(&self, new_link: NewLink) -> RegistryResult<String> {
        let original_url = match validate_url(&new_link.original_url) {
            Ok(url) => url,
            Err(reason) => {
                self.events.emit(ServiceEvent::error(EventKind::Shorten, reason.clone()));
                return Err(RegistryError::InvalidInput(reason));
            }
        };

        let validity_minutes = new_link
            .validity_minutes
            .filter(|minutes| *minutes > 0)
            .unwrap_or(self.config.default_validity_minutes);

        let custom_code = new_link
            .custom_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty());

        let code = match custom_code {
            Some(code) => self.insert_custom(code, &original_url, validity_minutes).await?,
            None => self.insert_generated(&original_url, validity_minutes).await?,
        };

        self.events.emit(ServiceEvent::info(
            EventKind::Shorten,
            format!("Created shortId {code} for URL {original_url}"),
        ));
        Ok(code)
    }

    async fn insert_custom(
        &self,
        code: &str,
        original_url: &str,
        validity_minutes: i64,
    ) -> RegistryResult<String> {
        if let Err(reason) = validate_custom_code(code) {
            self.events.emit(ServiceEvent::error(EventKind::Shorten, reason.clone()));
            return Err(RegistryError::InvalidInput(reason));
        }

        let record = self.build_record(code, original_url, validity_minutes)?;
        if !self.store.try_insert(&record).await? {
            self.events.emit(ServiceEvent::error(
                EventKind::Shorten,
                format!("Shortcode collision: {code}"),
            ));
            return Err(RegistryError::CodeConflict(code.to_string()));
        }

        Ok(record.code)
    }

    fn build_record(
        &self,
        code: impl Into<String>,
        original_url: &str,
        validity_minutes: i64,
    ) -> RegistryResult<LinkRecord> {
        LinkRecord::new(code, original_url, self.clock.now(), validity_minutes).ok_or_else(|| {
            let reason = format!("Validity of {validity_minutes} minutes is out of range");
            self.events.emit(ServiceEvent::error(EventKind::Shorten, reason.clone()));
            RegistryError::InvalidInput(reason)
        })
    }

    async fn insert_generated(
        &self,
        original_url: &str,
        validity_minutes: i64,
    ) -> RegistryResult<String> {
        let attempts = self.config.max_generation_attempts;

        for attempt in 1..=attempts {
            let code = self.generator.generate();
            let record = self.build_record(code, original_url, validity_minutes)?;

            if self.store.try_insert(&record).await? {
                return Ok(record.code);
            }

            tracing::debug!(short_code = %record.code, attempt, "generated short code collided");
        }

        self.events.emit(ServiceEvent::error(
            EventKind::Shorten,
            format!("Gave up generating a short code after {attempts} attempts"),
        ));
        Err(RegistryError::Exhausted { attempts })
    }

    /// Resolve `code` to its destination, recording the click.
    ///
    /// Success is only reported once the click is stored.
    pub async fn resolve_link(&self, code: &str, context: ClickContext) -> RegistryResult<String> {
        let Some(record) = self.store.get(code).await? else {
            self.events.emit(ServiceEvent::error(
                EventKind::Redirect,
                format!("Shortcode not found: {code}"),
            ));
            return Err(RegistryError::NotFound(code.to_string()));
        };

        let now = self.clock.now();
        if record.is_expired_at(now) {
            self.events.emit(ServiceEvent::error(
                EventKind::Redirect,
                format!("Shortcode expired: {code}"),
            ));
            return Err(RegistryError::Expired(code.to_string()));
        }

        let event = context.into_event(now);
        if !self.store.append_click(code, &event).await? {
            self.events.emit(ServiceEvent::warn(
                EventKind::Redirect,
                format!("Shortcode vanished before click was recorded: {code}"),
            ));
            return Err(RegistryError::NotFound(code.to_string()));
        }

        self.events.emit(ServiceEvent::info(
            EventKind::Redirect,
            format!("Redirecting {code}, click recorded"),
        ));
        Ok(record.original_url)
    }

    /// Every stored link, expired ones included, with full click history.
    pub async fn list_statistics(&self) -> RegistryResult<Vec<LinkStats>> {
        let now = self.clock.now();
        let stats: Vec<LinkStats> = self
            .store
            .list_all()
            .await?
            .into_iter()
            .map(|record| LinkStats::from_record(record, now))
            .collect();

        self.events.emit(ServiceEvent::info(
            EventKind::Stats,
            format!("Fetched stats for {} URLs", stats.len()),
        ));
        Ok(stats)
    }

    pub async fn link_statistics(&self, code: &str) -> RegistryResult<LinkStats> {
        let record = self
            .store
            .get(code)
            .await?
            .ok_or_else(|| RegistryError::NotFound(code.to_string()))?;
        Ok(LinkStats::from_record(record, self.clock.now()))
    }
}

/// Accept only absolute http(s) URLs with a host. Returns the serialized form,
/// which is always a valid `Location` header value.
fn validate_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Original URL is required".to_string());
    }

    let parsed = Url::parse(trimmed).map_err(|e| format!("Invalid URL '{trimmed}': {e}"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!(
            "Unsupported URL scheme '{}': only http and https are allowed",
            parsed.scheme()
        ));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(format!("Invalid URL '{trimmed}': missing host"));
    }

    Ok(parsed.to_string())
}
