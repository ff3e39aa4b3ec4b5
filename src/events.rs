//! Service events emitted by the registry.
//!
//! Sinks are observers: `emit` returns nothing and must not block, so a slow
//! or broken sink can never change the outcome of a request.

use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Shorten,
    Stats,
    Redirect,
    Server,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Shorten => "shorten",
            EventKind::Stats => "stats",
            EventKind::Redirect => "redirect",
            EventKind::Server => "server",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEvent {
    pub level: EventLevel,
    pub kind: EventKind,
    pub message: String,
}

impl ServiceEvent {
    pub fn info(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Info,
            kind,
            message: message.into(),
        }
    }

    pub fn warn(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Warn,
            kind,
            message: message.into(),
        }
    }

    pub fn error(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Error,
            kind,
            message: message.into(),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: ServiceEvent);
}

/// Writes events to the `tracing` subscriber.
#[derive(Debug, Clone)]
pub struct TracingEventSink {
    service: &'static str,
}

impl TracingEventSink {
    pub fn new(service: &'static str) -> Self {
        Self { service }
    }
}

impl Default for TracingEventSink {
    fn default() -> Self {
        Self::new("backend")
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: ServiceEvent) {
        let service = self.service;
        let kind = event.kind;
        match event.level {
            EventLevel::Info => tracing::info!(service, %kind, "{}", event.message),
            EventLevel::Warn => tracing::warn!(service, %kind, "{}", event.message),
            EventLevel::Error => tracing::error!(service, %kind, "{}", event.message),
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: ServiceEvent) {}
}

/// Keeps events in memory so they can be inspected afterwards.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<ServiceEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ServiceEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: ServiceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
