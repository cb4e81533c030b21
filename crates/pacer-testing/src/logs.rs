//! In-memory capture of tracing events.
//!
//! Install with [`CapturedLogs::install`] inside a current-thread runtime:
//! the subscriber is thread-local, so every task spawned on that runtime is
//! captured and nothing else is.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

use tracing::{
    field::{Field, Visit},
    subscriber::DefaultGuard,
    Event, Level, Subscriber,
};
use tracing_subscriber::{layer::Context, prelude::*, Layer};

/// A captured event.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Event level.
    pub level: Level,
    /// Module path the event came from.
    pub target: String,
    /// The event's message.
    pub message: String,
    /// Remaining fields, formatted.
    pub fields: HashMap<String, String>,
}

/// Tracing layer that stores events for later assertions.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl CapturedLogs {
    /// Creates an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes this thread's events into the capture until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    /// All captured events in order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().expect("log capture lock poisoned").clone()
    }

    /// Events at exactly `level`.
    pub fn at_level(&self, level: Level) -> Vec<LogRecord> {
        self.records().into_iter().filter(|r| r.level == level).collect()
    }

    /// Events whose message contains `needle`.
    pub fn with_message(&self, needle: &str) -> Vec<LogRecord> {
        self.records().into_iter().filter(|r| r.message.contains(needle)).collect()
    }

    /// Returns `true` if any `WARN` or `ERROR` event was captured.
    pub fn has_warnings_or_errors(&self) -> bool {
        self.records().iter().any(|r| r.level == Level::WARN || r.level == Level::ERROR)
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.records.lock().expect("log capture lock poisoned").push(LogRecord {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.store(field, format!("{value:?}"));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.store(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.store(field, value.to_string());
    }
}

impl FieldVisitor {
    fn store(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}
