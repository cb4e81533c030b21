//! Test infrastructure for deterministic pipeline tests.
//!
//! Provides a scripted [`Queue`](pacer_core::Queue), a recording
//! [`CallbackSender`](pacer_delivery::CallbackSender), a [`JobBuilder`]
//! fixture and an in-memory tracing capture so tests can assert on what the
//! pipeline logged.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod fixtures;
pub mod logs;
pub mod queue;
pub mod sender;

pub use fixtures::JobBuilder;
pub use logs::{CapturedLogs, LogRecord};
pub use queue::ScriptedQueue;
pub use sender::{RecordedDelivery, RecordingSender};
