//! FIFO queue abstraction consumed by ingestion and the shard engines.
//!
//! Entries are opaque pre-encoded strings (see [`crate::codec`]). Backends
//! deliver entries of one topic in push order, at least once, and bound every
//! blocking pop by their own timeout so callers can observe cancellation
//! between pops.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::error::Result;

pub mod memory;
pub mod redis;

pub use memory::MemoryQueue;
pub use self::redis::RedisQueue;

/// Default prefix for the per-shard new-jobs topics.
pub const DEFAULT_TOPIC_PREFIX: &str = "pacer:jobs:new";

/// A FIFO, blocking-pop store keyed by topic.
#[async_trait]
pub trait Queue: Send + Sync + fmt::Debug {
    /// Removes the oldest entry of `topic`, waiting up to the backend's
    /// block timeout for one to arrive.
    ///
    /// Returns `Ok(None)` when nothing arrived in that window. This is the
    /// expected idle outcome, not an error.
    async fn pop(&self, topic: &str) -> Result<Option<String>>;

    /// Appends an entry to the tail of `topic`.
    async fn push(&self, topic: &str, token: String) -> Result<()>;
}

#[async_trait]
impl<Q: Queue + ?Sized> Queue for Arc<Q> {
    async fn pop(&self, topic: &str) -> Result<Option<String>> {
        (**self).pop(topic).await
    }

    async fn push(&self, topic: &str, token: String) -> Result<()> {
        (**self).push(topic, token).await
    }
}

/// Topic naming shared by producers and consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
}

impl Topics {
    /// Creates topic names under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Topic carrying new jobs for `shard`: `"<prefix>:<shard>"`.
    pub fn jobs_new(&self, shard: u32) -> String {
        format!("{}:{}", self.prefix, shard)
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_PREFIX)
    }
}
