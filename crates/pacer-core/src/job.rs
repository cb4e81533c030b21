//! The unit of deliverable work and its identifier.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash;

/// Globally unique job identifier, assigned once at ingestion.
///
/// # Example
///
/// ```
/// use pacer_core::JobId;
/// let id = JobId::generate();
/// assert!(!id.as_str().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Creates a new random job ID backed by a UUID v4.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A job accepted for delivery.
///
/// Created by the ingestion endpoint with `id` and `partition_key` assigned,
/// encoded onto its shard's topic, and consumed by exactly one worker. The
/// only mutation after creation is the consumption loop re-stamping
/// `partition_key` with the shard it read the entry from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Unique identifier.
    pub id: JobId,
    /// Shard this job belongs to: `hash(primary_key) % shard_count`.
    pub partition_key: u32,
    /// Ordering and grouping key. Never empty.
    pub primary_key: String,
    /// Delivery target, passed through to the callback sender.
    pub callback_url: String,
    /// Opaque tracing identifier, passed through unmodified.
    pub correlation_id: String,
    /// Opaque, producer-encoded content delivered as the callback body.
    pub payload: Bytes,
}

impl Job {
    /// Creates a job with a fresh ID, assigned to partition 0.
    pub fn new(
        primary_key: impl Into<String>,
        callback_url: impl Into<String>,
        correlation_id: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            id: JobId::generate(),
            partition_key: 0,
            primary_key: primary_key.into(),
            callback_url: callback_url.into(),
            correlation_id: correlation_id.into(),
            payload: payload.into(),
        }
    }

    /// Hash of the primary key used for every routing decision.
    pub fn hash(&self) -> u32 {
        hash::hash_key(&self.primary_key)
    }

    /// Assigns the partition for a cluster of `shard_count` shards and
    /// returns it.
    pub fn assign_partition(&mut self, shard_count: u32) -> u32 {
        self.partition_key = hash::partition_for(&self.primary_key, shard_count);
        self.partition_key
    }

    /// Index of the worker that must process this job in a pool of
    /// `worker_count` workers.
    pub fn worker_index(&self, worker_count: usize) -> usize {
        hash::select_worker(&self.primary_key, worker_count)
    }

    /// Request body for the callback; a cheap reference-counted clone.
    pub fn payload_body(&self) -> Bytes {
        self.payload.clone()
    }
}
