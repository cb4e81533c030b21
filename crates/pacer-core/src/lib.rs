//! Core job model and queue plumbing.
//!
//! Provides the [`Job`] unit of work, the FNV-1a routing hash that decides
//! shard and worker assignment, the queue-entry codec, and the [`Queue`]
//! abstraction with in-memory and Redis backends. The delivery and API
//! crates build on these types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod hash;
pub mod job;
pub mod queue;

pub use codec::{decode, encode};
pub use error::{DecodeError, QueueError, Result};
pub use hash::{fnv1a32, hash_key, partition_for, select_worker};
pub use job::{Job, JobId};
pub use queue::{MemoryQueue, Queue, RedisQueue, Topics, DEFAULT_TOPIC_PREFIX};
