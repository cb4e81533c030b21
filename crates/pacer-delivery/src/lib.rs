//! Rate-limited, partition-aware job delivery.
//!
//! This crate turns queued jobs into outbound callbacks while applying a
//! strict per-shard admission budget.
//!
//! # Architecture
//!
//! Each shard runs one [`ShardEngine`]. The engine pops encoded jobs from its
//! topic and hands them to a [`WorkerPool`], which routes every job to a
//! worker by the hash of its primary key. Workers share one [`TokenBucket`]
//! whose budget is replaced once per interval:
//!
//! 1. **Pop** - the engine waits a bounded time for the next queue entry
//! 2. **Dispatch** - the job lands in its worker's single-entry slot
//! 3. **Admit** - the worker waits for a token from the shard bucket
//! 4. **Deliver** - the [`CallbackSender`] POSTs the payload once, no retry
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use pacer_core::{MemoryQueue, Topics};
//! use pacer_delivery::{CallbackClient, DeliveryError, EngineConfig, ShardEngine};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> std::result::Result<(), DeliveryError> {
//! let queue = Arc::new(MemoryQueue::new(Duration::from_secs(1)));
//! let sender = Arc::new(CallbackClient::with_defaults()?);
//! let engine = ShardEngine::new(EngineConfig::new(0, 10, 4), queue, sender, Topics::default());
//!
//! engine.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod engine;
pub mod error;
pub mod token_bucket;
mod worker;
pub mod worker_pool;

pub use client::{CallbackClient, CallbackSender, ClientConfig};
pub use engine::{EngineConfig, ShardEngine, DEFAULT_REFILL_INTERVAL};
pub use error::{DeliveryError, ErrorCategory, Result, MAX_WORKER_COUNT};
pub use token_bucket::{Token, TokenBucket, MAX_BUCKET_CAPACITY};
pub use worker_pool::WorkerPool;

/// Default callback request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
