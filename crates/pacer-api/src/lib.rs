//! Pacer HTTP API.
//!
//! Accepts jobs over HTTP, assigns each an id and a shard, and pushes the
//! encoded job onto that shard's queue topic. Also hosts the service
//! configuration shared by every process role.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use pacer_core::{Queue, Topics};

pub mod config;
pub mod handlers;
pub mod server;

pub use config::{Config, QueueBackend, Role};
pub use server::{create_router, start_server};

/// State shared by every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Queue that accepted jobs are pushed to.
    pub queue: Arc<dyn Queue>,
    /// Number of shards jobs are partitioned across.
    pub shard_count: u32,
    /// Topic naming for shard queues.
    pub topics: Topics,
}

impl AppState {
    /// Creates handler state.
    pub fn new(queue: Arc<dyn Queue>, shard_count: u32, topics: Topics) -> Self {
        Self { queue, shard_count, topics }
    }
}
