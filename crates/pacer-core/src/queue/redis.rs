//! Redis list-backed queue.
//!
//! Producers `RPUSH` to the tail of a topic list and consumers `BLPOP` from
//! its head, which yields FIFO order per topic. A blocking pop holds the
//! connection it runs on, so every consumer should own its own `RedisQueue`.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tracing::{info, trace};

use super::Queue;
use crate::error::Result;

/// Queue backed by Redis lists.
#[derive(Clone)]
pub struct RedisQueue {
    connection: MultiplexedConnection,
    block_timeout: Duration,
}

impl fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisQueue")
            .field("block_timeout", &self.block_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisQueue {
    /// Connects to `url` and verifies the server answers `PING`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backend`](crate::QueueError::Backend) if the URL
    /// is invalid or the server is unreachable.
    pub async fn connect(url: &str, block_timeout: Duration) -> Result<Self> {
        let client = Client::open(url)?;
        let mut connection = client.get_multiplexed_async_connection().await?;

        let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        info!(block_timeout_secs = block_timeout.as_secs(), "connected to redis queue");

        Ok(Self { connection, block_timeout })
    }

    /// Wraps an existing connection.
    pub fn with_connection(connection: MultiplexedConnection, block_timeout: Duration) -> Self {
        Self { connection, block_timeout }
    }
}

#[async_trait]
impl Queue for RedisQueue {
    async fn pop(&self, topic: &str) -> Result<Option<String>> {
        let mut connection = self.connection.clone();
        // BLPOP replies with (list name, value), or nil once the timeout elapses.
        let popped: Option<(String, String)> =
            connection.blpop(topic, self.block_timeout.as_secs_f64()).await?;

        if popped.is_none() {
            trace!(topic, "blocking pop timed out");
        }

        Ok(popped.map(|(_, token)| token))
    }

    async fn push(&self, topic: &str, token: String) -> Result<()> {
        let mut connection = self.connection.clone();
        let _: i64 = connection.rpush(topic, token).await?;
        Ok(())
    }
}
