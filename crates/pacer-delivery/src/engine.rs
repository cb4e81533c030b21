//! Rate-limited consumption loop for one shard.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  pop   ┌─────────────┐ dispatch ┌─────────────┐ take ┌─────────────┐
//! │ Queue topic  │───────▶│ ShardEngine │─────────▶│ WorkerPool  │─────▶│ TokenBucket │
//! │ <prefix>:<n> │        └─────────────┘          └─────────────┘      └─────────────┘
//! └──────────────┘                                        │
//!                                                         ▼
//!                                                 ┌────────────────┐
//!                                                 │ CallbackSender │
//!                                                 └────────────────┘
//! ```
//!
//! The engine owns the shard's whole lifecycle: it fills the bucket, starts
//! the refresher and the pool, then pops, decodes and dispatches until the
//! cancellation token fires or the queue fails. Cancellation is checked once
//! per iteration, so shutdown latency is bounded by the queue's pop timeout.

use std::{sync::Arc, time::Duration};

use pacer_core::{codec, Queue, Topics};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    client::CallbackSender,
    error::{DeliveryError, Result},
    token_bucket::TokenBucket,
    worker_pool::WorkerPool,
};

/// Refill interval used by every shard.
pub const DEFAULT_REFILL_INTERVAL: Duration = Duration::from_secs(1);

/// Settings for one shard engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Shard this engine owns.
    pub shard: u32,
    /// Tokens issued per refill interval.
    pub points: usize,
    /// Workers in the shard's pool.
    pub worker_count: usize,
    /// Time between bucket refills.
    pub refill_interval: Duration,
}

impl EngineConfig {
    /// Creates a config with the default refill interval.
    pub fn new(shard: u32, points: usize, worker_count: usize) -> Self {
        Self { shard, points, worker_count, refill_interval: DEFAULT_REFILL_INTERVAL }
    }
}

/// Bridges one shard's queue topic to its worker pool.
#[derive(Debug)]
pub struct ShardEngine {
    config: EngineConfig,
    queue: Arc<dyn Queue>,
    sender: Arc<dyn CallbackSender>,
    topics: Topics,
}

impl ShardEngine {
    /// Creates an engine. Nothing runs until [`ShardEngine::run`].
    pub fn new(
        config: EngineConfig,
        queue: Arc<dyn Queue>,
        sender: Arc<dyn CallbackSender>,
        topics: Topics,
    ) -> Self {
        Self { config, queue, sender, topics }
    }

    /// Engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Topic this engine consumes.
    pub fn topic(&self) -> String {
        self.topics.jobs_new(self.config.shard)
    }

    /// Runs the shard until `cancel` fires or the queue fails.
    ///
    /// Cancellation closes the shard's bucket, so no token is issued after
    /// it fires; jobs still waiting in a worker slot are logged and dropped.
    /// After a queue failure the pool is drained under the normal rate limit
    /// before the refresher stops.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the bucket or pool cannot be built,
    /// and
    /// `DeliveryError::Queue` when a pop fails for any reason other than an
    /// empty topic.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let shard = self.config.shard;
        let topic = self.topic();

        let bucket = Arc::new(TokenBucket::try_filled(self.config.points)?);
        let mut pool =
            WorkerPool::new(shard, self.config.worker_count, bucket.clone(), self.sender.clone())?;
        pool.spawn_workers()?;

        // Cancellation closes the bucket right away; jobs still sitting in a
        // slot are dropped rather than admitted after shutdown began.
        let refresher_cancel = cancel.child_token();
        let refresher = bucket.start_refresher(self.config.refill_interval, refresher_cancel.clone());

        info!(
            shard,
            topic = %topic,
            points = self.config.points,
            worker_count = self.config.worker_count,
            "shard engine started"
        );

        let consumed = self.consume(&pool, &topic, &cancel).await;
        let shutdown = pool.shutdown().await;

        refresher_cancel.cancel();
        if let Err(join_error) = refresher.await {
            warn!(shard, error = %join_error, "token bucket refresher panicked");
        }

        info!(shard, clean = consumed.is_ok(), "shard engine stopped");
        consumed.and(shutdown)
    }

    async fn consume(
        &self,
        pool: &WorkerPool,
        topic: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let shard = self.config.shard;

        loop {
            if cancel.is_cancelled() {
                info!(shard, "shard engine received shutdown signal");
                return Ok(());
            }

            let token = match self.queue.pop(topic).await {
                Ok(Some(token)) => token,
                Ok(None) => continue,
                Err(error) => {
                    error!(shard, topic, error = %error, "queue pop failed, stopping shard");
                    return Err(DeliveryError::Queue(error));
                },
            };

            let mut job = match codec::decode(&token) {
                Ok(job) => job,
                Err(error) => {
                    warn!(shard, topic, error = %error, "dropping undecodable queue entry");
                    continue;
                },
            };

            // Entries are stamped with the shard that consumed them.
            if job.partition_key != shard {
                debug!(
                    shard,
                    partition_key = job.partition_key,
                    job_id = %job.id,
                    "re-stamping partition key"
                );
            }
            job.partition_key = shard;

            pool.dispatch(job).await?;
        }
    }
}
