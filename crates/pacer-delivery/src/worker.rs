//! Single delivery worker.
//!
//! A worker owns the receiving half of one pool slot. For each job it waits
//! for a token from the shard's bucket, performs the callback, and records
//! the outcome. Workers never retry and never stop on a failed callback; they
//! exit only once their slot is closed and drained.

use std::sync::Arc;

use pacer_core::Job;
use tokio::{sync::mpsc, time::Instant};
use tracing::{info, warn};

use crate::{
    client::CallbackSender,
    error::{DeliveryError, ErrorCategory},
    token_bucket::TokenBucket,
};

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeliveryOutcome {
    /// The callback answered with a status code.
    Delivered {
        /// HTTP status returned by the callback
        status: u16,
    },
    /// The callback could not be reached.
    Failed,
    /// No token was issued because the bucket was closed.
    Dropped,
}

pub(crate) struct DeliveryWorker {
    shard: u32,
    id: usize,
    jobs: mpsc::Receiver<Job>,
    bucket: Arc<TokenBucket>,
    sender: Arc<dyn CallbackSender>,
}

impl DeliveryWorker {
    pub(crate) fn new(
        shard: u32,
        id: usize,
        jobs: mpsc::Receiver<Job>,
        bucket: Arc<TokenBucket>,
        sender: Arc<dyn CallbackSender>,
    ) -> Self {
        Self { shard, id, jobs, bucket, sender }
    }

    /// Processes jobs until the slot is closed and empty.
    pub(crate) async fn run(mut self) {
        info!(shard = self.shard, worker_id = self.id, "delivery worker starting");

        let (mut delivered, mut failed, mut dropped) = (0u64, 0u64, 0u64);
        while let Some(job) = self.jobs.recv().await {
            match self.deliver(job).await {
                DeliveryOutcome::Delivered { .. } => delivered += 1,
                DeliveryOutcome::Failed => failed += 1,
                DeliveryOutcome::Dropped => dropped += 1,
            }
        }

        info!(
            shard = self.shard,
            worker_id = self.id,
            delivered,
            failed,
            dropped,
            "delivery worker stopped"
        );
    }

    async fn deliver(&self, job: Job) -> DeliveryOutcome {
        let token = match self.bucket.take().await {
            Ok(token) => token,
            Err(error) => {
                warn!(
                    shard = self.shard,
                    worker = self.id,
                    job_id = %job.id,
                    correlation_id = %job.correlation_id,
                    error = %error,
                    "no token issued, job dropped"
                );
                return DeliveryOutcome::Dropped;
            },
        };

        let started = Instant::now();
        let result = self.sender.send(&job.callback_url, job.payload_body()).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(status) => {
                info!(
                    shard = self.shard,
                    worker = self.id,
                    token = token.tag(),
                    job_id = %job.id,
                    correlation_id = %job.correlation_id,
                    status,
                    elapsed_ms,
                    "callback delivered"
                );
                DeliveryOutcome::Delivered { status }
            },
            Err(error) => {
                self.log_failure(&job, token.tag(), elapsed_ms, &error);
                DeliveryOutcome::Failed
            },
        }
    }

    fn log_failure(&self, job: &Job, token: u64, elapsed_ms: u64, error: &DeliveryError) {
        warn!(
            shard = self.shard,
            worker = self.id,
            token,
            job_id = %job.id,
            correlation_id = %job.correlation_id,
            elapsed_ms,
            category = %ErrorCategory::from(error),
            error = %error,
            "callback failed"
        );
    }
}
