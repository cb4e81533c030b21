//! Worker pool and job dispatch.
//!
//! A pool owns a fixed set of workers, each fed through its own single-slot
//! channel. [`WorkerPool::dispatch`] routes a job to the worker chosen by the
//! FNV-1a hash of its primary key, so jobs that share a key are handled by the
//! same worker in arrival order. A full slot blocks the dispatcher, which is
//! the only backpressure between a shard's queue and its callbacks.

use std::{fmt, sync::Arc};

use pacer_core::Job;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    client::CallbackSender,
    error::{DeliveryError, Result, MAX_WORKER_COUNT},
    token_bucket::TokenBucket,
    worker::DeliveryWorker,
};

/// Jobs a worker slot holds before `dispatch` blocks.
const SLOT_CAPACITY: usize = 1;

/// Fixed-size set of delivery workers sharing one token bucket.
pub struct WorkerPool {
    shard: u32,
    worker_count: usize,
    bucket: Arc<TokenBucket>,
    sender: Arc<dyn CallbackSender>,
    slots: Vec<mpsc::Sender<Job>>,
    worker_handles: Vec<JoinHandle<()>>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("shard", &self.shard)
            .field("worker_count", &self.worker_count)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Creates a pool for `shard` without starting any worker.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::WorkerCountExceeded` when `worker_count` is
    /// above [`MAX_WORKER_COUNT`] and `DeliveryError::ConfigurationError`
    /// when it is zero.
    pub fn new(
        shard: u32,
        worker_count: usize,
        bucket: Arc<TokenBucket>,
        sender: Arc<dyn CallbackSender>,
    ) -> Result<Self> {
        if worker_count > MAX_WORKER_COUNT {
            return Err(DeliveryError::WorkerCountExceeded {
                requested: worker_count,
                max: MAX_WORKER_COUNT,
            });
        }
        if worker_count == 0 {
            return Err(DeliveryError::configuration("worker count must be at least 1"));
        }

        Ok(Self {
            shard,
            worker_count,
            bucket,
            sender,
            slots: Vec::with_capacity(worker_count),
            worker_handles: Vec::with_capacity(worker_count),
        })
    }

    /// Spawns one task per worker and opens their slots.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the workers were
    /// already spawned.
    pub fn spawn_workers(&mut self) -> Result<()> {
        if !self.worker_handles.is_empty() {
            return Err(DeliveryError::configuration("workers already spawned"));
        }

        info!(shard = self.shard, worker_count = self.worker_count, "spawning delivery workers");

        for worker_id in 0..self.worker_count {
            let (slot, jobs) = mpsc::channel(SLOT_CAPACITY);
            let worker = DeliveryWorker::new(
                self.shard,
                worker_id,
                jobs,
                self.bucket.clone(),
                self.sender.clone(),
            );

            self.slots.push(slot);
            self.worker_handles.push(tokio::spawn(worker.run()));
        }

        Ok(())
    }

    /// Places `job` into the slot of the worker its primary key maps to.
    ///
    /// Waits while that slot is occupied.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::PoolClosed` if the workers are not running.
    pub async fn dispatch(&self, job: Job) -> Result<()> {
        if self.slots.is_empty() {
            return Err(DeliveryError::PoolClosed);
        }

        let worker_id = self.worker_for(&job);
        debug!(shard = self.shard, worker_id, job_id = %job.id, "dispatching job");

        self.slots[worker_id].send(job).await.map_err(|_| DeliveryError::PoolClosed)
    }

    /// Index of the worker that handles `job`.
    pub fn worker_for(&self, job: &Job) -> usize {
        job.worker_index(self.worker_count)
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Returns `true` while spawned workers are still running.
    pub fn is_running(&self) -> bool {
        self.worker_handles.iter().any(|h| !h.is_finished())
    }

    /// Closes every slot and waits until each worker has drained it and
    /// finished its current delivery.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::WorkerPanic` for the first worker that
    /// panicked. The remaining workers are still awaited.
    pub async fn shutdown(mut self) -> Result<()> {
        info!(
            shard = self.shard,
            worker_count = self.worker_handles.len(),
            "shutting down worker pool"
        );

        self.slots.clear();

        let mut first_panic = None;
        for (worker_id, handle) in std::mem::take(&mut self.worker_handles).into_iter().enumerate()
        {
            if let Err(join_error) = handle.await {
                error!(
                    shard = self.shard,
                    worker_id,
                    error = %join_error,
                    "worker task panicked during shutdown"
                );
                first_panic.get_or_insert(DeliveryError::WorkerPanic {
                    worker_id,
                    error: join_error.to_string(),
                });
            }
        }

        info!(shard = self.shard, "worker pool shutdown completed");
        first_panic.map_or(Ok(()), Err)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let active_count = self.worker_handles.iter().filter(|h| !h.is_finished()).count();

        if active_count > 0 {
            warn!(
                shard = self.shard,
                active_workers = active_count,
                "WorkerPool dropped without shutdown; workers finish their slots unobserved"
            );
        }
    }
}
