//! Shard-wide admission control.
//!
//! A [`TokenBucket`] holds at most `capacity` tokens. The refresher replaces
//! the whole budget on every tick (drain, then fill), so unused tokens never
//! carry over and no interval issues more than `capacity` tokens, regardless
//! of how long the shard sat idle before it.
//!
//! ```text
//!   refresher ──drain+fill every interval──▶ ┌──────────────┐
//!                                            │ TokenBucket  │ ◀── take() ── worker 0..n
//!   cancel ──────────────close─────────────▶ └──────────────┘
//! ```

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use tokio::{
    sync::Semaphore,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

use crate::error::{DeliveryError, Result};

/// Largest capacity a bucket can hold.
pub const MAX_BUCKET_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// Admission granted to one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    tag: u64,
}

impl Token {
    /// Monotonically increasing sequence number, for log correlation only.
    pub fn tag(&self) -> u64 {
        self.tag
    }
}

/// Capacity-bounded pool of admission tokens shared by one shard's workers.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: usize,
    tokens: Semaphore,
    next_tag: AtomicU64,
    refill: Mutex<()>,
}

impl TokenBucket {
    /// Creates an empty bucket that holds at most `capacity` tokens.
    ///
    /// # Panics
    ///
    /// Filling panics when `capacity` exceeds [`MAX_BUCKET_CAPACITY`]. Use
    /// [`TokenBucket::try_filled`] for capacities taken from configuration.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tokens: Semaphore::new(0),
            next_tag: AtomicU64::new(0),
            refill: Mutex::new(()),
        }
    }

    /// Creates a bucket and fills it.
    pub fn filled(capacity: usize) -> Self {
        let bucket = Self::new(capacity);
        bucket.fill();
        bucket
    }

    /// Creates a filled bucket after checking `capacity`.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` when `capacity` is zero or
    /// above [`MAX_BUCKET_CAPACITY`].
    pub fn try_filled(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(DeliveryError::configuration("token bucket capacity must be positive"));
        }
        if capacity > MAX_BUCKET_CAPACITY {
            return Err(DeliveryError::configuration(format!(
                "token bucket capacity {capacity} exceeds the maximum of {MAX_BUCKET_CAPACITY}"
            )));
        }
        Ok(Self::filled(capacity))
    }

    /// Tokens issued per refill cycle.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens currently waiting to be taken.
    pub fn available(&self) -> usize {
        self.tokens.available_permits()
    }

    /// Issues tokens until the bucket holds `capacity`.
    ///
    /// No-op once the bucket is closed.
    pub fn fill(&self) {
        let _guard = self.refill.lock().unwrap_or_else(PoisonError::into_inner);
        self.fill_locked();
    }

    /// Discards every token not yet taken. Never blocks.
    pub fn drain(&self) {
        let _guard = self.refill.lock().unwrap_or_else(PoisonError::into_inner);
        self.drain_locked();
    }

    /// Replaces the whole budget: drain, then fill.
    pub fn refresh(&self) {
        let _guard = self.refill.lock().unwrap_or_else(PoisonError::into_inner);
        self.drain_locked();
        self.fill_locked();
    }

    /// Waits for a token.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::BucketClosed` once the bucket is closed,
    /// including for callers already waiting.
    pub async fn take(&self) -> Result<Token> {
        let permit = self.tokens.acquire().await.map_err(|_| DeliveryError::BucketClosed)?;
        permit.forget();
        Ok(self.issue())
    }

    /// Takes a token if one is available right now.
    pub fn try_take(&self) -> Option<Token> {
        let permit = self.tokens.try_acquire().ok()?;
        permit.forget();
        Some(self.issue())
    }

    /// Stops issuing tokens and releases every waiting taker.
    pub fn close(&self) {
        self.tokens.close();
    }

    /// Returns `true` once the bucket has been closed.
    pub fn is_closed(&self) -> bool {
        self.tokens.is_closed()
    }

    /// Spawns the background refresher.
    ///
    /// The first refresh happens at the next wall-clock multiple of
    /// `interval` and then every `interval`. When `cancel` fires the
    /// refresher closes the bucket and exits.
    pub fn start_refresher(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let bucket = Arc::clone(self);

        tokio::spawn(async move {
            let first_tick = Instant::now() + delay_to_next_boundary(SystemTime::now(), interval);
            let mut ticker = tokio::time::interval_at(first_tick, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        bucket.close();
                        info!(capacity = bucket.capacity, "token bucket refresher stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        bucket.refresh();
                        trace!(capacity = bucket.capacity, "token bucket refreshed");
                    }
                }
            }
        })
    }

    fn issue(&self) -> Token {
        Token { tag: self.next_tag.fetch_add(1, Ordering::Relaxed) }
    }

    fn fill_locked(&self) {
        if self.tokens.is_closed() {
            return;
        }
        // Only takers run concurrently and they only lower the count.
        let available = self.tokens.available_permits();
        if available < self.capacity {
            self.tokens.add_permits(self.capacity - available);
        }
    }

    fn drain_locked(&self) {
        let available = self.tokens.available_permits();
        self.tokens.forget_permits(available);
    }
}

/// Time from `now` until the next multiple of `interval` since the epoch.
pub(crate) fn delay_to_next_boundary(now: SystemTime, interval: Duration) -> Duration {
    let interval_ns = interval.as_nanos().max(1);
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let remaining = interval_ns - since_epoch % interval_ns;
    Duration::from_nanos(u64::try_from(remaining).unwrap_or(u64::MAX))
}
