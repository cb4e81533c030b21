//! In-process queue backend.
//!
//! Used by standalone deployments that run without Redis and by tests. Each
//! topic has its own [`Notify`], so a push wakes only the pops waiting on
//! that topic. Pops give up once the block timeout elapses.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Notify, time::Instant};

use super::Queue;
use crate::error::{QueueError, Result};

#[derive(Debug, Default)]
struct TopicState {
    entries: VecDeque<String>,
    pushed: Arc<Notify>,
}

/// FIFO queue held in memory, one deque per topic.
#[derive(Debug)]
pub struct MemoryQueue {
    topics: Mutex<HashMap<String, TopicState>>,
    block_timeout: Duration,
    closed: AtomicBool,
}

impl MemoryQueue {
    /// Creates an empty queue whose pops wait at most `block_timeout`.
    pub fn new(block_timeout: Duration) -> Self {
        Self { topics: Mutex::new(HashMap::new()), block_timeout, closed: AtomicBool::new(false) }
    }

    /// Number of entries waiting on `topic`.
    pub async fn len(&self, topic: &str) -> usize {
        self.topics().get(topic).map_or(0, |state| state.entries.len())
    }

    /// Returns `true` when `topic` has no waiting entries.
    pub async fn is_empty(&self, topic: &str) -> bool {
        self.len(topic).await == 0
    }

    /// Closes the queue. Blocked and future operations fail with
    /// [`QueueError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        for state in self.topics().values() {
            state.pushed.notify_waiters();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<String, TopicState>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn waker_for(&self, topic: &str) -> Arc<Notify> {
        Arc::clone(&self.topics().entry(topic.to_string()).or_default().pushed)
    }

    fn try_pop(&self, topic: &str) -> Option<String> {
        self.topics().get_mut(topic).and_then(|state| state.entries.pop_front())
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn pop(&self, topic: &str) -> Result<Option<String>> {
        let deadline = Instant::now() + self.block_timeout;
        let pushed = self.waker_for(topic);

        loop {
            // Register interest before checking so a push between the check
            // and the wait is not missed.
            let notified = pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_closed() {
                return Err(QueueError::Closed);
            }

            if let Some(token) = self.try_pop(topic) {
                return Ok(Some(token));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn push(&self, topic: &str, token: String) -> Result<()> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }

        let mut topics = self.topics();
        let state = topics.entry(topic.to_string()).or_default();
        state.entries.push_back(token);
        state.pushed.notify_waiters();
        Ok(())
    }
}
