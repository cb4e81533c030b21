//! Queue double that replays a fixed script of pop results.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use pacer_core::{Job, Queue, QueueError, Result};
use tokio_util::sync::CancellationToken;

/// Queue whose `pop` results are scripted up front.
///
/// Once the script runs out, `pop` reports an empty topic after a short
/// pause, and cancels the token registered with
/// [`ScriptedQueue::cancel_when_exhausted`] if there is one. Pushes are
/// recorded and never popped.
#[derive(Debug)]
pub struct ScriptedQueue {
    script: Mutex<VecDeque<Result<Option<String>>>>,
    pushed: Mutex<Vec<(String, String)>>,
    pops: AtomicUsize,
    idle_delay: Duration,
    on_exhausted: Option<CancellationToken>,
}

impl Default for ScriptedQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedQueue {
    /// Creates a queue with an empty script.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            pushed: Mutex::new(Vec::new()),
            pops: AtomicUsize::new(0),
            idle_delay: Duration::from_millis(5),
            on_exhausted: None,
        }
    }

    /// Appends a raw queue entry.
    #[must_use]
    pub fn entry(self, token: impl Into<String>) -> Self {
        self.then(Ok(Some(token.into())))
    }

    /// Appends an encoded job.
    #[must_use]
    pub fn job(self, job: &Job) -> Self {
        self.entry(pacer_core::encode(job))
    }

    /// Appends `count` empty pops.
    #[must_use]
    pub fn empty(self, count: usize) -> Self {
        (0..count).fold(self, |queue, _| queue.then(Ok(None)))
    }

    /// Appends a failing pop.
    #[must_use]
    pub fn failure(self, error: QueueError) -> Self {
        self.then(Err(error))
    }

    /// Cancels `cancel` on the first pop past the end of the script.
    #[must_use]
    pub fn cancel_when_exhausted(mut self, cancel: CancellationToken) -> Self {
        self.on_exhausted = Some(cancel);
        self
    }

    /// Number of `pop` calls so far.
    pub fn pop_count(&self) -> usize {
        self.pops.load(Ordering::SeqCst)
    }

    /// Scripted results not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script lock poisoned").len()
    }

    /// Every `(topic, token)` pushed so far.
    pub fn pushed(&self) -> Vec<(String, String)> {
        self.pushed.lock().expect("push log lock poisoned").clone()
    }

    fn then(self, result: Result<Option<String>>) -> Self {
        self.script.lock().expect("script lock poisoned").push_back(result);
        self
    }
}

#[async_trait]
impl Queue for ScriptedQueue {
    async fn pop(&self, _topic: &str) -> Result<Option<String>> {
        self.pops.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().expect("script lock poisoned").pop_front();
        match next {
            Some(result) => result,
            None => {
                if let Some(cancel) = &self.on_exhausted {
                    cancel.cancel();
                }
                tokio::time::sleep(self.idle_delay).await;
                Ok(None)
            },
        }
    }

    async fn push(&self, topic: &str, token: String) -> Result<()> {
        self.pushed.lock().expect("push log lock poisoned").push((topic.to_string(), token));
        Ok(())
    }
}
