//! Callback sender double that records every attempt.

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use pacer_delivery::{CallbackSender, DeliveryError, Result};
use tokio::{sync::Notify, time::Instant};

/// One callback attempt seen by a [`RecordingSender`].
#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    /// Target URL.
    pub url: String,
    /// Request body.
    pub body: Bytes,
    /// When the attempt started.
    pub started_at: Instant,
    /// Status returned, `None` when the attempt failed.
    pub status: Option<u16>,
}

/// Sender that records attempts instead of making HTTP calls.
#[derive(Debug)]
pub struct RecordingSender {
    deliveries: Mutex<Vec<RecordedDelivery>>,
    started: Mutex<usize>,
    completed: Notify,
    status: u16,
    delay: Duration,
    fail: bool,
}

impl Default for RecordingSender {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSender {
    /// Creates a sender that answers 200 immediately.
    pub fn new() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            started: Mutex::new(0),
            completed: Notify::new(),
            status: 200,
            delay: Duration::ZERO,
            fail: false,
        }
    }

    /// Answers with `status` instead of 200.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Holds every attempt for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fails every attempt with a network error.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Completed attempts in completion order.
    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.lock().expect("delivery log lock poisoned").clone()
    }

    /// Number of completed attempts.
    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().expect("delivery log lock poisoned").len()
    }

    /// Number of attempts that have started, completed or not.
    pub fn started_count(&self) -> usize {
        *self.started.lock().expect("start counter lock poisoned")
    }

    /// Waits until at least `count` attempts have completed.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.completed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.delivery_count() >= count {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.delivery_count() >= count;
            }
        }
    }
}

#[async_trait]
impl CallbackSender for RecordingSender {
    async fn send(&self, url: &str, body: Bytes) -> Result<u16> {
        let started_at = Instant::now();
        *self.started.lock().expect("start counter lock poisoned") += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let status = (!self.fail).then_some(self.status);
        self.deliveries.lock().expect("delivery log lock poisoned").push(RecordedDelivery {
            url: url.to_string(),
            body,
            started_at,
            status,
        });
        self.completed.notify_waiters();

        status.ok_or_else(|| DeliveryError::network("connection refused"))
    }
}
