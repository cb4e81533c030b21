//! Job fixtures with sensible defaults.

use bytes::Bytes;
use pacer_core::{codec, Job, JobId};

/// Builder for test jobs.
#[derive(Debug, Clone)]
pub struct JobBuilder {
    id: Option<JobId>,
    partition_key: u32,
    primary_key: String,
    callback_url: String,
    correlation_id: String,
    payload: Bytes,
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JobBuilder {
    /// Creates a builder with a fixed primary key and a JSON payload.
    pub fn new() -> Self {
        Self {
            id: None,
            partition_key: 0,
            primary_key: "customer-1".to_string(),
            callback_url: "http://localhost/callback".to_string(),
            correlation_id: String::new(),
            payload: Bytes::from_static(br#"{"event":"test"}"#),
        }
    }

    /// Sets the job id. A fresh id is generated otherwise.
    #[must_use]
    pub fn id(mut self, id: impl Into<JobId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the partition key stamped at ingestion.
    #[must_use]
    pub fn partition(mut self, partition_key: u32) -> Self {
        self.partition_key = partition_key;
        self
    }

    /// Sets the ordering key.
    #[must_use]
    pub fn primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Sets the callback target.
    #[must_use]
    pub fn callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = url.into();
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Sets the payload bytes.
    #[must_use]
    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Builds the job.
    pub fn build(self) -> Job {
        let mut job = Job::new(self.primary_key, self.callback_url, self.correlation_id, self.payload);
        if let Some(id) = self.id {
            job.id = id;
        }
        job.partition_key = self.partition_key;
        job
    }

    /// Builds the job and encodes it as a queue entry.
    pub fn encode(self) -> String {
        codec::encode(&self.build())
    }
}
