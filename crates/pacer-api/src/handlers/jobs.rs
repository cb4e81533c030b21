//! Job ingestion handler.
//!
//! Validates the submitted job, assigns its id and partition, and enqueues
//! it on the owning shard's topic. Nothing is delivered here; the shard
//! engines pick jobs up from their topics.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use pacer_core::{codec, Job};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use super::error_response;
use crate::AppState;

/// Request body for job submission.
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    /// Ordering key; jobs sharing it are delivered in submission order.
    #[serde(default)]
    pub primary_key: String,
    /// URL the payload is POSTed to.
    #[serde(default)]
    pub callback_url: String,
    /// Opaque tracing identifier passed through to delivery logs.
    #[serde(default)]
    pub correlation_id: String,
    /// Callback body. Strings are sent verbatim, other values as JSON.
    #[serde(default)]
    pub payload: Option<Value>,
}

/// Response from successful job submission.
#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    /// Identifier assigned to the job
    pub id: String,
}

/// Reasons a submission is refused.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Body is not a JSON object of the expected shape.
    #[error("malformed job: {message}")]
    InvalidJson {
        /// Parser message
        message: String,
    },

    /// `primary_key` is missing or empty.
    #[error("primary_key is required")]
    MissingPrimaryKey,

    /// The queue did not accept the job.
    #[error("failed to enqueue job: {message}")]
    Enqueue {
        /// Queue error message
        message: String,
    },
}

impl IngestError {
    /// Stable error code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson { .. } => "E1001",
            Self::MissingPrimaryKey => "E1002",
            Self::Enqueue { .. } => "E3001",
        }
    }

    /// HTTP status the error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson { .. } | Self::MissingPrimaryKey => StatusCode::BAD_REQUEST,
            Self::Enqueue { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.code(), self.to_string())
    }
}

/// Accepts a job for delivery.
///
/// # Errors
///
/// Answers with:
/// - 400: body is not valid JSON or `primary_key` is empty
/// - 500: the job could not be pushed to its shard topic
#[instrument(name = "submit_job", skip(state, body), fields(body_len = body.len()))]
pub async fn submit_job(State(state): State<AppState>, body: Bytes) -> Response {
    match enqueue(&state, &body).await {
        Ok(id) => (StatusCode::ACCEPTED, Json(SubmitJobResponse { id })).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn enqueue(state: &AppState, body: &[u8]) -> Result<String, IngestError> {
    let request: SubmitJobRequest = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "rejecting malformed job");
        IngestError::InvalidJson { message: e.to_string() }
    })?;

    if request.primary_key.is_empty() {
        warn!("rejecting job without primary key");
        return Err(IngestError::MissingPrimaryKey);
    }

    let payload = match request.payload {
        None => Bytes::new(),
        Some(Value::String(text)) => Bytes::from(text),
        Some(value) => Bytes::from(value.to_string()),
    };

    let mut job =
        Job::new(request.primary_key, request.callback_url, request.correlation_id, payload);
    let partition = job.assign_partition(state.shard_count);
    let topic = state.topics.jobs_new(partition);

    state.queue.push(&topic, codec::encode(&job)).await.map_err(|e| {
        error!(job_id = %job.id, topic = %topic, error = %e, "failed to enqueue job");
        IngestError::Enqueue { message: e.to_string() }
    })?;

    info!(
        job_id = %job.id,
        partition,
        correlation_id = %job.correlation_id,
        "job accepted"
    );
    Ok(job.id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_and_statuses() {
        let invalid = IngestError::InvalidJson { message: "eof".to_string() };
        assert_eq!(invalid.code(), "E1001");
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        assert_eq!(IngestError::MissingPrimaryKey.status(), StatusCode::BAD_REQUEST);

        let enqueue = IngestError::Enqueue { message: "closed".to_string() };
        assert_eq!(enqueue.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(enqueue.to_string(), "failed to enqueue job: closed");
    }

    #[test]
    fn missing_optional_fields_default_to_empty() {
        let request: SubmitJobRequest = serde_json::from_str(r#"{"primary_key":"k"}"#).unwrap();

        assert_eq!(request.primary_key, "k");
        assert!(request.callback_url.is_empty());
        assert!(request.correlation_id.is_empty());
        assert!(request.payload.is_none());
    }
}
