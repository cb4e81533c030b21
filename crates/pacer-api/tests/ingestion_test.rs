//! Job ingestion endpoint tests.
//!
//! Drives `POST /jobs` through the full router against an in-memory queue
//! and inspects what lands on each shard topic.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pacer_api::{create_router, AppState};
use pacer_core::{codec, partition_for, Job, MemoryQueue, Queue, Topics};
use serde_json::{json, Value};
use tower::ServiceExt;

const SHARDS: u32 = 4;

struct Harness {
    queue: Arc<MemoryQueue>,
    topics: Topics,
}

impl Harness {
    fn new() -> Self {
        Self { queue: Arc::new(MemoryQueue::new(Duration::from_millis(10))), topics: Topics::default() }
    }

    fn app(&self) -> Router {
        create_router(
            AppState::new(self.queue.clone(), SHARDS, self.topics.clone()),
            Duration::from_secs(5),
        )
    }

    async fn submit(&self, body: impl Into<Body>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/jobs")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();

        let response = self.app().oneshot(request).await.expect("failed to make request");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn pop_job(&self, shard: u32) -> Option<Job> {
        let token = self.queue.pop(&self.topics.jobs_new(shard)).await.expect("queue pop")?;
        Some(codec::decode(&token).expect("enqueued entry should decode"))
    }

    async fn total_enqueued(&self) -> usize {
        let mut total = 0;
        for shard in 0..SHARDS {
            total += self.queue.len(&self.topics.jobs_new(shard)).await;
        }
        total
    }
}

fn job_body(primary_key: &str, payload: Value) -> String {
    json!({
        "primary_key": primary_key,
        "callback_url": "http://callbacks.test/hook",
        "correlation_id": "corr-1",
        "payload": payload,
    })
    .to_string()
}

#[tokio::test]
async fn accepted_job_lands_on_its_shard_topic() {
    let harness = Harness::new();

    let (status, body) = harness.submit(job_body("customer-42", json!("hello"))).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    let id = body["id"].as_str().expect("response should carry the job id");

    let shard = partition_for("customer-42", SHARDS);
    let job = harness.pop_job(shard).await.expect("job should be on its shard topic");
    assert_eq!(job.id.as_str(), id);
    assert_eq!(job.partition_key, shard);
    assert_eq!(job.primary_key, "customer-42");
    assert_eq!(job.callback_url, "http://callbacks.test/hook");
    assert_eq!(job.correlation_id, "corr-1");
    assert_eq!(harness.total_enqueued().await, 0);
}

#[tokio::test]
async fn string_payload_is_sent_verbatim() {
    let harness = Harness::new();

    let (status, _) = harness.submit(job_body("k", json!("raw text, not json"))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let job = harness.pop_job(partition_for("k", SHARDS)).await.expect("job enqueued");
    assert_eq!(&job.payload[..], b"raw text, not json");
}

#[tokio::test]
async fn structured_payload_is_sent_as_json() {
    let harness = Harness::new();

    let (status, _) = harness.submit(job_body("k", json!({"order": 7, "items": [1, 2]}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let job = harness.pop_job(partition_for("k", SHARDS)).await.expect("job enqueued");
    let payload: Value = serde_json::from_slice(&job.payload).expect("payload should be JSON");
    assert_eq!(payload, json!({"order": 7, "items": [1, 2]}));
}

#[tokio::test]
async fn missing_payload_becomes_empty_body() {
    let harness = Harness::new();

    let (status, _) = harness.submit(r#"{"primary_key":"k","callback_url":"http://x"}"#).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let job = harness.pop_job(partition_for("k", SHARDS)).await.expect("job enqueued");
    assert!(job.payload.is_empty());
}

#[tokio::test]
async fn jobs_with_same_primary_key_share_a_topic_in_order() {
    let harness = Harness::new();

    let mut ids = Vec::new();
    for n in 0..5 {
        let (status, body) = harness.submit(job_body("same-key", json!(n.to_string()))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    let shard = partition_for("same-key", SHARDS);
    assert_eq!(harness.queue.len(&harness.topics.jobs_new(shard)).await, 5);
    for (n, expected_id) in ids.iter().enumerate() {
        let job = harness.pop_job(shard).await.expect("job enqueued");
        assert_eq!(job.id.as_str(), expected_id);
        assert_eq!(&job.payload[..], n.to_string().as_bytes());
    }
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let harness = Harness::new();

    let (status, body) = harness.submit("{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E1001");
    assert_eq!(harness.total_enqueued().await, 0);
}

#[tokio::test]
async fn missing_primary_key_is_rejected() {
    let harness = Harness::new();

    let (status, body) = harness.submit(r#"{"callback_url":"http://x"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E1002");

    let (status, _) = harness.submit(job_body("", json!("x"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(harness.total_enqueued().await, 0);
}

#[tokio::test]
async fn closed_queue_answers_server_error() {
    let harness = Harness::new();
    harness.queue.close();

    let (status, body) = harness.submit(job_body("k", json!("x"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "E3001");
}

#[tokio::test]
async fn get_is_not_allowed() {
    let harness = Harness::new();
    let request = Request::builder().method("GET").uri("/jobs").body(Body::empty()).unwrap();

    let response = harness.app().oneshot(request).await.expect("failed to make request");

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let harness = Harness::new();
    let request = Request::builder()
        .method("POST")
        .uri("/jobs")
        .body(Body::from(job_body("k", json!("x"))))
        .unwrap();

    let response = harness.app().oneshot(request).await.expect("failed to make request");

    let request_id = response
        .headers()
        .get("X-Request-Id")
        .expect("response should carry X-Request-Id")
        .to_str()
        .unwrap();
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
}
