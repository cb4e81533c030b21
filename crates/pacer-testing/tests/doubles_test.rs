//! Tests for the test doubles themselves.

use std::time::Duration;

use bytes::Bytes;
use pacer_core::{decode, Queue, QueueError};
use pacer_delivery::CallbackSender;
use pacer_testing::{CapturedLogs, JobBuilder, RecordingSender, ScriptedQueue};
use tokio_util::sync::CancellationToken;
use tracing::Level;

#[tokio::test]
async fn scripted_queue_replays_in_order() {
    let job = JobBuilder::new().primary_key("k").build();
    let queue = ScriptedQueue::new()
        .entry("raw")
        .empty(1)
        .job(&job)
        .failure(QueueError::backend("down"));

    assert_eq!(queue.pop("t").await.unwrap().as_deref(), Some("raw"));
    assert_eq!(queue.pop("t").await.unwrap(), None);
    assert_eq!(decode(&queue.pop("t").await.unwrap().unwrap()).unwrap(), job);
    assert!(queue.pop("t").await.is_err());
    assert_eq!(queue.pop_count(), 4);
    assert_eq!(queue.remaining(), 0);
}

#[tokio::test]
async fn scripted_queue_cancels_when_exhausted() {
    let cancel = CancellationToken::new();
    let queue = ScriptedQueue::new().empty(1).cancel_when_exhausted(cancel.clone());

    queue.pop("t").await.unwrap();
    assert!(!cancel.is_cancelled());

    assert_eq!(queue.pop("t").await.unwrap(), None);
    assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn scripted_queue_records_pushes() {
    let queue = ScriptedQueue::new();
    queue.push("pacer:jobs:new:0", "entry".to_string()).await.unwrap();

    assert_eq!(queue.pushed(), vec![("pacer:jobs:new:0".to_string(), "entry".to_string())]);
}

#[tokio::test]
async fn recording_sender_reports_configured_outcome() {
    let ok = RecordingSender::new().with_status(418);
    assert_eq!(ok.send("http://a", Bytes::from_static(b"x")).await.unwrap(), 418);

    let failing = RecordingSender::new().failing();
    assert!(failing.send("http://b", Bytes::new()).await.is_err());
    assert_eq!(failing.deliveries()[0].status, None);
}

#[tokio::test(start_paused = true)]
async fn wait_for_times_out_when_nothing_arrives() {
    let sender = RecordingSender::new();
    assert!(!sender.wait_for(1, Duration::from_millis(50)).await);
}

#[tokio::test]
async fn captured_logs_record_level_message_and_fields() {
    let logs = CapturedLogs::new();
    let _guard = logs.install();

    tracing::warn!(shard = 2, topic = "t", "something odd");
    tracing::info!("fine");

    let warnings = logs.at_level(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "something odd");
    assert_eq!(warnings[0].fields["shard"], "2");
    assert_eq!(warnings[0].fields["topic"], "t");
    assert!(logs.has_warnings_or_errors());
}

#[test]
fn job_builder_encodes_decodable_entries() {
    let entry = JobBuilder::new().id("fixed").correlation_id("c").partition(4).encode();
    let job = decode(&entry).unwrap();

    assert_eq!(job.id.as_str(), "fixed");
    assert_eq!(job.correlation_id, "c");
    assert_eq!(job.partition_key, 4);
}
