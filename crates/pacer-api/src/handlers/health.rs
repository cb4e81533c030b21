//! Health check handler for service monitoring.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: &'static str,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Shards this API partitions jobs across
    pub shard_count: u32,
    /// Service version information
    pub version: String,
}

/// Health check endpoint handler.
///
/// Called frequently by orchestration systems and load balancers, so it
/// does not touch the queue.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Response {
    debug!("performing health check");

    let response = HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        shard_count: state.shard_count,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response)).into_response()
}
