//! HTTP request handlers for the Pacer API.
//!
//! Handlers follow one pattern: validate input, log with structured fields,
//! and answer failures with the standard error body:
//!
//! ```json
//! {"error": {"code": "E1001", "message": "..."}}
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub mod health;
pub mod jobs;

pub use health::health_check;
pub use jobs::submit_job;

/// Error response with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Stable error code
    pub code: String,
    /// Human-readable error description
    pub message: String,
}

/// Creates a standardized error response.
pub(crate) fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    let body = ErrorResponse { error: ErrorDetail { code: code.to_string(), message } };
    (status, Json(body)).into_response()
}
