//! Error types for the job codec and queue backends.
//!
//! Decode failures are absorbed by the consumption loop (the entry is logged
//! and dropped), while queue errors other than an empty pop are fatal for the
//! shard that observed them.

use thiserror::Error;

/// Result type alias for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

/// Failure to turn a queue entry back into a [`Job`](crate::Job).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The entry is not a well-formed encoded job.
    #[error("malformed queue entry: {message}")]
    Malformed {
        /// Parser message describing the first problem found
        message: String,
    },

    /// The entry was written by an encoder this build does not understand.
    #[error("unsupported queue entry version {version}")]
    UnsupportedVersion {
        /// Version tag found in the entry
        version: u32,
    },

    /// The payload field is not valid base64.
    #[error("invalid payload encoding: {message}")]
    InvalidPayload {
        /// Decoder message
        message: String,
    },

    /// The entry carries an empty primary key.
    #[error("queue entry has an empty primary key")]
    MissingPrimaryKey,
}

impl DecodeError {
    /// Creates a malformed-entry error from a message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed { message: message.into() }
    }
}

/// Errors reported by a [`Queue`](crate::queue::Queue) backend.
///
/// An empty pop is not an error: backends return `Ok(None)` for it.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// The backing store failed or could not be reached.
    #[error("queue backend error: {message}")]
    Backend {
        /// Backend error message
        message: String,
    },

    /// The queue was closed and accepts no further operations.
    #[error("queue is closed")]
    Closed,
}

impl QueueError {
    /// Creates a backend error from a message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into() }
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        Self::backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_format() {
        assert_eq!(
            DecodeError::UnsupportedVersion { version: 7 }.to_string(),
            "unsupported queue entry version 7"
        );
        assert_eq!(
            QueueError::backend("connection reset").to_string(),
            "queue backend error: connection reset"
        );
        assert_eq!(QueueError::Closed.to_string(), "queue is closed");
    }
}
