//! Error types for admission control, dispatch and callback delivery.
//!
//! Delivery errors are logged by the worker and never abort it. Configuration
//! errors surface at pool construction and should stop startup. Queue errors
//! end the shard engine that observed them and are returned to the owning
//! process.

use std::fmt;

use pacer_core::QueueError;
use thiserror::Error;

/// Result type alias for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Highest worker count a pool accepts.
pub const MAX_WORKER_COUNT: usize = 99;

/// Error conditions across the dispatch pipeline.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// Network-level failure while calling back.
    #[error("network connection failed: {message}")]
    NetworkError {
        /// Error message describing the network failure
        message: String,
    },

    /// Callback request exceeded the client timeout.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Number of seconds before the request timed out
        timeout_seconds: u64,
    },

    /// Invalid pool, engine or client configuration.
    #[error("invalid configuration: {message}")]
    ConfigurationError {
        /// Configuration error message
        message: String,
    },

    /// Requested more workers than a pool may run.
    #[error("max number of workers allowed is {max}, requested {requested}")]
    WorkerCountExceeded {
        /// Requested worker count
        requested: usize,
        /// Allowed ceiling
        max: usize,
    },

    /// The token bucket stopped issuing tokens.
    #[error("token bucket is closed")]
    BucketClosed,

    /// The pool is not accepting jobs.
    #[error("worker pool is closed")]
    PoolClosed,

    /// A worker task panicked.
    #[error("worker {worker_id} panicked: {error}")]
    WorkerPanic {
        /// Index of the worker that panicked
        worker_id: usize,
        /// Join error message
        error: String,
    },

    /// The shard's queue failed.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl DeliveryError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// Returns `true` for errors that should stop the whole process rather
    /// than a single shard.
    pub fn is_fatal_for_process(&self) -> bool {
        matches!(self, Self::ConfigurationError { .. } | Self::WorkerCountExceeded { .. })
    }
}

/// Category of delivery error for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Callback transport failures.
    Network,
    /// Configuration problems.
    Configuration,
    /// Shutdown and lifecycle conditions.
    Lifecycle,
    /// Queue backend failures.
    Queue,
}

impl From<&DeliveryError> for ErrorCategory {
    fn from(error: &DeliveryError) -> Self {
        match error {
            DeliveryError::NetworkError { .. } | DeliveryError::Timeout { .. } => Self::Network,
            DeliveryError::ConfigurationError { .. }
            | DeliveryError::WorkerCountExceeded { .. } => Self::Configuration,
            DeliveryError::BucketClosed
            | DeliveryError::PoolClosed
            | DeliveryError::WorkerPanic { .. } => Self::Lifecycle,
            DeliveryError::Queue(_) => Self::Queue,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Configuration => write!(f, "configuration"),
            Self::Lifecycle => write!(f, "lifecycle"),
            Self::Queue => write!(f, "queue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_fatal_for_process() {
        assert!(DeliveryError::configuration("zero workers").is_fatal_for_process());
        assert!(DeliveryError::WorkerCountExceeded { requested: 100, max: MAX_WORKER_COUNT }
            .is_fatal_for_process());

        assert!(!DeliveryError::network("connection refused").is_fatal_for_process());
        assert!(!DeliveryError::Queue(QueueError::Closed).is_fatal_for_process());
        assert!(!DeliveryError::BucketClosed.is_fatal_for_process());
    }

    #[test]
    fn error_categories_mapped_correctly() {
        assert_eq!(ErrorCategory::from(&DeliveryError::timeout(5)), ErrorCategory::Network);
        assert_eq!(ErrorCategory::from(&DeliveryError::PoolClosed), ErrorCategory::Lifecycle);
        assert_eq!(
            ErrorCategory::from(&DeliveryError::Queue(QueueError::backend("down"))),
            ErrorCategory::Queue
        );
        assert_eq!(ErrorCategory::Configuration.to_string(), "configuration");
    }

    #[test]
    fn error_display_format() {
        assert_eq!(DeliveryError::timeout(30).to_string(), "request timeout after 30s");
        assert_eq!(
            DeliveryError::WorkerCountExceeded { requested: 120, max: 99 }.to_string(),
            "max number of workers allowed is 99, requested 120"
        );
        assert_eq!(
            DeliveryError::Queue(QueueError::backend("reset")).to_string(),
            "queue backend error: reset"
        );
    }
}
