//! Callback delivery over HTTP.
//!
//! Workers deliver through the [`CallbackSender`] trait. The production
//! [`CallbackClient`] wraps one pooled `reqwest::Client` built at startup and
//! shared by every worker of every shard; tests substitute their own sender.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn, Instrument};

use crate::error::{DeliveryError, Result};

/// Performs the outbound callback for a job.
#[async_trait]
pub trait CallbackSender: Send + Sync + fmt::Debug {
    /// POSTs `body` to `url` as JSON and returns the response status code.
    ///
    /// Non-2xx statuses are returned as `Ok`; only transport failures are
    /// errors.
    async fn send(&self, url: &str, body: Bytes) -> Result<u16>;
}

/// Configuration for the callback HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Timeout for a whole callback request.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
    /// Idle connections kept per callback host.
    pub pool_max_idle_per_host: usize,
    /// How long an idle pooled connection is kept open.
    pub pool_idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECONDS),
            user_agent: "Pacer-Callback/1.0".to_string(),
            verify_tls: true,
            pool_max_idle_per_host: 100,
            pool_idle_timeout: Duration::from_secs(60),
        }
    }
}

/// HTTP callback sender with a shared connection pool.
#[derive(Debug, Clone)]
pub struct CallbackClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl CallbackClient {
    /// Creates a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the HTTP client cannot
    /// be built with the provided settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_tls)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .build()
            .map_err(|e| {
                DeliveryError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Creates a client with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }
}

#[async_trait]
impl CallbackSender for CallbackClient {
    async fn send(&self, url: &str, body: Bytes) -> Result<u16> {
        let span = info_span!("callback", url = %url, body_len = body.len());

        async move {
            let response = self
                .client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        DeliveryError::timeout(self.config.timeout.as_secs())
                    } else if e.is_connect() {
                        DeliveryError::network(format!("connection failed: {e}"))
                    } else {
                        DeliveryError::network(e.to_string())
                    }
                })?;

            let status = response.status().as_u16();

            // The body is read to completion so the connection returns to the pool.
            if let Err(e) = response.bytes().await {
                warn!(status, error = %e, "failed to drain callback response body");
            }

            debug!(status, "callback answered");
            Ok(status)
        }
        .instrument(span)
        .await
    }
}
