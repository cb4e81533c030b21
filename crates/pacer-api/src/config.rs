//! Configuration management for the Pacer job dispatcher.

use std::{fmt, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use pacer_core::{Topics, DEFAULT_TOPIC_PREFIX};
use pacer_delivery::{ClientConfig, EngineConfig, MAX_BUCKET_CAPACITY, MAX_WORKER_COUNT};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "pacer.toml";

/// Which parts of the pipeline this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Ingestion API plus one engine per shard.
    Standalone,
    /// Ingestion API only.
    Api,
    /// One shard engine, no API.
    Worker,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::Api => write!(f, "api"),
            Self::Worker => write!(f, "worker"),
        }
    }
}

/// Queue implementation backing the shard topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// Redis lists, shared across processes.
    Redis,
    /// In-process queue; only meaningful for `standalone`.
    Memory,
}

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`pacer.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// # Example
///
/// ```no_run
/// use pacer_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("{} role, {} shards", config.role, config.shard_count);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Process role.
    ///
    /// Environment variable: `ROLE`
    #[serde(default = "default_role", alias = "ROLE")]
    pub role: Role,

    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    // Queue
    /// Queue backend.
    ///
    /// Environment variable: `QUEUE_BACKEND`
    #[serde(default = "default_queue_backend", alias = "QUEUE_BACKEND")]
    pub queue_backend: QueueBackend,
    /// Redis connection URL.
    ///
    /// Environment variable: `REDIS_URL`
    #[serde(default = "default_redis_url", alias = "REDIS_URL")]
    pub redis_url: String,
    /// Longest a blocking pop waits before reporting an empty topic. Also
    /// bounds how long a shard takes to notice shutdown.
    ///
    /// Environment variable: `QUEUE_BLOCK_TIMEOUT_SECONDS`
    #[serde(default = "default_block_timeout", alias = "QUEUE_BLOCK_TIMEOUT_SECONDS")]
    pub queue_block_timeout_seconds: u64,
    /// Prefix of the per-shard topics.
    ///
    /// Environment variable: `TOPIC_PREFIX`
    #[serde(default = "default_topic_prefix", alias = "TOPIC_PREFIX")]
    pub topic_prefix: String,

    // Sharding
    /// Shard owned by a `worker` process.
    ///
    /// Environment variable: `SHARD_INDEX`
    #[serde(default, alias = "SHARD_INDEX")]
    pub shard_index: u32,
    /// Total number of shards.
    ///
    /// Environment variable: `SHARD_COUNT`
    #[serde(default = "default_shard_count", alias = "SHARD_COUNT")]
    pub shard_count: u32,

    // Delivery
    /// Callbacks each shard may start per second.
    ///
    /// Environment variable: `RATE_LIMIT_POINTS`
    #[serde(default = "default_points", alias = "RATE_LIMIT_POINTS")]
    pub rate_limit_points: usize,
    /// Delivery workers per shard.
    ///
    /// Environment variable: `WORKER_COUNT`
    #[serde(default = "default_worker_count", alias = "WORKER_COUNT")]
    pub worker_count: usize,
    /// HTTP request timeout for callbacks in seconds.
    ///
    /// Environment variable: `DELIVERY_TIMEOUT_SECONDS`
    #[serde(default = "default_delivery_timeout", alias = "DELIVERY_TIMEOUT_SECONDS")]
    pub delivery_timeout_seconds: u64,
    /// Whether callback TLS certificates are verified.
    ///
    /// Environment variable: `VERIFY_TLS`
    #[serde(default = "default_verify_tls", alias = "VERIFY_TLS")]
    pub verify_tls: bool,

    // Logging
    /// Log level configuration.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result fails
    /// validation.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Request timeout for the HTTP API.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Blocking pop timeout for shard queues.
    pub fn queue_block_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_block_timeout_seconds)
    }

    /// Topic naming for shard queues.
    pub fn topics(&self) -> Topics {
        Topics::new(self.topic_prefix.clone())
    }

    /// Convert to callback client configuration.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.delivery_timeout_seconds),
            verify_tls: self.verify_tls,
            ..ClientConfig::default()
        }
    }

    /// Engine settings for `shard`.
    pub fn engine_config(&self, shard: u32) -> EngineConfig {
        EngineConfig::new(shard, self.rate_limit_points, self.worker_count)
    }

    /// Shards this process consumes.
    pub fn owned_shards(&self) -> Vec<u32> {
        match self.role {
            Role::Standalone => (0..self.shard_count).collect(),
            Role::Worker => vec![self.shard_index],
            Role::Api => Vec::new(),
        }
    }

    /// Whether this process serves the ingestion API.
    pub fn serves_api(&self) -> bool {
        matches!(self.role, Role::Standalone | Role::Api)
    }

    /// Get Redis URL with password masked for logging.
    pub fn redis_url_masked(&self) -> String {
        if let Some(at_pos) = self.redis_url.find('@') {
            if let Some(colon_pos) = self.redis_url[..at_pos].rfind(':') {
                let mut masked = self.redis_url.clone();
                masked.replace_range(colon_pos + 1..at_pos, "***");
                return masked;
            }
        }
        self.redis_url.clone()
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.shard_count == 0 {
            anyhow::bail!("shard_count must be greater than 0");
        }

        if self.shard_index >= self.shard_count {
            anyhow::bail!(
                "shard_index {} is out of range for shard_count {}",
                self.shard_index,
                self.shard_count
            );
        }

        if self.rate_limit_points == 0 {
            anyhow::bail!("rate_limit_points must be greater than 0");
        }

        if self.rate_limit_points > MAX_BUCKET_CAPACITY {
            anyhow::bail!(
                "rate_limit_points {} exceeds the maximum of {MAX_BUCKET_CAPACITY}",
                self.rate_limit_points
            );
        }

        if self.queue_block_timeout_seconds == 0 {
            // BLPOP with a zero timeout never returns on an idle topic.
            anyhow::bail!("queue_block_timeout_seconds must be greater than 0");
        }

        if self.worker_count == 0 {
            anyhow::bail!("worker_count must be greater than 0");
        }

        if self.worker_count > MAX_WORKER_COUNT {
            anyhow::bail!(
                "max number of workers allowed is {MAX_WORKER_COUNT}, requested {}",
                self.worker_count
            );
        }

        if self.queue_backend == QueueBackend::Memory && self.role != Role::Standalone {
            anyhow::bail!("the memory queue backend requires the standalone role");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            role: default_role(),
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            queue_backend: default_queue_backend(),
            redis_url: default_redis_url(),
            queue_block_timeout_seconds: default_block_timeout(),
            topic_prefix: default_topic_prefix(),
            shard_index: 0,
            shard_count: default_shard_count(),
            rate_limit_points: default_points(),
            worker_count: default_worker_count(),
            delivery_timeout_seconds: default_delivery_timeout(),
            verify_tls: default_verify_tls(),
            rust_log: default_log_level(),
        }
    }
}

fn default_role() -> Role {
    Role::Standalone
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_queue_backend() -> QueueBackend {
    QueueBackend::Redis
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_block_timeout() -> u64 {
    1
}

fn default_topic_prefix() -> String {
    DEFAULT_TOPIC_PREFIX.to_string()
}

fn default_shard_count() -> u32 {
    1
}

fn default_points() -> usize {
    10
}

fn default_worker_count() -> usize {
    4
}

fn default_delivery_timeout() -> u64 {
    30
}

fn default_verify_tls() -> bool {
    true
}

fn default_log_level() -> String {
    "info,pacer=debug".to_string()
}
