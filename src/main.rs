//! Pacer job dispatcher.
//!
//! Main entry point. Depending on the configured role the process serves
//! the ingestion API, runs shard engines, or both, and coordinates graceful
//! startup and shutdown.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use pacer_api::{AppState, Config, QueueBackend};
use pacer_core::{MemoryQueue, Queue, RedisQueue};
use pacer_delivery::{CallbackClient, CallbackSender, ShardEngine};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.rust_log)?;

    info!(
        role = %config.role,
        queue_backend = ?config.queue_backend,
        redis_url = %config.redis_url_masked(),
        shard_count = config.shard_count,
        rate_limit_points = config.rate_limit_points,
        worker_count = config.worker_count,
        "Starting Pacer job dispatcher"
    );

    let cancel = CancellationToken::new();
    let sender: Arc<dyn CallbackSender> = Arc::new(
        CallbackClient::new(config.to_client_config()).context("Failed to build callback client")?,
    );
    let memory = (config.queue_backend == QueueBackend::Memory)
        .then(|| Arc::new(MemoryQueue::new(config.queue_block_timeout())));

    let mut tasks: JoinSet<Result<()>> = JoinSet::new();

    for shard in config.owned_shards() {
        let queue = open_queue(&config, memory.as_ref()).await?;
        let engine =
            ShardEngine::new(config.engine_config(shard), queue, sender.clone(), config.topics());
        let cancel = cancel.clone();

        tasks.spawn(async move {
            engine.run(cancel).await.with_context(|| format!("Shard {shard} engine failed"))
        });
    }

    if config.serves_api() {
        let queue = open_queue(&config, memory.as_ref()).await?;
        let state = AppState::new(queue, config.shard_count, config.topics());
        let addr = config.parse_server_addr()?;
        let request_timeout = config.request_timeout();
        let cancel = cancel.clone();

        tasks.spawn(async move {
            pacer_api::start_server(state, addr, request_timeout, cancel)
                .await
                .context("HTTP server failed")
        });
    }

    info!(shards = ?config.owned_shards(), api = config.serves_api(), "Pacer is running");

    let mut first_error = None;
    tokio::select! {
        () = shutdown_signal() => {
            info!("Shutdown signal received, starting graceful shutdown");
        }
        Some(joined) = tasks.join_next() => {
            warn!("A component stopped unexpectedly, shutting down");
            record_exit(joined, &mut first_error);
        }
    }
    cancel.cancel();

    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while let Some(joined) = tasks.join_next().await {
            record_exit(joined, &mut first_error);
        }
    })
    .await;

    if drained.is_err() {
        warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "Shutdown grace period expired");
        tasks.shutdown().await;
    }

    info!("Pacer shutdown complete");
    first_error.map_or(Ok(()), Err)
}

/// Initializes tracing, preferring `RUST_LOG` over the configured filter.
fn init_tracing(default_filter: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("Invalid log filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}

/// Opens a queue handle for one consumer.
///
/// Redis consumers each get their own connection since `BLPOP` holds the
/// connection for the length of the block.
async fn open_queue(config: &Config, memory: Option<&Arc<MemoryQueue>>) -> Result<Arc<dyn Queue>> {
    if let Some(memory) = memory {
        let queue: Arc<dyn Queue> = memory.clone();
        return Ok(queue);
    }

    let queue = RedisQueue::connect(&config.redis_url, config.queue_block_timeout())
        .await
        .with_context(|| format!("Failed to connect to {}", config.redis_url_masked()))?;
    let queue: Arc<dyn Queue> = Arc::new(queue);
    Ok(queue)
}

fn record_exit(joined: Result<Result<()>, JoinError>, first_error: &mut Option<anyhow::Error>) {
    match joined {
        Ok(Ok(())) => {},
        Ok(Err(e)) => {
            error!(error = %format_args!("{e:#}"), "Component failed");
            first_error.get_or_insert(e);
        },
        Err(e) => {
            error!(error = %e, "Component task panicked");
            first_error.get_or_insert_with(|| anyhow::anyhow!("component task panicked: {e}"));
        },
    }
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C signal");
        },
        () = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
