//! Swap Engine Binary
//!
//! Starts the order execution pipeline and its HTTP/WebSocket API.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin swap-engine
//! ```
//!
//! # Environment Variables
//!
//! - `HTTP_PORT`: HTTP server port (default: 3000)
//! - `QUEUE_CONCURRENCY`: Maximum concurrently executing orders (default: 10)
//! - `QUEUE_MAX_ATTEMPTS`: Attempts per order (default: 3)
//! - `QUEUE_BACKOFF_BASE_MS`: First retry backoff (default: 1000)
//! - `BUILD_DELAY_MS`: Transaction build pause (default: 500)
//! - `SETTLEMENT_FAILURE_RATE`: Simulated settlement failure probability (default: 0.05)
//! - `OTEL_ENABLED`, `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`: Trace export
//! - `RUST_LOG`: Log filter (default: swap_engine=info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use swap_engine::application::services::OrderQueue;
use swap_engine::infrastructure::config::{Container, EngineConfig};
use swap_engine::infrastructure::http::{AppState, HttpServer, create_router};
use swap_engine::infrastructure::persistence::InMemoryOrderRepository;
use swap_engine::infrastructure::simulation::{ThreadRandomSource, TokioDelay};
use swap_engine::infrastructure::{metrics, telemetry};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// How long active orders get to wind down after the server stops.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config = EngineConfig::from_env().context("invalid configuration")?;
    let _telemetry = telemetry::init(&config.telemetry).context("failed to initialize telemetry")?;
    metrics::init_metrics().context("failed to install metrics recorder")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        http_port = config.server.http_port,
        concurrency = config.queue.concurrency,
        max_attempts = config.queue.max_attempts,
        backoff_base_ms = config.queue.backoff_base.as_millis() as u64,
        build_delay_ms = config.execution.build_delay.as_millis() as u64,
        failure_rate = config.execution.settlement_failure_rate,
        otel = config.telemetry.enabled,
        "Starting swap engine"
    );

    let container = Container::new(
        &config,
        Arc::new(InMemoryOrderRepository::new()),
        Arc::new(ThreadRandomSource),
        Arc::new(TokioDelay),
    );
    let queue = container.queue();
    let router = create_router(AppState::from_container(&container, env!("CARGO_PKG_VERSION")));

    let shutdown = CancellationToken::new();
    let server = HttpServer::new(config.server.http_port, router, shutdown.clone());
    let server_handle = tokio::spawn(server.run());

    tokio::select! {
        () = shutdown_signal() => {}
        result = server_handle => {
            queue.shutdown();
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e).context("HTTP server failed"),
                Err(e) => Err(e).context("HTTP server task panicked"),
            };
        }
    }

    drain(&queue, &shutdown).await;
    tracing::info!("Swap engine stopped");
    Ok(())
}

/// Stop intake, stop the server and give active orders time to finish.
async fn drain(queue: &OrderQueue<InMemoryOrderRepository>, shutdown: &CancellationToken) {
    queue.shutdown();
    shutdown.cancel();

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, queue.wait_idle())
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            stats = ?queue.stats(),
            "Active orders did not finish before shutdown timeout"
        );
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for SIGINT or SIGTERM. A handler that cannot be installed never
/// fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
