use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use dispatcher::http;
use dispatcher::state::AppState;
use dispatcher_core::broadcaster::Broadcaster;
use dispatcher_core::config::DispatcherConfig;
use dispatcher_core::logging::init_logging;
use dispatcher_core::metrics::Metrics;
use dispatcher_core::prober::Prober;
use dispatcher_core::registry::Registry;

/// Spec §4.6: the broadcaster's periodic tick defaults to 1s.
const BROADCAST_INTERVAL: Duration = Duration::from_secs(1);
/// Spec §5: in-flight requests are drained for up to 30s on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "dispatcher", version, about = "Educational L7 request dispatcher")]
struct Cli {
    /// Overrides the listen port (defaults to $PORT, then 8000).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config =
        DispatcherConfig::from_env().context("failed to load configuration from environment")?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    run(config).await
}

async fn run(config: DispatcherConfig) -> Result<()> {
    let registry = Arc::new(Registry::new(
        config.workers,
        config.algorithm,
        config.circuit_threshold,
        config.circuit_recovery,
    ));
    let metrics = Arc::new(Metrics::new());
    let broadcaster = Arc::new(Broadcaster::new());
    let state = AppState::new(registry.clone(), metrics.clone(), broadcaster.clone());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            tracing::info!(event = "shutdown_signal_received");
            cancel.cancel();
        })
        .context("failed to install signal handler")?;
    }

    let prober_task = {
        let prober = Prober::new(registry.clone(), metrics.clone());
        let cancel = cancel.clone();
        let interval = config.health_interval;
        tokio::spawn(async move { prober.run(interval, cancel).await })
    };

    let broadcaster_task = {
        let broadcaster = broadcaster.clone();
        let registry = registry.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { broadcaster.run(&registry, BROADCAST_INTERVAL, cancel).await })
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;

    let app = http::router(state, &config.allowed_origins);

    tracing::info!(port = config.port, algorithm = config.algorithm.as_str(), event = "dispatcher_listening");

    let shutdown_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_cancel.cancelled().await })
        .await
        .context("server error")?;

    // The listener stopped accepting; make sure the background tasks see
    // cancellation too (idempotent if ctrlc already fired it) and give
    // them the same grace period as in-flight requests.
    cancel.cancel();
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = prober_task.await;
        let _ = broadcaster_task.await;
    })
    .await;

    tracing::info!(event = "dispatcher_shutdown_complete");
    Ok(())
}
