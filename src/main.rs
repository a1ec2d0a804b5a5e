use std::path::Path;

use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use unitd::utils::file_io;
use unitd::NetworkError;
use unitd::NodeBuilder;
use unitd::Result;
use unitd::UnitdConfig;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let config = UnitdConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&config.service.log_dir)?;

    // Each signal is one drain request; the node decides whether to stop
    let (graceful_tx, graceful_rx) = watch::channel(());
    let (metrics_tx, metrics_rx) = watch::channel(());

    let node = NodeBuilder::init(config, graceful_rx)
        .build()
        .start_metrics_server(metrics_rx)
        .start_control_server()
        .await?
        .ready()?;

    tokio::spawn(async move {
        if let Err(e) = forward_signals(graceful_tx).await {
            error!("Signal listener stopped: {:?}", e);
        }
    });

    info!("unitd started. Send SIGINT/SIGTERM to request shutdown.");
    let result = node.run().await;
    if let Err(e) = &result {
        error!("node stops: {:?}", e);
    }

    let _ = metrics_tx.send(());
    info!("Exiting program.");
    result
}

/// Forwards every SIGINT/SIGTERM as a drain request until the node stops
/// listening.
async fn forward_signals(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            _ = sigint.recv() => info!("SIGINT detected."),
            _ = sigterm.recv() => info!("SIGTERM detected."),
        }

        graceful_tx.send(()).map_err(|e| {
            error!("Failed to send shutdown signal: {}", e);
            NetworkError::SignalSendFailed(format!("Failed to send shutdown signal: {e}"))
        })?;
    }
}

fn init_observability(log_dir: &Path) -> Result<WorkerGuard> {
    let log_file = file_io::open_file_for_append(&log_dir.join("unitd.log"))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("unitd=info"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(filter);
    tracing_subscriber::registry().with(file_layer).init();

    Ok(guard)
}
