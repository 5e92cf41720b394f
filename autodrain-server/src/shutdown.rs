//! Signal handling for graceful shutdown.

use autodrain_core::processors::{Orchestrator, RunJoinError};
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};

/// Creates a future that completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C). If the handlers cannot be
/// installed, falls back to `ctrl_c`.
pub async fn shutdown_signal() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to install signal handlers, using ctrl_c");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl_c");
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}

/// Stop the active run, if any, and wait up to `grace` for its workers.
pub async fn stop_workers(orchestrator: &Orchestrator, grace: Duration) {
    let Some(run) = orchestrator.stop() else {
        return;
    };
    tracing::info!(workers = run.workers(), "Waiting for workers to stop");
    match run.join(grace).await {
        Ok(report) => tracing::info!(?report, "Workers stopped"),
        Err(RunJoinError::Timeout(limit)) => {
            tracing::warn!(?limit, "Workers did not stop in time, abandoning them")
        }
        Err(e) => tracing::error!(error = %e, "Failed to join workers"),
    }
}
