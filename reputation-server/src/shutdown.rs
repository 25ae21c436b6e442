//! Process-wide shutdown broadcast and signal handler: a `SHUTDOWN_BROADCAST`
//! static plus a ctrl-c/SIGTERM `shutdown()` future shared by this engine's
//! handful of services.

use std::sync::LazyLock;

use reputation_common::Signal;
use tokio::sync::broadcast;

/// Shared by every long-running service (`reputation_aggregator::Aggregator`,
/// `reputation_api::ApiServer`, `reputation_health::HealthServer`); each
/// resubscribes for its own shutdown receiver.
pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

/// Waits for Ctrl+C or SIGTERM, then broadcasts [`Signal::Shutdown`] and
/// waits for every subscriber to either drop or acknowledge before
/// broadcasting [`Signal::Finalised`]. A second Ctrl+C forces immediate
/// return ("enter it again to force shutdown").
pub async fn wait_for_shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("ctrl+c received, shutting down (press again to force)");
        }
        _ = terminate.recv() => {
            tracing::info!("SIGTERM received, shutting down");
        }
    }

    let mut receiver = SHUTDOWN_BROADCAST.subscribe();
    let _ = SHUTDOWN_BROADCAST.send(Signal::Shutdown);

    loop {
        tokio::select! {
            sig = receiver.recv() => {
                match sig {
                    Ok(s) => tracing::debug!(?s, "shutdown broadcast observed"),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(e) => tracing::debug!(error = %e, "shutdown receiver lagged"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("second ctrl+c received, forcing exit");
                break;
            }
        }
    }

    let _ = SHUTDOWN_BROADCAST.send(Signal::Finalised);
    Ok(())
}
