//! OS signal handling.

use crate::lifecycle::Shutdown;

/// Wait for Ctrl+C and broadcast shutdown.
///
/// If the handler cannot be installed the error is logged and shutdown is
/// triggered immediately rather than leaving the process unstoppable.
pub async fn wait_for_ctrl_c(shutdown: Shutdown) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
    }
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}
