//! Graceful shutdown and signal handling.

use axum_server::Handle;

use crate::config::SHUTDOWN_GRACE_PERIOD;

/// Setup graceful shutdown on SIGTERM and SIGINT.
///
/// When either signal is received, the server will:
/// 1. Stop accepting new connections
/// 2. Wait for existing connections to complete
/// 3. Shutdown gracefully
pub fn setup_shutdown_handler(handle: Handle) {
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        begin_shutdown(&handle, signal);
    });
}

/// Log the shutdown, then tell the server to stop accepting and drain.
///
/// The log comes first: an idle server stops as soon as it is told to.
fn begin_shutdown(handle: &Handle, signal: &'static str) {
    tracing::info!(signal, "Received shutdown signal, initiating graceful shutdown");
    tracing::info!(
        grace_secs = SHUTDOWN_GRACE_PERIOD.as_secs(),
        "Graceful shutdown initiated, waiting for connections to close"
    );
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
}

/// Resolve with the name of the first termination signal received.
///
/// A signal whose handler cannot be installed is logged and never fires.
async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
