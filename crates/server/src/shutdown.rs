//! Graceful shutdown handling.
//!
//! Provides signal handling for clean server shutdown and a coordinator that
//! tells background tasks to stop.

use tokio::signal;
use tokio::sync::watch;

/// Wait for a shutdown signal (Ctrl-C or SIGTERM).
///
/// On Unix systems, it also handles SIGTERM for container environments.
#[allow(clippy::expect_used)]
pub async fn shutdown_signal() {
    let ctrl_c = async {
        // If signal handlers cannot be installed the process cannot shut down
        // cleanly, so panicking at startup is the right outcome.
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}

/// Shutdown coordinator for background tasks.
///
/// Receivers observe `true` once [`ShutdownCoordinator::shutdown`] is called,
/// including receivers subscribed afterwards.
pub struct ShutdownCoordinator {
    notify: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (notify, _) = watch::channel(false);
        Self { notify }
    }

    /// Subscribe to shutdown notifications.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.notify.subscribe()
    }

    /// Trigger shutdown.
    pub fn shutdown(&self) {
        self.notify.send_replace(true);
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
