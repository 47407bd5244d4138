//! Shutdown signalling.
//!
//! SIGINT and SIGTERM both trigger graceful shutdown. Config reload is
//! driven by the file watcher, not by SIGHUP.

use tokio::sync::broadcast;

/// Fans a single stop signal out to the server and background tasks.
///
/// Each holder of a receiver from [`Shutdown::subscribe`] sees the signal
/// once; subscribing after it fired sees nothing.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Stop everything subscribed. Safe to call with no subscribers.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for Ctrl+C or SIGTERM, then broadcast shutdown.
pub async fn wait_for_signal(shutdown: &Shutdown) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "Signal received"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "Signal received"),
    }

    shutdown.trigger();
}
