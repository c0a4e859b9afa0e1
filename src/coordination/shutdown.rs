//! Shutdown coordination between OS signals and the decision loop.
//!
//! A signal never interrupts a running cycle: the loop observes the request
//! at its next sleep, finishes, and closes the broker session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Shutdown signal types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM / Ctrl-C
    Graceful,
    /// Requested from inside the process (e.g. a one-shot run finished)
    Internal,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Graceful => write!(f, "graceful"),
            ShutdownSignal::Internal => write!(f, "internal"),
        }
    }
}

/// Graceful shutdown coordinator
pub struct GracefulShutdown {
    shutdown_requested: AtomicBool,
    signal_tx: watch::Sender<Option<ShutdownSignal>>,
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (signal_tx, _) = watch::channel(None);
        Self {
            shutdown_requested: AtomicBool::new(false),
            signal_tx,
        }
    }

    /// Check if shutdown has been requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Request shutdown; duplicates are ignored
    pub fn request_shutdown(&self, signal: ShutdownSignal) {
        if self.shutdown_requested.swap(true, Ordering::SeqCst) {
            warn!("Shutdown already requested, ignoring duplicate signal: {}", signal);
            return;
        }

        info!("Shutdown requested: {}", signal);
        self.signal_tx.send_replace(Some(signal));
    }

    /// Token for tasks that need to wait on the request
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            signal_rx: self.signal_tx.subscribe(),
        }
    }
}

/// Cloneable view of the shutdown request
#[derive(Clone)]
pub struct ShutdownToken {
    signal_rx: watch::Receiver<Option<ShutdownSignal>>,
}

impl ShutdownToken {
    pub fn is_shutdown_requested(&self) -> bool {
        self.signal_rx.borrow().is_some()
    }

    /// Resolves once shutdown is requested (immediately if it already was)
    pub async fn wait_for_shutdown(&mut self) -> ShutdownSignal {
        loop {
            let current = *self.signal_rx.borrow_and_update();
            if let Some(signal) = current {
                return signal;
            }
            if self.signal_rx.changed().await.is_err() {
                // Coordinator dropped
                return ShutdownSignal::Internal;
            }
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Forward OS signals to the coordinator
pub fn install_signal_handlers(shutdown: Arc<GracefulShutdown>) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received termination signal");
        shutdown.request_shutdown(ShutdownSignal::Graceful);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_shutdown_signal_display() {
        assert_eq!(ShutdownSignal::Graceful.to_string(), "graceful");
        assert_eq!(ShutdownSignal::Internal.to_string(), "internal");
    }

    #[tokio::test]
    async fn test_shutdown_request() {
        let shutdown = GracefulShutdown::new();
        let mut token = shutdown.token();
        assert!(!shutdown.is_shutdown_requested());
        assert!(!token.is_shutdown_requested());

        shutdown.request_shutdown(ShutdownSignal::Graceful);
        assert!(shutdown.is_shutdown_requested());

        let signal = tokio::time::timeout(Duration::from_secs(1), token.wait_for_shutdown())
            .await
            .unwrap();
        assert_eq!(signal, ShutdownSignal::Graceful);
    }

    #[tokio::test]
    async fn test_late_token_sees_earlier_request() {
        let shutdown = GracefulShutdown::new();
        shutdown.request_shutdown(ShutdownSignal::Internal);
        shutdown.request_shutdown(ShutdownSignal::Graceful);

        let mut token = shutdown.token();
        assert!(token.is_shutdown_requested());
        assert_eq!(token.wait_for_shutdown().await, ShutdownSignal::Internal);
    }
}
