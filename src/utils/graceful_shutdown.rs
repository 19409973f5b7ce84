use std::fmt;

use eyre::Result;
use tokio::{signal, sync::watch};

use crate::server::state::ProtocolKind;

/// Represents different shutdown reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGTERM or SIGINT
    Signal,
    /// Requested through [`GracefulShutdown::trigger_shutdown`]
    Manual,
    /// A listener stopped serving on its own
    ListenerFailed(ProtocolKind),
}

impl ShutdownReason {
    /// Whether the process should exit with a failure status.
    pub fn is_failure(self) -> bool {
        matches!(self, ShutdownReason::ListenerFailed(_))
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal => f.write_str("signal"),
            ShutdownReason::Manual => f.write_str("manual"),
            ShutdownReason::ListenerFailed(protocol) => write!(f, "{protocol} listener failed"),
        }
    }
}

/// Process-wide shutdown trigger.
///
/// Cheap to clone; every clone observes the same trigger. The first trigger
/// wins and its reason is kept, later triggers are ignored.
#[derive(Clone)]
pub struct GracefulShutdown {
    shutdown_tx: watch::Sender<Option<ShutdownReason>>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(None);
        Self { shutdown_tx }
    }

    /// Check if shutdown has been initiated
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_tx.borrow().is_some()
    }

    /// The reason of the trigger that started shutdown, if any.
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.shutdown_tx.borrow()
    }

    /// Start shutdown. Returns false when shutdown was already initiated.
    pub fn trigger_shutdown(&self, reason: ShutdownReason) -> bool {
        let triggered = self.shutdown_tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if triggered {
            tracing::info!(%reason, "Shutdown triggered");
        } else {
            tracing::debug!(%reason, "Shutdown already initiated, ignoring trigger");
        }
        triggered
    }

    /// Listen for SIGINT / SIGTERM until one arrives or shutdown is
    /// triggered some other way.
    pub async fn run_signal_handler(&self) -> Result<()> {
        tracing::info!("Signal handler started. Listening for SIGTERM, SIGINT");

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                self.trigger_shutdown(ShutdownReason::Signal);
            }
            result = wait_for_sigterm() => {
                result?;
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
                self.trigger_shutdown(ShutdownReason::Signal);
            }
            _ = self.wait_for_shutdown_signal() => {}
        }

        tracing::debug!("Signal handler shutting down");
        Ok(())
    }

    /// Wait until shutdown is triggered and return the winning reason.
    pub async fn wait_for_shutdown_signal(&self) -> ShutdownReason {
        let mut receiver = self.shutdown_tx.subscribe();
        let reason = match receiver.wait_for(Option::is_some).await {
            Ok(reason) => *reason,
            // The sender lives in self, so the channel cannot close here.
            Err(_) => None,
        };
        reason.unwrap_or(ShutdownReason::Manual)
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> std::io::Result<()> {
    // On non-Unix systems, we only have Ctrl+C
    std::future::pending::<()>().await;
    Ok(())
}
