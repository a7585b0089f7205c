//! Stop signals for the long-running servers

use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopSignal::Interrupt => f.write_str("SIGINT"),
            StopSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Wait for SIGINT or SIGTERM. A signal whose handler cannot be installed
/// is logged and never fires.
pub async fn wait_for_stop() -> StopSignal {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => StopSignal::Interrupt,
        _ = terminate => StopSignal::Terminate,
    }
}

/// Shutdown future for `axum::serve(..).with_graceful_shutdown`
pub async fn shutdown_signal() {
    let signal = wait_for_stop().await;
    info!(%signal, "Stopping");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_names() {
        assert_eq!(StopSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(StopSignal::Terminate.to_string(), "SIGTERM");
    }

    #[tokio::test]
    async fn test_pending_until_signalled() {
        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(50), wait_for_stop()).await;
        assert!(waited.is_err());
    }
}
