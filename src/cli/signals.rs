//! Shutdown signal handling for the serve command

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::info;

/// Signals that end the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

/// Listens for SIGINT and SIGTERM
pub struct ShutdownSignals {
    receiver: mpsc::Receiver<ShutdownSignal>,
}

impl ShutdownSignals {
    /// Install the handlers. Must be called inside a tokio runtime.
    pub fn install() -> Result<Self, std::io::Error> {
        let (tx, rx) = mpsc::channel(4);

        for (kind, which) in [
            (SignalKind::interrupt(), ShutdownSignal::Interrupt),
            (SignalKind::terminate(), ShutdownSignal::Terminate),
        ] {
            let mut stream = signal(kind)?;
            let tx = tx.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    info!(signal = ?which, "Shutdown requested");
                    if tx.send(which).await.is_err() {
                        break;
                    }
                }
            });
        }

        Ok(Self { receiver: rx })
    }

    /// Wait for the next shutdown signal
    pub async fn recv(&mut self) -> Option<ShutdownSignal> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_succeeds_inside_runtime() {
        assert!(ShutdownSignals::install().is_ok());
    }

    #[test]
    fn signal_equality() {
        assert_eq!(ShutdownSignal::Interrupt, ShutdownSignal::Interrupt);
        assert_ne!(ShutdownSignal::Interrupt, ShutdownSignal::Terminate);
    }
}
