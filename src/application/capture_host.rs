//! Capture host command loop
//!
//! The capture host is the on-demand context running the engine. It receives
//! commands over a channel; closing the channel tears the engine down.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::protocol::{EngineCommand, EngineCommandKind};

/// Anything that can execute engine commands
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    async fn handle(&self, command: EngineCommand);
}

/// Serve commands until the sender side is dropped.
///
/// Each command runs on its own task so a slow worker round-trip never
/// delays an eager stop or discard. The loop returns only after every
/// command task has finished and the engine has released its media, so
/// awaiting the host task is the acknowledgement that it is gone.
pub async fn serve_capture_host<H: CommandHandler>(
    handler: Arc<H>,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
) {
    info!("Capture host started");
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                debug!(correlation = %command.id, command = ?command.kind, "Capture host received command");
                let handler = Arc::clone(&handler);
                in_flight.spawn(async move {
                    handler.handle(command).await;
                });
            }
            Some(finished) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = finished {
                    warn!(error = %e, "Capture host command task failed");
                }
            }
        }
    }

    // Release media now, then again once late acquisitions have settled
    cancel(&handler).await;
    while let Some(finished) = in_flight.join_next().await {
        if let Err(e) = finished {
            warn!(error = %e, "Capture host command task failed");
        }
    }
    cancel(&handler).await;
    info!("Capture host stopped");
}

async fn cancel<H: CommandHandler>(handler: &Arc<H>) {
    handler
        .handle(EngineCommand::new(EngineCommandKind::Cancel))
        .await;
}
