//! Event sink delivering engine events to the coordinator inbox

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use crate::application::ports::EventSink;
use crate::domain::protocol::EngineEvent;

/// Forwards engine events over a channel drained by the coordinator
pub struct ChannelEventSink {
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver the coordinator reads from
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, inbox) = mpsc::unbounded_channel();
        (Self { events }, inbox)
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: EngineEvent) {
        let name = event.name();
        if self.events.send(event).is_err() {
            warn!(event = %name, "Coordinator inbox closed, event dropped");
        }
    }
}
