//! Engine event sink port interface

use async_trait::async_trait;

use crate::domain::protocol::EngineEvent;

/// Port through which the capture engine reports terminal events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver an event to the coordinator. Delivery is best-effort.
    async fn emit(&self, event: EngineEvent);
}
