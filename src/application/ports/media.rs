//! Media acquisition port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::capture::{StreamId, Surface};
use crate::domain::media::MediaStream;

/// Media acquisition errors
#[derive(Debug, Clone, Error)]
pub enum AcquisitionError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Tab capture requires a stream id, but none was issued for this attempt")]
    MissingStreamId,

    #[error("Stream id {0} was already used")]
    StreamIdConsumed(String),

    #[error("Capture source unavailable: {0}")]
    Unavailable(String),

    #[error("Capture was cancelled before media was adopted")]
    Cancelled,
}

/// Port for acquiring display and microphone streams
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire a window or screen stream, optionally with its audio
    async fn display_media(
        &self,
        surface: Surface,
        with_audio: bool,
    ) -> Result<MediaStream, AcquisitionError>;

    /// Acquire a tab stream authorized by a single-use stream id
    async fn tab_media(
        &self,
        stream_id: &StreamId,
        with_audio: bool,
    ) -> Result<MediaStream, AcquisitionError>;

    /// Acquire a microphone stream by device id
    async fn user_media(&self, device_id: &str) -> Result<MediaStream, AcquisitionError>;
}
