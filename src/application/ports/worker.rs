//! Encoding worker port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::media::WorkerTracks;
use crate::domain::protocol::CorrelationId;

/// Encoding worker errors
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    #[error("Encoding worker is not running")]
    Unavailable,

    #[error("No worker input is open")]
    NotOpen,

    #[error("Encoding worker rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    #[error("Worker answered request {received}, expected {expected}")]
    Mismatched {
        expected: CorrelationId,
        received: CorrelationId,
    },
}

/// Port for the encoding worker.
///
/// Every call is one request/response round-trip matched by `id`.
#[async_trait]
pub trait EncodingWorker: Send + Sync {
    /// Open the input channel with the video track and optional mixed audio
    async fn open(&self, id: CorrelationId, tracks: WorkerTracks) -> Result<(), WorkerError>;

    /// Begin buffering
    async fn record(&self, id: CorrelationId) -> Result<(), WorkerError>;

    async fn pause(&self, id: CorrelationId) -> Result<(), WorkerError>;

    async fn resume(&self, id: CorrelationId) -> Result<(), WorkerError>;

    /// Flush and return the muxed output buffer
    async fn finish(&self, id: CorrelationId) -> Result<Vec<u8>, WorkerError>;

    /// Drop everything buffered
    async fn discard(&self, id: CorrelationId) -> Result<(), WorkerError>;
}
