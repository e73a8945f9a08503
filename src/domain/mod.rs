//! Domain layer - Core business logic
//!
//! Contains value objects, state machines, the message protocol and
//! domain errors. This layer has no dependencies on external systems.

pub mod capture;
pub mod config;
pub mod error;
pub mod media;
pub mod protocol;
pub mod session;
pub mod tabs;

// Re-export common types
pub use capture::{CaptureConfig, CaptureRequest, MicrophoneId, StreamId, Surface};
pub use config::Preferences;
pub use error::*;
pub use media::{AudioMixer, MediaGraph, MediaStream, MediaTrack};
pub use protocol::{
    BlobId, CorrelationId, EngineCommand, EngineCommandKind, EngineEvent, Message,
    MessageSender, Operation, Reply, TabMessage,
};
pub use session::{CaptureSession, EngineState, RecordingState};
pub use tabs::{Tab, TabChange, TabId, TabRole};
