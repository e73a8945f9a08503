//! Capture configuration domain module

mod config;
mod surface;

pub use config::{CaptureConfig, CaptureRequest, MicrophoneId, StreamId, NO_MICROPHONE};
pub use surface::{Surface, ALL_SURFACES};
