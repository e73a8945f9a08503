//! Media acquisition adapters

mod grants;
mod headless;

pub use grants::{GrantRejection, StreamGrants};
pub use headless::{HeadlessMediaDevices, MicrophoneInfo, DEFAULT_DEVICE, DISPLAY_AUDIO_RATE};
