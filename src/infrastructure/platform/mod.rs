//! Browser platform adapters

mod channel_sink;
mod headless;

pub use channel_sink::ChannelEventSink;
pub use headless::{HeadlessBrowser, HostLauncher};
