//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces: the headless
//! browser platform, cpal-backed media devices, the buffering worker and
//! the storage adapters.

pub mod config;
pub mod media;
pub mod platform;
pub mod storage;
pub mod worker;

// Re-export adapters
pub use config::XdgPreferenceStore;
pub use media::{HeadlessMediaDevices, StreamGrants};
pub use platform::{ChannelEventSink, HeadlessBrowser, HostLauncher};
pub use storage::{FsBlobStore, MemorySessionStore};
pub use worker::BufferingWorker;
