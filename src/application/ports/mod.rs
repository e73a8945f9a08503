//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod config;
pub mod events;
pub mod media;
pub mod platform;
pub mod storage;
pub mod worker;

// Re-export common types
pub use config::PreferenceStore;
pub use events::EventSink;
pub use media::{AcquisitionError, MediaDevices};
pub use platform::{BrowserPlatform, PlatformError};
pub use storage::{BlobStore, SessionStore, StorageError};
pub use worker::{EncodingWorker, WorkerError};
