//! Browser platform port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::capture::StreamId;
use crate::domain::protocol::{EngineCommand, TabMessage};
use crate::domain::tabs::{Tab, TabId};

/// Platform API errors
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("Tab {0} no longer exists")]
    TabNotFound(TabId),

    #[error("Failed to open tab: {0}")]
    TabCreationFailed(String),

    #[error("Failed to inject UI into tab {tab}: {message}")]
    InjectionFailed { tab: TabId, message: String },

    #[error("Failed to deliver message to tab {tab}: {message}")]
    DeliveryFailed { tab: TabId, message: String },

    #[error("Capture host already exists")]
    HostAlreadyExists,

    #[error("Failed to create capture host: {0}")]
    HostCreationFailed(String),

    #[error("Capture host did not shut down cleanly: {0}")]
    HostShutdownFailed(String),

    #[error("Capture host is not running")]
    HostUnavailable,

    #[error("Tab capture stream id unavailable: {0}")]
    StreamIdUnavailable(String),
}

/// Port for the privileged browser APIs the coordinator drives
#[async_trait]
pub trait BrowserPlatform: Send + Sync {
    /// The focused tab of the current window, if any
    async fn active_tab(&self) -> Option<Tab>;

    /// Open a new tab at `url`
    async fn open_tab(&self, url: &str) -> Result<Tab, PlatformError>;

    /// Close a tab
    async fn close_tab(&self, tab: TabId) -> Result<(), PlatformError>;

    /// Inject the recording UI payload into a tab
    async fn inject_ui(&self, tab: TabId) -> Result<(), PlatformError>;

    /// Deliver a message to a tab's UI context (fire-and-forget)
    async fn send_to_tab(&self, tab: TabId, message: TabMessage) -> Result<(), PlatformError>;

    /// Whether the capture host document currently exists
    async fn has_capture_host(&self) -> bool;

    /// Create the capture host document.
    ///
    /// Fails with [`PlatformError::HostAlreadyExists`] when one exists.
    async fn create_capture_host(&self) -> Result<(), PlatformError>;

    /// Close the capture host document if present
    async fn close_capture_host(&self) -> Result<(), PlatformError>;

    /// Deliver a command to the capture host (fire-and-forget)
    async fn send_to_capture_host(&self, command: EngineCommand) -> Result<(), PlatformError>;

    /// Issue a single-use stream id for capturing `tab`
    async fn tab_capture_stream_id(&self, tab: TabId) -> Result<StreamId, PlatformError>;
}
