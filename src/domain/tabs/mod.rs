//! Tab identity value objects

use std::fmt;

use serde::{Deserialize, Serialize};

/// URL prefixes of internal pages that never receive the recording UI
const PRIVILEGED_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "chrome-untrusted://",
    "edge://",
    "brave://",
    "about:",
    "view-source:",
    "devtools://",
    "https://chrome.google.com/webstore",
    "https://chromewebstore.google.com",
];

/// Browser tab identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of a tab as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub active: bool,
}

impl Tab {
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            active: false,
        }
    }

    /// Internal pages cannot host injected UI
    pub fn is_privileged(&self) -> bool {
        is_privileged_url(&self.url)
    }
}

/// Check whether a URL points at an internal or otherwise protected page
pub fn is_privileged_url(url: &str) -> bool {
    let url = url.trim();
    PRIVILEGED_PREFIXES.iter().any(|p| url.starts_with(p))
}

/// Navigation status carried by tab-updated events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
}

/// Change information for a tab-updated event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabChange {
    #[serde(default)]
    pub status: Option<TabStatus>,
    #[serde(default)]
    pub url: Option<String>,
}

impl TabChange {
    pub fn completed() -> Self {
        Self {
            status: Some(TabStatus::Complete),
            url: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == Some(TabStatus::Complete)
    }
}

/// Singleton tabs the coordinator opens and then messages once ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabRole {
    Editor,
    Authentication,
}

impl fmt::Display for TabRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Editor => write!(f, "editor"),
            Self::Authentication => write!(f, "authentication"),
        }
    }
}
