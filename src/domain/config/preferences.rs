//! Durable user preferences value object

use serde::{Deserialize, Serialize};

use crate::domain::capture::{Surface, NO_MICROPHONE};

/// Durable user preferences and the authenticated credential blob.
/// All fields are optional to support partial files and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub microphone_id: Option<String>,
    pub camera_id: Option<String>,
    pub push_to_talk: Option<bool>,
    pub desktop_audio: Option<bool>,
    pub surface: Option<String>,
    pub countdown: Option<bool>,
    pub credentials: Option<String>,
}

impl Preferences {
    /// Create preferences with default values
    pub fn defaults() -> Self {
        Self {
            microphone_id: Some(NO_MICROPHONE.to_string()),
            camera_id: None,
            push_to_talk: Some(false),
            desktop_audio: Some(true),
            surface: Some(Surface::Tab.to_string()),
            countdown: Some(true),
            credentials: None,
        }
    }

    /// Create empty preferences (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge with another set, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            microphone_id: other.microphone_id.or(self.microphone_id),
            camera_id: other.camera_id.or(self.camera_id),
            push_to_talk: other.push_to_talk.or(self.push_to_talk),
            desktop_audio: other.desktop_audio.or(self.desktop_audio),
            surface: other.surface.or(self.surface),
            countdown: other.countdown.or(self.countdown),
            credentials: other.credentials.or(self.credentials),
        }
    }

    /// Get surface as parsed Surface, or default if not set/invalid
    pub fn surface_or_default(&self) -> Surface {
        self.surface
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get push-to-talk setting, or false if not set
    pub fn push_to_talk_or_default(&self) -> bool {
        self.push_to_talk.unwrap_or(false)
    }

    /// Get desktop audio setting, or true if not set
    pub fn desktop_audio_or_default(&self) -> bool {
        self.desktop_audio.unwrap_or(true)
    }

    /// Get countdown setting, or true if not set
    pub fn countdown_or_default(&self) -> bool {
        self.countdown.unwrap_or(true)
    }

    /// Whether an authenticated session credential is stored
    pub fn is_authenticated(&self) -> bool {
        self.credentials.as_deref().is_some_and(|c| !c.is_empty())
    }
}
