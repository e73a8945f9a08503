//! Capture configuration value objects

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Surface;
use crate::domain::config::Preferences;

/// Sentinel microphone id meaning "no microphone selected"
pub const NO_MICROPHONE: &str = "none";

/// Microphone selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MicrophoneId {
    #[default]
    None,
    Device(String),
}

impl MicrophoneId {
    /// Build from a raw device id, mapping the sentinel and blanks to `None`
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_MICROPHONE) {
            Self::None
        } else {
            Self::Device(trimmed.to_string())
        }
    }

    /// Device id, if a microphone is selected
    pub fn device(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Device(id) => Some(id),
        }
    }
}

impl fmt::Display for MicrophoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "{}", NO_MICROPHONE),
            Self::Device(id) => write!(f, "{}", id),
        }
    }
}

/// Opaque single-use token authorizing tab capture
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Start-capture payload sent by the UI. Unset fields fall back to
/// persisted preferences, then to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureRequest {
    pub surface: Option<Surface>,
    pub microphone_id: Option<String>,
    pub capture_device_audio: Option<bool>,
    pub push_to_talk: Option<bool>,
    pub countdown_enabled: Option<bool>,
}

/// Resolved configuration for one capture attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub surface: Surface,
    pub microphone: MicrophoneId,
    pub capture_device_audio: bool,
    pub stream_id: Option<StreamId>,
    pub muted: bool,
    pub push_to_talk: bool,
    pub countdown: bool,
}

impl CaptureConfig {
    /// Resolve a request against persisted preferences.
    /// Precedence: defaults < preferences < request.
    pub fn resolve(
        request: &CaptureRequest,
        stream_id: Option<StreamId>,
        preferences: &Preferences,
    ) -> Self {
        let microphone = request
            .microphone_id
            .as_deref()
            .or(preferences.microphone_id.as_deref())
            .map(MicrophoneId::from_raw)
            .unwrap_or_default();
        let push_to_talk = request
            .push_to_talk
            .unwrap_or_else(|| preferences.push_to_talk_or_default());

        Self {
            surface: request.surface.unwrap_or_else(|| preferences.surface_or_default()),
            microphone,
            capture_device_audio: request
                .capture_device_audio
                .unwrap_or_else(|| preferences.desktop_audio_or_default()),
            stream_id,
            // Push-to-talk starts with the microphone gated
            muted: push_to_talk,
            push_to_talk,
            countdown: request
                .countdown_enabled
                .unwrap_or_else(|| preferences.countdown_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn microphone_sentinel_maps_to_none() {
        assert_eq!(MicrophoneId::from_raw("none"), MicrophoneId::None);
        assert_eq!(MicrophoneId::from_raw("  "), MicrophoneId::None);
        assert_eq!(
            MicrophoneId::from_raw("usb-mic"),
            MicrophoneId::Device("usb-mic".to_string())
        );
        assert_eq!(MicrophoneId::None.to_string(), "none");
    }

    #[test]
    fn request_overrides_preferences() {
        let preferences = Preferences {
            microphone_id: Some("built-in".to_string()),
            desktop_audio: Some(false),
            surface: Some("window".to_string()),
            ..Default::default()
        };
        let request = CaptureRequest {
            surface: Some(Surface::Screen),
            microphone_id: Some("usb-mic".to_string()),
            ..Default::default()
        };

        let config = CaptureConfig::resolve(&request, None, &preferences);
        assert_eq!(config.surface, Surface::Screen);
        assert_eq!(config.microphone.device(), Some("usb-mic"));
        assert!(!config.capture_device_audio);
    }

    #[test]
    fn preferences_fill_gaps() {
        let preferences = Preferences {
            microphone_id: Some("built-in".to_string()),
            push_to_talk: Some(true),
            countdown: Some(false),
            ..Default::default()
        };

        let config = CaptureConfig::resolve(&CaptureRequest::default(), None, &preferences);
        assert_eq!(config.microphone.device(), Some("built-in"));
        assert!(config.push_to_talk);
        assert!(config.muted);
        assert!(!config.countdown);
    }

    #[test]
    fn defaults_without_preferences() {
        let config =
            CaptureConfig::resolve(&CaptureRequest::default(), None, &Preferences::empty());
        assert_eq!(config.surface, Surface::Tab);
        assert_eq!(config.microphone, MicrophoneId::None);
        assert!(config.capture_device_audio);
        assert!(!config.muted);
        assert!(config.countdown);
    }

    #[test]
    fn request_deserializes_camel_case() {
        let request: CaptureRequest = serde_json::from_str(
            r#"{"surface":"window","microphoneId":"none","captureDeviceAudio":true}"#,
        )
        .unwrap();
        assert_eq!(request.surface, Some(Surface::Window));
        assert_eq!(request.microphone_id.as_deref(), Some("none"));
        assert_eq!(request.capture_device_audio, Some(true));
        assert!(request.push_to_talk.is_none());
    }
}
