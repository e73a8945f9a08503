//! Headless media devices
//!
//! Microphones are looked up through cpal so device ids and sample rates
//! match the host. Display and tab streams are synthetic tracks, since a
//! headless daemon has no compositor to capture from.

use std::sync::Arc;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait};
use tracing::debug;

use super::grants::{GrantRejection, StreamGrants};
use crate::application::ports::{AcquisitionError, MediaDevices};
use crate::domain::capture::{StreamId, Surface};
use crate::domain::media::{MediaStream, MediaTrack};

/// Device id selecting the host's default input
pub const DEFAULT_DEVICE: &str = "default";

/// Native rate of synthetic display audio
pub const DISPLAY_AUDIO_RATE: u32 = 48_000;

/// A microphone visible to the audio host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicrophoneInfo {
    pub name: String,
    pub sample_rate: Option<u32>,
    pub is_default: bool,
}

/// Media devices backed by cpal for input and synthetic display sources
pub struct HeadlessMediaDevices {
    grants: Arc<StreamGrants>,
}

impl HeadlessMediaDevices {
    pub fn new(grants: Arc<StreamGrants>) -> Self {
        Self { grants }
    }

    /// List every input device on the default host
    pub fn list_microphones() -> Result<Vec<MicrophoneInfo>, AcquisitionError> {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let devices = host
            .input_devices()
            .map_err(|e| AcquisitionError::Unavailable(e.to_string()))?;

        Ok(devices
            .filter_map(|device| {
                let name = device.name().ok()?;
                let sample_rate = device
                    .default_input_config()
                    .ok()
                    .map(|config| config.sample_rate().0);
                Some(MicrophoneInfo {
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    name,
                    sample_rate,
                })
            })
            .collect())
    }

    /// Find an input device by id: the default marker, an exact name, or a
    /// case-insensitive name fragment
    fn find_microphone(device_id: &str) -> Result<(String, u32), AcquisitionError> {
        let host = cpal::default_host();

        let device = if device_id == DEFAULT_DEVICE {
            host.default_input_device()
        } else {
            let wanted = device_id.to_lowercase();
            let mut candidates: Vec<cpal::Device> = host
                .input_devices()
                .map_err(|e| AcquisitionError::Unavailable(e.to_string()))?
                .collect();
            let exact = candidates
                .iter()
                .position(|d| d.name().is_ok_and(|n| n == device_id));
            let partial = || {
                candidates
                    .iter()
                    .position(|d| d.name().is_ok_and(|n| n.to_lowercase().contains(&wanted)))
            };
            exact.or_else(partial).map(|i| candidates.swap_remove(i))
        };

        let device = device.ok_or_else(|| AcquisitionError::DeviceNotFound(device_id.to_string()))?;
        let name = device
            .name()
            .map_err(|e| AcquisitionError::Unavailable(e.to_string()))?;
        let config = device
            .default_input_config()
            .map_err(|e| AcquisitionError::PermissionDenied(e.to_string()))?;

        Ok((name, config.sample_rate().0))
    }

    fn synthetic_display(label: String, with_audio: bool) -> MediaStream {
        let mut tracks = vec![MediaTrack::video(label)];
        if with_audio {
            tracks.push(MediaTrack::audio("display audio", DISPLAY_AUDIO_RATE));
        }
        MediaStream::new(tracks)
    }
}

#[async_trait]
impl MediaDevices for HeadlessMediaDevices {
    async fn display_media(
        &self,
        surface: Surface,
        with_audio: bool,
    ) -> Result<MediaStream, AcquisitionError> {
        if surface.requires_stream_id() {
            return Err(AcquisitionError::MissingStreamId);
        }
        debug!(surface = %surface, with_audio, "Acquiring display stream");
        Ok(Self::synthetic_display(
            format!("{} capture", surface),
            with_audio,
        ))
    }

    async fn tab_media(
        &self,
        stream_id: &StreamId,
        with_audio: bool,
    ) -> Result<MediaStream, AcquisitionError> {
        let tab = self.grants.redeem(stream_id).map_err(|rejection| match rejection {
            GrantRejection::Consumed => AcquisitionError::StreamIdConsumed(stream_id.to_string()),
            GrantRejection::Unknown => {
                AcquisitionError::PermissionDenied(format!("unknown stream id {}", stream_id))
            }
        })?;
        debug!(tab = %tab, with_audio, "Acquiring tab stream");
        Ok(Self::synthetic_display(format!("tab {}", tab), with_audio))
    }

    async fn user_media(&self, device_id: &str) -> Result<MediaStream, AcquisitionError> {
        let device_id = device_id.to_string();
        // cpal enumeration blocks on some hosts
        let (name, sample_rate) =
            tokio::task::spawn_blocking(move || Self::find_microphone(&device_id))
                .await
                .map_err(|e| AcquisitionError::Unavailable(e.to_string()))??;

        debug!(device = %name, sample_rate, "Acquired microphone");
        Ok(MediaStream::new(vec![MediaTrack::audio(name, sample_rate)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::TrackKind;
    use crate::domain::tabs::TabId;

    #[tokio::test]
    async fn window_capture_is_synthetic() {
        let devices = HeadlessMediaDevices::new(Arc::new(StreamGrants::new()));
        let stream = devices.display_media(Surface::Window, true).await.unwrap();

        assert_eq!(stream.video_tracks().count(), 1);
        let audio = stream.audio_tracks().next().unwrap();
        assert_eq!(audio.kind(), TrackKind::Audio);
        assert_eq!(audio.sample_rate(), Some(DISPLAY_AUDIO_RATE));
    }

    #[tokio::test]
    async fn tab_capture_redeems_stream_id_once() {
        let grants = Arc::new(StreamGrants::new());
        let devices = HeadlessMediaDevices::new(Arc::clone(&grants));
        let stream_id = grants.issue(TabId(9));

        let stream = devices.tab_media(&stream_id, false).await.unwrap();
        assert_eq!(stream.audio_tracks().count(), 0);

        let again = devices.tab_media(&stream_id, false).await;
        assert!(matches!(again, Err(AcquisitionError::StreamIdConsumed(_))));
    }

    #[tokio::test]
    async fn display_media_refuses_tab_surface() {
        let devices = HeadlessMediaDevices::new(Arc::new(StreamGrants::new()));
        let result = devices.display_media(Surface::Tab, false).await;
        assert!(matches!(result, Err(AcquisitionError::MissingStreamId)));
    }
}
