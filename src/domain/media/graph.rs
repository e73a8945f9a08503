//! Media graph owned by one capture attempt

use super::mixer::AudioMixer;
use super::track::{MediaStream, MediaTrack};

/// Tracks handed to the encoding worker
#[derive(Debug, Clone)]
pub struct WorkerTracks {
    pub video: MediaTrack,
    /// Present only when the mixer produced an output track
    pub audio: Option<MediaTrack>,
}

/// Display stream, microphone stream and the mixer merging their audio
#[derive(Debug)]
pub struct MediaGraph {
    video: MediaStream,
    audio: Option<MediaStream>,
    mixer: Option<AudioMixer>,
}

impl MediaGraph {
    /// Assemble the graph from freshly acquired streams.
    ///
    /// Display audio is mixed in only when `capture_device_audio` is set.
    pub fn assemble(
        video: MediaStream,
        audio: Option<MediaStream>,
        capture_device_audio: bool,
    ) -> Self {
        let display_audio = if capture_device_audio {
            video.audio_tracks().next()
        } else {
            None
        };
        let microphone = audio.as_ref().and_then(|s| s.audio_tracks().next());
        let mixer = AudioMixer::build(display_audio, microphone);

        Self {
            video,
            audio,
            mixer,
        }
    }

    /// The video track and mixed audio track for the worker, if any video exists
    pub fn worker_tracks(&self) -> Option<WorkerTracks> {
        let video = self.video.video_tracks().next()?.clone();
        Some(WorkerTracks {
            video,
            audio: self.mixer.as_ref().map(|m| m.output().clone()),
        })
    }

    pub fn mixer(&self) -> Option<&AudioMixer> {
        self.mixer.as_ref()
    }

    pub fn has_microphone(&self) -> bool {
        self.audio
            .as_ref()
            .is_some_and(|s| s.audio_tracks().next().is_some())
    }

    /// Enable or disable every microphone track. No-op without a microphone.
    pub fn set_microphone_enabled(&self, enabled: bool) {
        if let Some(stream) = &self.audio {
            for track in stream.audio_tracks() {
                track.set_enabled(enabled);
            }
        }
    }

    /// Every track this graph owns, including the mixer output
    pub fn all_tracks(&self) -> Vec<MediaTrack> {
        let mut tracks: Vec<MediaTrack> = self.video.tracks().to_vec();
        if let Some(stream) = &self.audio {
            tracks.extend(stream.tracks().iter().cloned());
        }
        if let Some(mixer) = &self.mixer {
            tracks.push(mixer.output().clone());
        }
        tracks
    }

    /// Stop every track and close the mixer
    pub fn release(&mut self) {
        self.video.stop_all();
        if let Some(stream) = &self.audio {
            stream.stop_all();
        }
        if let Some(mixer) = &mut self.mixer {
            mixer.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display_with_audio() -> MediaStream {
        MediaStream::new(vec![
            MediaTrack::video("tab"),
            MediaTrack::audio("tab audio", 48_000),
        ])
    }

    #[test]
    fn device_audio_excluded_when_disabled() {
        let graph = MediaGraph::assemble(display_with_audio(), None, false);
        assert!(graph.mixer().is_none());
        let tracks = graph.worker_tracks().unwrap();
        assert!(tracks.audio.is_none());
    }

    #[test]
    fn both_sources_mixed_into_one_track() {
        let mic = MediaStream::new(vec![MediaTrack::audio("mic", 44_100)]);
        let graph = MediaGraph::assemble(display_with_audio(), Some(mic), true);

        let mixer = graph.mixer().unwrap();
        assert_eq!(mixer.stages().len(), 2);
        assert_eq!(mixer.sample_rate(), 44_100);

        let tracks = graph.worker_tracks().unwrap();
        assert_eq!(tracks.audio.unwrap().id(), mixer.output().id());
    }

    #[test]
    fn microphone_toggle() {
        let mic = MediaStream::new(vec![MediaTrack::audio("mic", 48_000)]);
        let graph = MediaGraph::assemble(display_with_audio(), Some(mic.clone()), true);
        assert!(graph.has_microphone());

        graph.set_microphone_enabled(false);
        assert!(mic.tracks().iter().all(|t| !t.is_enabled()));
    }

    #[test]
    fn release_stops_everything() {
        let mic = MediaStream::new(vec![MediaTrack::audio("mic", 48_000)]);
        let mut graph = MediaGraph::assemble(display_with_audio(), Some(mic), true);
        let tracks = graph.all_tracks();
        assert_eq!(tracks.len(), 4);

        graph.release();
        assert!(tracks.iter().all(MediaTrack::is_stopped));
        assert!(graph.mixer().unwrap().is_closed());
    }
}
