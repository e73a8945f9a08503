//! Audio mixing graph
//!
//! One gain stage per present source feeds a shared merger whose output is
//! the single audio track handed to the encoding worker.

use super::track::{MediaTrack, TrackKind};

/// Upper bound on the graph sample rate
pub const SAMPLE_RATE_CEILING: u32 = 48_000;

/// Display audio is attenuated so it does not drown out the microphone
pub const DISPLAY_AUDIO_GAIN: f32 = 0.7;

/// Microphone audio passes at unity gain
pub const MICROPHONE_GAIN: f32 = 1.0;

/// Where a gain stage's input comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSource {
    Display,
    Microphone,
}

/// A gain node attached to one source track
#[derive(Debug, Clone)]
pub struct GainStage {
    pub source: AudioSource,
    pub track_id: String,
    pub gain: f32,
}

/// Graph rate: the minimum of the ceiling and every present source rate.
/// Sources without a reported rate do not constrain the graph.
pub fn graph_sample_rate<I>(rates: I) -> u32
where
    I: IntoIterator<Item = Option<u32>>,
{
    rates
        .into_iter()
        .flatten()
        .fold(SAMPLE_RATE_CEILING, u32::min)
}

/// Merges display and microphone audio into one output track
#[derive(Debug)]
pub struct AudioMixer {
    sample_rate: u32,
    stages: Vec<GainStage>,
    output: MediaTrack,
    closed: bool,
}

impl AudioMixer {
    /// Build the graph for whichever sources are present.
    ///
    /// Returns `None` when neither source exists, in which case no audio
    /// track is handed to the worker.
    pub fn build(display: Option<&MediaTrack>, microphone: Option<&MediaTrack>) -> Option<Self> {
        let mut stages = Vec::with_capacity(2);
        let mut rates = Vec::with_capacity(2);

        if let Some(track) = display.filter(|t| t.kind() == TrackKind::Audio) {
            stages.push(GainStage {
                source: AudioSource::Display,
                track_id: track.id().to_string(),
                gain: DISPLAY_AUDIO_GAIN,
            });
            rates.push(track.sample_rate());
        }
        if let Some(track) = microphone.filter(|t| t.kind() == TrackKind::Audio) {
            stages.push(GainStage {
                source: AudioSource::Microphone,
                track_id: track.id().to_string(),
                gain: MICROPHONE_GAIN,
            });
            rates.push(track.sample_rate());
        }

        if stages.is_empty() {
            return None;
        }

        let sample_rate = graph_sample_rate(rates);
        Some(Self {
            sample_rate,
            stages,
            output: MediaTrack::audio("mixed", sample_rate),
            closed: false,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn stages(&self) -> &[GainStage] {
        &self.stages
    }

    /// The merger's output track
    pub fn output(&self) -> &MediaTrack {
        &self.output
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn gain_for(&self, source: AudioSource) -> Option<f32> {
        self.stages
            .iter()
            .find(|s| s.source == source)
            .map(|s| s.gain)
    }

    /// Mix one block of samples from each source.
    ///
    /// Inputs for sources without a gain stage are ignored. The result is
    /// as long as the longest contributing input, clamped to [-1, 1].
    pub fn mix(&self, display: &[f32], microphone: &[f32]) -> Vec<f32> {
        let inputs = [
            (self.gain_for(AudioSource::Display), display),
            (self.gain_for(AudioSource::Microphone), microphone),
        ];

        let len = inputs
            .iter()
            .filter(|(gain, _)| gain.is_some())
            .map(|(_, samples)| samples.len())
            .max()
            .unwrap_or(0);

        let mut out = vec![0.0f32; len];
        for (gain, samples) in inputs {
            let Some(gain) = gain else { continue };
            for (acc, sample) in out.iter_mut().zip(samples) {
                *acc += sample * gain;
            }
        }
        for sample in &mut out {
            *sample = sample.clamp(-1.0, 1.0);
        }
        out
    }

    /// Close the graph and end its output track. Idempotent.
    pub fn close(&mut self) {
        self.output.stop();
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_minimum_of_both_sources_and_ceiling() {
        let display = MediaTrack::audio("system", 48_000);
        let mic = MediaTrack::audio("mic", 44_100);
        let mixer = AudioMixer::build(Some(&display), Some(&mic)).unwrap();
        assert_eq!(mixer.sample_rate(), 44_100);
        assert_eq!(mixer.stages().len(), 2);
    }

    #[test]
    fn ceiling_caps_high_rates() {
        let display = MediaTrack::audio("system", 96_000);
        let mic = MediaTrack::audio("mic", 192_000);
        let mixer = AudioMixer::build(Some(&display), Some(&mic)).unwrap();
        assert_eq!(mixer.sample_rate(), SAMPLE_RATE_CEILING);
    }

    #[test]
    fn single_source_keeps_native_rate() {
        let mic = MediaTrack::audio("mic", 16_000);
        let mixer = AudioMixer::build(None, Some(&mic)).unwrap();
        assert_eq!(mixer.sample_rate(), 16_000);
        assert_eq!(mixer.stages()[0].source, AudioSource::Microphone);
        assert_eq!(mixer.output().sample_rate(), Some(16_000));
    }

    #[test]
    fn single_source_above_ceiling_is_capped() {
        let display = MediaTrack::audio("system", 96_000);
        let mixer = AudioMixer::build(Some(&display), None).unwrap();
        assert_eq!(mixer.sample_rate(), SAMPLE_RATE_CEILING);
        assert_eq!(mixer.stages()[0].source, AudioSource::Display);
    }

    #[test]
    fn no_sources_builds_nothing() {
        assert!(AudioMixer::build(None, None).is_none());
        let video = MediaTrack::video("screen");
        assert!(AudioMixer::build(Some(&video), None).is_none());
    }

    #[test]
    fn mix_applies_gains() {
        let display = MediaTrack::audio("system", 48_000);
        let mic = MediaTrack::audio("mic", 48_000);
        let mixer = AudioMixer::build(Some(&display), Some(&mic)).unwrap();

        let out = mixer.mix(&[1.0, 0.0], &[0.2, 0.5, 0.1]);
        assert_eq!(out.len(), 3);
        assert!((out[0] - 0.9).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert!((out[2] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn mix_clamps() {
        let display = MediaTrack::audio("system", 48_000);
        let mic = MediaTrack::audio("mic", 48_000);
        let mixer = AudioMixer::build(Some(&display), Some(&mic)).unwrap();

        let out = mixer.mix(&[1.0, -1.0], &[1.0, -1.0]);
        assert_eq!(out, vec![1.0, -1.0]);
    }

    #[test]
    fn mix_ignores_absent_source() {
        let mic = MediaTrack::audio("mic", 48_000);
        let mixer = AudioMixer::build(None, Some(&mic)).unwrap();
        let out = mixer.mix(&[1.0, 1.0, 1.0, 1.0], &[0.25]);
        assert_eq!(out, vec![0.25]);
    }

    #[test]
    fn close_ends_output() {
        let mic = MediaTrack::audio("mic", 48_000);
        let mut mixer = AudioMixer::build(None, Some(&mic)).unwrap();
        mixer.close();
        assert!(mixer.is_closed());
        assert!(mixer.output().is_stopped());
    }
}
