//! Media domain module

mod graph;
mod mixer;
mod track;

pub use graph::{MediaGraph, WorkerTracks};
pub use mixer::{
    graph_sample_rate, AudioMixer, AudioSource, GainStage, DISPLAY_AUDIO_GAIN, MICROPHONE_GAIN,
    SAMPLE_RATE_CEILING,
};
pub use track::{MediaStream, MediaTrack, ReadyState, TrackKind};
