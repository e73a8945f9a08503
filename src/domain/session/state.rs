//! Capture session state machine

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session storage key holding the persisted [`RecordingState`]
pub const RECORDING_STATE_KEY: &str = "recordingState";

/// Session storage key holding the elapsed recording seconds
pub const ELAPSED_SECONDS_KEY: &str = "elapsedSeconds";

/// Recording state as persisted in the session store and shown to UI contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    #[default]
    Inactive,
    Recording,
    Paused,
}

impl RecordingState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Internal capture engine states.
///
/// `Acquiring` and `Capturing` are not visible outside the engine; both
/// persist as [`RecordingState::Inactive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineState {
    #[default]
    Inactive,
    Acquiring,
    Capturing,
    Recording,
    Paused,
}

impl EngineState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Acquiring => "acquiring",
            Self::Capturing => "capturing",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }

    /// The state written to the session store for this engine state
    pub const fn persisted(&self) -> RecordingState {
        match self {
            Self::Recording => RecordingState::Recording,
            Self::Paused => RecordingState::Paused,
            Self::Inactive | Self::Acquiring | Self::Capturing => RecordingState::Inactive,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Media acquisition requested
    Acquire,
    /// Media acquired and handed to the worker
    Acquired,
    /// Worker acknowledged record
    Record,
    /// Worker acknowledged pause
    Pause,
    /// Worker acknowledged resume
    Resume,
    /// Local resources released (stop, discard, cancel, failure)
    Teardown,
}

impl Transition {
    const fn action(&self) -> &'static str {
        match self {
            Self::Acquire => "acquire media",
            Self::Acquired => "adopt acquired media",
            Self::Record => "start recording",
            Self::Pause => "pause recording",
            Self::Resume => "resume recording",
            Self::Teardown => "tear down",
        }
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: EngineState,
    pub action: String,
}

/// Capture session entity.
///
/// State machine:
///   INACTIVE -> ACQUIRING (acquire)
///   ACQUIRING -> CAPTURING (acquired)
///   CAPTURING -> RECORDING (record)
///   RECORDING -> PAUSED (pause)
///   PAUSED -> RECORDING (resume)
///   any -> INACTIVE (teardown)
#[derive(Debug, Default)]
pub struct CaptureSession {
    state: EngineState,
}

impl CaptureSession {
    /// Create a new session in inactive state
    pub fn new() -> Self {
        Self {
            state: EngineState::Inactive,
        }
    }

    /// Get the current state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Get the state as persisted for UI contexts
    pub fn recording_state(&self) -> RecordingState {
        self.state.persisted()
    }

    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        self.state == EngineState::Recording
    }

    /// Check if currently paused
    pub fn is_paused(&self) -> bool {
        self.state == EngineState::Paused
    }

    /// Check if any media is held (acquired or being acquired)
    pub fn holds_media(&self) -> bool {
        self.state != EngineState::Inactive
    }

    /// Check whether `transition` is valid from the current state
    pub fn can(&self, transition: Transition) -> bool {
        Self::target(self.state, transition).is_some()
    }

    /// Apply `transition`, validating the current state first
    pub fn transition(
        &mut self,
        transition: Transition,
    ) -> Result<EngineState, InvalidStateTransition> {
        let next = Self::target(self.state, transition).ok_or_else(|| InvalidStateTransition {
            current_state: self.state,
            action: transition.action().to_string(),
        })?;
        self.state = next;
        Ok(next)
    }

    fn target(from: EngineState, transition: Transition) -> Option<EngineState> {
        use EngineState as S;
        match (from, transition) {
            (S::Inactive, Transition::Acquire) => Some(S::Acquiring),
            (S::Acquiring, Transition::Acquired) => Some(S::Capturing),
            (S::Capturing, Transition::Record) => Some(S::Recording),
            (S::Recording, Transition::Pause) => Some(S::Paused),
            (S::Paused, Transition::Resume) => Some(S::Recording),
            (_, Transition::Teardown) => Some(S::Inactive),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capturing() -> CaptureSession {
        let mut session = CaptureSession::new();
        session.transition(Transition::Acquire).unwrap();
        session.transition(Transition::Acquired).unwrap();
        session
    }

    #[test]
    fn new_session_is_inactive() {
        let session = CaptureSession::new();
        assert_eq!(session.state(), EngineState::Inactive);
        assert_eq!(session.recording_state(), RecordingState::Inactive);
        assert!(!session.holds_media());
    }

    #[test]
    fn acquire_then_record() {
        let mut session = capturing();
        assert_eq!(session.state(), EngineState::Capturing);
        assert_eq!(session.recording_state(), RecordingState::Inactive);

        session.transition(Transition::Record).unwrap();
        assert!(session.is_recording());
        assert_eq!(session.recording_state(), RecordingState::Recording);
    }

    #[test]
    fn record_from_inactive_fails() {
        let mut session = CaptureSession::new();
        let err = session.transition(Transition::Record).unwrap_err();
        assert_eq!(err.current_state, EngineState::Inactive);
        assert!(err.action.contains("start recording"));
    }

    #[test]
    fn acquire_twice_fails() {
        let mut session = CaptureSession::new();
        session.transition(Transition::Acquire).unwrap();
        let err = session.transition(Transition::Acquire).unwrap_err();
        assert_eq!(err.current_state, EngineState::Acquiring);
    }

    #[test]
    fn pause_only_from_recording() {
        let mut session = capturing();
        assert!(!session.can(Transition::Pause));

        session.transition(Transition::Record).unwrap();
        session.transition(Transition::Pause).unwrap();
        assert!(session.is_paused());
        assert!(!session.can(Transition::Pause));
    }

    #[test]
    fn resume_only_from_paused() {
        let mut session = capturing();
        session.transition(Transition::Record).unwrap();
        assert!(!session.can(Transition::Resume));

        session.transition(Transition::Pause).unwrap();
        session.transition(Transition::Resume).unwrap();
        assert!(session.is_recording());
    }

    #[test]
    fn teardown_from_any_state() {
        let mut session = capturing();
        session.transition(Transition::Record).unwrap();
        session.transition(Transition::Pause).unwrap();
        session.transition(Transition::Teardown).unwrap();
        assert_eq!(session.state(), EngineState::Inactive);

        // Teardown while inactive is allowed
        session.transition(Transition::Teardown).unwrap();
        assert_eq!(session.state(), EngineState::Inactive);
    }

    #[test]
    fn adopting_media_after_teardown_fails() {
        let mut session = CaptureSession::new();
        session.transition(Transition::Acquire).unwrap();
        session.transition(Transition::Teardown).unwrap();

        assert!(session.transition(Transition::Acquired).is_err());
    }

    #[test]
    fn state_display() {
        assert_eq!(RecordingState::Inactive.to_string(), "inactive");
        assert_eq!(RecordingState::Paused.to_string(), "paused");
        assert_eq!(EngineState::Capturing.to_string(), "capturing");
    }

    #[test]
    fn recording_state_serializes_lowercase() {
        let json = serde_json::to_value(RecordingState::Recording).unwrap();
        assert_eq!(json, serde_json::json!("recording"));
    }
}
