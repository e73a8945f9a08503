mod state;

pub use state::{
    CaptureSession, EngineState, InvalidStateTransition, RecordingState, Transition,
    ELAPSED_SECONDS_KEY, RECORDING_STATE_KEY,
};
