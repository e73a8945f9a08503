//! Message contract between the UI, the coordinator and the capture host

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::{BlobId, CorrelationId};
use crate::domain::capture::{CaptureRequest, StreamId};
use crate::domain::tabs::TabId;

/// Session operations that end in exactly one success or failure event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Capture,
    Record,
    Pause,
    Resume,
    Save,
    Discard,
}

impl Operation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Record => "record",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Save => "save",
            Self::Discard => "discard",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extra data attached to a success event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Completion {
    Captured { countdown: bool },
    Saved { blob: BlobId },
}

/// Terminal notification emitted by the capture engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum EngineEvent {
    Succeeded {
        id: CorrelationId,
        operation: Operation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<Completion>,
    },
    Failed {
        id: CorrelationId,
        operation: Operation,
        error: String,
    },
}

impl EngineEvent {
    pub fn succeeded(id: CorrelationId, operation: Operation) -> Self {
        Self::Succeeded {
            id,
            operation,
            detail: None,
        }
    }

    pub fn captured(id: CorrelationId, countdown: bool) -> Self {
        Self::Succeeded {
            id,
            operation: Operation::Capture,
            detail: Some(Completion::Captured { countdown }),
        }
    }

    pub fn saved(id: CorrelationId, blob: BlobId) -> Self {
        Self::Succeeded {
            id,
            operation: Operation::Save,
            detail: Some(Completion::Saved { blob }),
        }
    }

    pub fn failed(id: CorrelationId, operation: Operation, error: impl fmt::Display) -> Self {
        Self::Failed {
            id,
            operation,
            error: error.to_string(),
        }
    }

    pub fn id(&self) -> CorrelationId {
        match self {
            Self::Succeeded { id, .. } | Self::Failed { id, .. } => *id,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Succeeded { operation, .. } | Self::Failed { operation, .. } => *operation,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Blob produced by a successful save
    pub fn saved_blob(&self) -> Option<&BlobId> {
        match self {
            Self::Succeeded {
                detail: Some(Completion::Saved { blob }),
                ..
            } => Some(blob),
            _ => None,
        }
    }

    /// Wire-style name, e.g. `capture-succeeded`
    pub fn name(&self) -> String {
        let suffix = if self.is_success() {
            "succeeded"
        } else {
            "failed"
        };
        format!("{}-{}", self.operation(), suffix)
    }
}

/// Command delivered from the coordinator to the capture host
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCommand {
    pub id: CorrelationId,
    pub kind: EngineCommandKind,
}

impl EngineCommand {
    pub fn new(kind: EngineCommandKind) -> Self {
        Self {
            id: CorrelationId::new(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommandKind {
    Capture {
        request: CaptureRequest,
        stream_id: Option<StreamId>,
    },
    Record,
    Pause,
    Resume,
    Stop,
    Discard,
    Cancel,
    SetMuted(bool),
}

impl EngineCommandKind {
    /// The operation whose terminal event answers this command, if any
    pub const fn operation(&self) -> Option<Operation> {
        match self {
            Self::Capture { .. } => Some(Operation::Capture),
            Self::Record => Some(Operation::Record),
            Self::Pause => Some(Operation::Pause),
            Self::Resume => Some(Operation::Resume),
            Self::Stop => Some(Operation::Save),
            Self::Discard => Some(Operation::Discard),
            Self::Cancel | Self::SetMuted(_) => None,
        }
    }
}

/// Every message the coordinator routes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Message {
    CloseSession,
    StartTabCapture(CaptureRequest),
    StartDisplayCapture(CaptureRequest),
    StartRecording,
    PauseRecording,
    ResumeRecording,
    SaveRecording,
    DiscardRecording,
    CancelCapture,
    SetMuted {
        muted: bool,
    },
    EngineEvent {
        event: EngineEvent,
    },
    GetSessionStorage {
        #[serde(default)]
        keys: Vec<String>,
    },
    SetSessionStorage {
        entries: Map<String, Value>,
    },
    AuthenticationSucceeded {
        credentials: String,
    },
}

impl Message {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CloseSession => "close-session",
            Self::StartTabCapture(_) => "start-tab-capture",
            Self::StartDisplayCapture(_) => "start-display-capture",
            Self::StartRecording => "start-recording",
            Self::PauseRecording => "pause-recording",
            Self::ResumeRecording => "resume-recording",
            Self::SaveRecording => "save-recording",
            Self::DiscardRecording => "discard-recording",
            Self::CancelCapture => "cancel-capture",
            Self::SetMuted { .. } => "set-muted",
            Self::EngineEvent { .. } => "engine-event",
            Self::GetSessionStorage { .. } => "get-session-storage",
            Self::SetSessionStorage { .. } => "set-session-storage",
            Self::AuthenticationSucceeded { .. } => "authentication-succeeded",
        }
    }
}

/// Who sent a routed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSender {
    Tab(TabId),
    CaptureHost,
    External,
}

impl MessageSender {
    pub fn tab(&self) -> Option<TabId> {
        match self {
            Self::Tab(id) => Some(*id),
            _ => None,
        }
    }
}

/// Synchronous-style reply for request/response messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Reply {
    Ok,
    Storage { values: Map<String, Value> },
    Error { message: String },
}

/// Messages the coordinator delivers to tabs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TabMessage {
    SessionClosed,
    EngineEvent { event: EngineEvent },
    LoadRecording { blob: BlobId },
}
