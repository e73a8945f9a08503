//! In-process encoding worker
//!
//! Runs on its own task and answers correlated requests over channels. It
//! does not encode media; it records the track layout and the recorded
//! segments and emits them as a JSON manifest on finish.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::application::ports::{EncodingWorker, WorkerError};
use crate::domain::media::{MediaTrack, WorkerTracks};
use crate::domain::protocol::CorrelationId;

const REQUEST_QUEUE: usize = 32;

#[derive(Debug)]
enum RequestKind {
    Open(WorkerTracks),
    Record,
    Pause,
    Resume,
    Finish,
    Discard,
}

impl RequestKind {
    const fn operation(&self) -> &'static str {
        match self {
            Self::Open(_) => "open",
            Self::Record => "record",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Finish => "finish",
            Self::Discard => "discard",
        }
    }
}

#[derive(Debug)]
enum Output {
    Ack,
    Buffer(Vec<u8>),
}

struct Request {
    id: CorrelationId,
    kind: RequestKind,
    reply: oneshot::Sender<Response>,
}

struct Response {
    id: CorrelationId,
    result: Result<Output, WorkerError>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackEntry {
    id: String,
    kind: String,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,
}

impl From<&MediaTrack> for TrackEntry {
    fn from(track: &MediaTrack) -> Self {
        Self {
            id: track.id().to_string(),
            kind: track.kind().to_string(),
            label: track.label().to_string(),
            sample_rate: track.sample_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Segment {
    start: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<DateTime<Utc>>,
}

/// Manifest produced on finish
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    video: TrackEntry,
    audio: Option<TrackEntry>,
    segments: Vec<Segment>,
    duration_ms: i64,
}

#[derive(Default)]
struct WorkerState {
    tracks: Option<WorkerTracks>,
    segments: Vec<Segment>,
}

impl WorkerState {
    fn recording(&self) -> bool {
        self.segments.last().is_some_and(|s| s.end.is_none())
    }

    fn close_segment(&mut self) {
        if let Some(segment) = self.segments.last_mut() {
            if segment.end.is_none() {
                segment.end = Some(Utc::now());
            }
        }
    }

    fn handle(&mut self, kind: RequestKind) -> Result<Output, WorkerError> {
        let operation = kind.operation();
        match kind {
            RequestKind::Open(tracks) => {
                *self = Self {
                    tracks: Some(tracks),
                    segments: Vec::new(),
                };
                Ok(Output::Ack)
            }
            RequestKind::Discard => {
                *self = Self::default();
                Ok(Output::Ack)
            }
            _ if self.tracks.is_none() => Err(WorkerError::NotOpen),
            RequestKind::Record | RequestKind::Resume => {
                if !self.recording() {
                    self.segments.push(Segment {
                        start: Utc::now(),
                        end: None,
                    });
                }
                Ok(Output::Ack)
            }
            RequestKind::Pause => {
                if !self.recording() {
                    return Err(WorkerError::Rejected {
                        operation: operation.to_string(),
                        message: "not recording".to_string(),
                    });
                }
                self.close_segment();
                Ok(Output::Ack)
            }
            RequestKind::Finish => {
                self.close_segment();
                let buffer = self.manifest()?;
                *self = Self::default();
                Ok(Output::Buffer(buffer))
            }
        }
    }

    fn manifest(&self) -> Result<Vec<u8>, WorkerError> {
        let tracks = self.tracks.as_ref().ok_or(WorkerError::NotOpen)?;
        let duration_ms = self
            .segments
            .iter()
            .filter_map(|s| s.end.map(|end| (end - s.start).num_milliseconds()))
            .sum();

        let manifest = Manifest {
            video: TrackEntry::from(&tracks.video),
            audio: tracks.audio.as_ref().map(TrackEntry::from),
            segments: self.segments.clone(),
            duration_ms,
        };

        serde_json::to_vec_pretty(&manifest).map_err(|e| WorkerError::Rejected {
            operation: "finish".to_string(),
            message: e.to_string(),
        })
    }
}

/// Handle to the worker task
pub struct BufferingWorker {
    requests: mpsc::Sender<Request>,
}

impl BufferingWorker {
    /// Spawn the worker task. It runs until every handle is dropped.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel::<Request>(REQUEST_QUEUE);

        tokio::spawn(async move {
            let mut state = WorkerState::default();
            while let Some(request) = rx.recv().await {
                let operation = request.kind.operation();
                let result = state.handle(request.kind);
                debug!(correlation = %request.id, operation, ok = result.is_ok(), "Worker request handled");
                // The caller may have gone away; nothing to do then
                let _ = request.reply.send(Response {
                    id: request.id,
                    result,
                });
            }
            debug!("Encoding worker stopped");
        });

        Self { requests: tx }
    }

    async fn call(&self, id: CorrelationId, kind: RequestKind) -> Result<Output, WorkerError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request { id, kind, reply })
            .await
            .map_err(|_| WorkerError::Unavailable)?;

        let response = response.await.map_err(|_| WorkerError::Unavailable)?;
        if response.id != id {
            return Err(WorkerError::Mismatched {
                expected: id,
                received: response.id,
            });
        }
        response.result
    }

    async fn ack(&self, id: CorrelationId, kind: RequestKind) -> Result<(), WorkerError> {
        self.call(id, kind).await.map(|_| ())
    }
}

#[async_trait]
impl EncodingWorker for BufferingWorker {
    async fn open(&self, id: CorrelationId, tracks: WorkerTracks) -> Result<(), WorkerError> {
        self.ack(id, RequestKind::Open(tracks)).await
    }

    async fn record(&self, id: CorrelationId) -> Result<(), WorkerError> {
        self.ack(id, RequestKind::Record).await
    }

    async fn pause(&self, id: CorrelationId) -> Result<(), WorkerError> {
        self.ack(id, RequestKind::Pause).await
    }

    async fn resume(&self, id: CorrelationId) -> Result<(), WorkerError> {
        self.ack(id, RequestKind::Resume).await
    }

    async fn finish(&self, id: CorrelationId) -> Result<Vec<u8>, WorkerError> {
        match self.call(id, RequestKind::Finish).await? {
            Output::Buffer(bytes) => Ok(bytes),
            Output::Ack => Err(WorkerError::Rejected {
                operation: "finish".to_string(),
                message: "worker returned no buffer".to_string(),
            }),
        }
    }

    async fn discard(&self, id: CorrelationId) -> Result<(), WorkerError> {
        self.ack(id, RequestKind::Discard).await
    }
}
