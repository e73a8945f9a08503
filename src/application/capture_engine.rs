//! Capture engine use case
//!
//! Owns media acquisition, the audio mixing graph, the worker hand-off and
//! the recording state machine. Every operation ends in exactly one
//! terminal [`EngineEvent`], except the local-only `cancel` and `set_muted`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::capture::{CaptureConfig, CaptureRequest, StreamId};
use crate::domain::config::Preferences;
use crate::domain::media::MediaGraph;
use crate::domain::protocol::{
    CorrelationId, EngineCommand, EngineCommandKind, EngineEvent, Operation,
};
use crate::domain::session::{
    CaptureSession, EngineState, InvalidStateTransition, RecordingState, Transition,
    ELAPSED_SECONDS_KEY, RECORDING_STATE_KEY,
};

use super::capture_host::CommandHandler;
use super::ports::{
    AcquisitionError, BlobStore, EncodingWorker, EventSink, MediaDevices, PreferenceStore,
    SessionStore, StorageError, WorkerError,
};

/// Interval between elapsed-time ticks
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Errors carried by `-failed` engine events
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Media acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Encoding worker failed: {0}")]
    Worker(#[from] WorkerError),

    #[error("Storing the recording failed: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    InvalidState(#[from] InvalidStateTransition),

    #[error("Display stream carried no video track")]
    NoVideoTrack,

    #[error("No capture is active")]
    NotCapturing,
}

#[derive(Debug, Default)]
struct EngineInner {
    session: CaptureSession,
    graph: Option<MediaGraph>,
    /// Capture attempt currently owning the media graph
    attempt: Option<CorrelationId>,
    ticker: Option<JoinHandle<()>>,
    muted: bool,
    /// Mute requested while acquiring, applied when the graph is adopted
    pending_mute: Option<bool>,
}

/// Capture engine use case
pub struct CaptureEngine<M, W, S, P, B, E>
where
    M: MediaDevices,
    W: EncodingWorker,
    S: SessionStore + 'static,
    P: PreferenceStore,
    B: BlobStore,
    E: EventSink,
{
    media: Arc<M>,
    worker: Arc<W>,
    session_store: Arc<S>,
    preferences: Arc<P>,
    blobs: Arc<B>,
    events: Arc<E>,
    inner: Arc<Mutex<EngineInner>>,
    /// Serializes the record/pause/resume worker round-trips
    op_lock: Mutex<()>,
    elapsed: Arc<AtomicU64>,
}

impl<M, W, S, P, B, E> CaptureEngine<M, W, S, P, B, E>
where
    M: MediaDevices,
    W: EncodingWorker,
    S: SessionStore + 'static,
    P: PreferenceStore,
    B: BlobStore,
    E: EventSink,
{
    pub fn new(
        media: Arc<M>,
        worker: Arc<W>,
        session_store: Arc<S>,
        preferences: Arc<P>,
        blobs: Arc<B>,
        events: Arc<E>,
    ) -> Self {
        Self {
            media,
            worker,
            session_store,
            preferences,
            blobs,
            events,
            inner: Arc::new(Mutex::new(EngineInner::default())),
            op_lock: Mutex::new(()),
            elapsed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get the current engine state
    pub async fn state(&self) -> EngineState {
        self.inner.lock().await.session.state()
    }

    /// Seconds recorded so far in this session
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    pub async fn is_muted(&self) -> bool {
        self.inner.lock().await.muted
    }

    /// Acquire media for a new session and hand it to the worker
    pub async fn capture(
        &self,
        id: CorrelationId,
        request: CaptureRequest,
        stream_id: Option<StreamId>,
    ) {
        let event = match self.try_capture(id, &request, stream_id).await {
            Ok(countdown) => {
                info!(correlation = %id, "Capture ready");
                EngineEvent::captured(id, countdown)
            }
            Err(e) => {
                warn!(correlation = %id, error = %e, "Capture failed");
                EngineEvent::failed(id, Operation::Capture, e)
            }
        };
        self.emit(event).await;
    }

    async fn try_capture(
        &self,
        id: CorrelationId,
        request: &CaptureRequest,
        stream_id: Option<StreamId>,
    ) -> Result<bool, EngineError> {
        {
            let mut inner = self.inner.lock().await;
            inner.session.transition(Transition::Acquire)?;
            inner.attempt = Some(id);
            inner.pending_mute = None;
        }

        let preferences = match self.preferences.load().await {
            Ok(preferences) => preferences,
            Err(e) => {
                warn!(error = %e, "Could not read preferences, using request and defaults");
                Preferences::empty()
            }
        };
        let config = CaptureConfig::resolve(request, stream_id, &preferences);
        debug!(
            correlation = %id,
            surface = %config.surface,
            microphone = %config.microphone,
            device_audio = config.capture_device_audio,
            "Acquiring media"
        );

        let graph = match self.acquire(&config).await {
            Ok(graph) => graph,
            Err(e) => {
                self.abandon(id).await;
                return Err(e);
            }
        };

        let tracks = {
            let mut inner = self.inner.lock().await;
            let mut graph = graph;

            if inner.attempt != Some(id) || inner.session.state() != EngineState::Acquiring {
                // Cancelled while acquiring: the late streams are never adopted
                graph.release();
                return Err(AcquisitionError::Cancelled.into());
            }

            let Some(tracks) = graph.worker_tracks() else {
                graph.release();
                self.teardown_locked(&mut inner);
                return Err(EngineError::NoVideoTrack);
            };

            let muted = inner.pending_mute.take().unwrap_or(config.muted);
            if muted {
                graph.set_microphone_enabled(false);
            }
            inner.muted = muted;
            inner.graph = Some(graph);
            tracks
        };

        if let Err(e) = self.worker.open(id, tracks).await {
            self.abandon(id).await;
            return Err(e.into());
        }

        {
            let mut inner = self.inner.lock().await;
            if inner.attempt != Some(id) {
                return Err(AcquisitionError::Cancelled.into());
            }
            inner.session.transition(Transition::Acquired)?;
        }
        self.persist(RecordingState::Inactive, 0).await;

        Ok(config.countdown)
    }

    /// Acquire display and microphone streams concurrently.
    /// A failure on either side stops whatever the other side acquired.
    async fn acquire(&self, config: &CaptureConfig) -> Result<MediaGraph, EngineError> {
        if config.surface.requires_stream_id() && config.stream_id.is_none() {
            return Err(AcquisitionError::MissingStreamId.into());
        }

        let with_audio = config.capture_device_audio;
        let display = async {
            match &config.stream_id {
                Some(stream_id) if config.surface.requires_stream_id() => {
                    self.media.tab_media(stream_id, with_audio).await
                }
                _ => self.media.display_media(config.surface, with_audio).await,
            }
        };
        let microphone = async {
            match config.microphone.device() {
                Some(device) => self.media.user_media(device).await.map(Some),
                None => Ok(None),
            }
        };

        match tokio::join!(display, microphone) {
            (Ok(video), Ok(audio)) => Ok(MediaGraph::assemble(
                video,
                audio,
                config.capture_device_audio,
            )),
            (Ok(video), Err(e)) => {
                video.stop_all();
                Err(e.into())
            }
            (Err(e), Ok(audio)) => {
                if let Some(audio) = audio {
                    audio.stop_all();
                }
                Err(e.into())
            }
            (Err(e), Err(_)) => Err(e.into()),
        }
    }

    /// Tear down the attempt `id` if it still owns the engine
    async fn abandon(&self, id: CorrelationId) {
        let mut inner = self.inner.lock().await;
        if inner.attempt == Some(id) {
            self.teardown_locked(&mut inner);
        }
    }

    /// Start recording. No-op while already recording.
    pub async fn start(&self, id: CorrelationId) {
        let _op = self.op_lock.lock().await;

        match self.state().await {
            EngineState::Recording => {
                debug!(correlation = %id, "Already recording");
                return;
            }
            EngineState::Capturing => {}
            current => {
                let e = InvalidStateTransition {
                    current_state: current,
                    action: "start recording".to_string(),
                };
                self.fail(id, Operation::Record, e).await;
                return;
            }
        }

        if let Err(e) = self.worker.record(id).await {
            self.fail(id, Operation::Record, e).await;
            return;
        }

        let committed = {
            let mut inner = self.inner.lock().await;
            inner.session.transition(Transition::Record).map(|_| {
                self.elapsed.store(0, Ordering::SeqCst);
                inner.ticker = Some(self.spawn_ticker());
            })
        };

        match committed {
            Ok(()) => {
                self.persist(RecordingState::Recording, 0).await;
                info!(correlation = %id, "Recording started");
                self.emit(EngineEvent::succeeded(id, Operation::Record)).await;
            }
            Err(e) => self.fail(id, Operation::Record, e).await,
        }
    }

    /// Pause recording. No-op unless recording.
    pub async fn pause(&self, id: CorrelationId) {
        let _op = self.op_lock.lock().await;

        if !self.inner.lock().await.session.can(Transition::Pause) {
            debug!(correlation = %id, "Pause ignored, not recording");
            return;
        }

        if let Err(e) = self.worker.pause(id).await {
            self.fail(id, Operation::Pause, e).await;
            return;
        }

        let committed = {
            let mut inner = self.inner.lock().await;
            inner.session.transition(Transition::Pause).map(|_| {
                if let Some(ticker) = inner.ticker.take() {
                    ticker.abort();
                }
            })
        };

        match committed {
            Ok(()) => {
                self.persist(RecordingState::Paused, self.elapsed_seconds()).await;
                info!(correlation = %id, elapsed = self.elapsed_seconds(), "Recording paused");
                self.emit(EngineEvent::succeeded(id, Operation::Pause)).await;
            }
            Err(e) => self.fail(id, Operation::Pause, e).await,
        }
    }

    /// Resume recording. No-op unless paused.
    pub async fn resume(&self, id: CorrelationId) {
        let _op = self.op_lock.lock().await;

        if !self.inner.lock().await.session.can(Transition::Resume) {
            debug!(correlation = %id, "Resume ignored, not paused");
            return;
        }

        if let Err(e) = self.worker.resume(id).await {
            self.fail(id, Operation::Resume, e).await;
            return;
        }

        let committed = {
            let mut inner = self.inner.lock().await;
            inner.session.transition(Transition::Resume).map(|_| {
                inner.ticker = Some(self.spawn_ticker());
            })
        };

        match committed {
            Ok(()) => {
                self.persist(RecordingState::Recording, self.elapsed_seconds()).await;
                info!(correlation = %id, "Recording resumed");
                self.emit(EngineEvent::succeeded(id, Operation::Resume)).await;
            }
            Err(e) => self.fail(id, Operation::Resume, e).await,
        }
    }

    /// Stop and save. Local resources are released before the worker is
    /// asked for its buffer.
    pub async fn stop(&self, id: CorrelationId) {
        if !self.teardown().await {
            self.fail(id, Operation::Save, EngineError::NotCapturing).await;
            return;
        }

        let saved = async {
            let bytes = self.worker.finish(id).await?;
            let blob = self.blobs.put(bytes).await?;
            Ok::<_, EngineError>(blob)
        };

        match saved.await {
            Ok(blob) => {
                info!(correlation = %id, blob = %blob, "Recording saved");
                self.emit(EngineEvent::saved(id, blob)).await;
            }
            Err(e) => self.fail(id, Operation::Save, e).await,
        }
    }

    /// Stop and drop everything. Success is reported only once the worker
    /// acknowledges the discard.
    pub async fn discard(&self, id: CorrelationId) {
        if !self.teardown().await {
            self.fail(id, Operation::Discard, EngineError::NotCapturing).await;
            return;
        }

        match self.worker.discard(id).await {
            Ok(()) => {
                info!(correlation = %id, "Recording discarded");
                self.emit(EngineEvent::succeeded(id, Operation::Discard)).await;
            }
            Err(e) => self.fail(id, Operation::Discard, e).await,
        }
    }

    /// Release local resources without contacting the worker
    pub async fn cancel(&self) {
        if self.teardown().await {
            info!("Capture cancelled");
        }
    }

    /// Enable or disable the microphone tracks
    pub async fn set_muted(&self, muted: bool) {
        let mut inner = self.inner.lock().await;
        inner.muted = muted;
        if inner.session.state() == EngineState::Acquiring {
            inner.pending_mute = Some(muted);
        }
        match &inner.graph {
            Some(graph) if graph.has_microphone() => {
                graph.set_microphone_enabled(!muted);
                debug!(muted, "Microphone gate changed");
            }
            _ => debug!(muted, "No microphone to gate"),
        }
    }

    /// Dispatch one command from the coordinator
    pub async fn dispatch(&self, command: EngineCommand) {
        let EngineCommand { id, kind } = command;
        match kind {
            EngineCommandKind::Capture { request, stream_id } => {
                self.capture(id, request, stream_id).await
            }
            EngineCommandKind::Record => self.start(id).await,
            EngineCommandKind::Pause => self.pause(id).await,
            EngineCommandKind::Resume => self.resume(id).await,
            EngineCommandKind::Stop => self.stop(id).await,
            EngineCommandKind::Discard => self.discard(id).await,
            EngineCommandKind::Cancel => self.cancel().await,
            EngineCommandKind::SetMuted(muted) => self.set_muted(muted).await,
        }
    }

    /// Tear down local state and persist `inactive`.
    /// Returns whether any media was held.
    async fn teardown(&self) -> bool {
        let held = {
            let mut inner = self.inner.lock().await;
            let held = inner.session.holds_media();
            if held {
                self.teardown_locked(&mut inner);
            }
            held
        };
        if held {
            self.persist(RecordingState::Inactive, 0).await;
        }
        held
    }

    fn teardown_locked(&self, inner: &mut EngineInner) {
        if let Some(mut graph) = inner.graph.take() {
            graph.release();
        }
        if let Some(ticker) = inner.ticker.take() {
            ticker.abort();
        }
        self.elapsed.store(0, Ordering::SeqCst);
        if let Err(e) = inner.session.transition(Transition::Teardown) {
            warn!(error = %e, "Teardown rejected");
        }
        inner.attempt = None;
        inner.muted = false;
        inner.pending_mute = None;
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let elapsed = Arc::clone(&self.elapsed);
        let store = Arc::clone(&self.session_store);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;

                // Holding the lock keeps a tick from landing after teardown
                let guard = inner.lock().await;
                if !guard.session.is_recording() {
                    break;
                }
                let seconds = elapsed.fetch_add(1, Ordering::SeqCst) + 1;
                let mut entries = Map::new();
                entries.insert(ELAPSED_SECONDS_KEY.to_string(), json!(seconds));
                if let Err(e) = store.set(entries).await {
                    warn!(error = %e, "Failed to persist elapsed time");
                }
                drop(guard);
            }
        })
    }

    async fn persist(&self, state: RecordingState, elapsed: u64) {
        let mut entries = Map::new();
        entries.insert(RECORDING_STATE_KEY.to_string(), json!(state.as_str()));
        entries.insert(ELAPSED_SECONDS_KEY.to_string(), json!(elapsed));
        if let Err(e) = self.session_store.set(entries).await {
            warn!(error = %e, state = %state, "Failed to persist session state");
        }
    }

    async fn fail(&self, id: CorrelationId, operation: Operation, error: impl Into<EngineError>) {
        let error = error.into();
        warn!(correlation = %id, operation = %operation, error = %error, "Operation failed");
        self.emit(EngineEvent::failed(id, operation, error)).await;
    }

    async fn emit(&self, event: EngineEvent) {
        debug!(event = %event.name(), correlation = %event.id(), "Emitting engine event");
        self.events.emit(event).await;
    }
}

#[async_trait::async_trait]
impl<M, W, S, P, B, E> CommandHandler for CaptureEngine<M, W, S, P, B, E>
where
    M: MediaDevices + 'static,
    W: EncodingWorker + 'static,
    S: SessionStore + 'static,
    P: PreferenceStore + 'static,
    B: BlobStore + 'static,
    E: EventSink + 'static,
{
    async fn handle(&self, command: EngineCommand) {
        self.dispatch(command).await
    }
}
