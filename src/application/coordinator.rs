//! Session coordinator use case
//!
//! Owns the tab registry, the capture host lifecycle and message routing
//! between tab UI contexts and the capture engine. Routing failures are
//! logged and absorbed; nothing here is fatal to the coordinator.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::capture::{CaptureRequest, Surface};
use crate::domain::config::Preferences;
use crate::domain::error::ConfigError;
use crate::domain::protocol::{
    EngineCommand, EngineCommandKind, EngineEvent, Message, MessageSender, Operation, Reply,
    TabMessage,
};
use crate::domain::tabs::{Tab, TabChange, TabId, TabRole};

use super::ports::{BrowserPlatform, PlatformError, PreferenceStore, SessionStore, StorageError};
use super::ready_gate::{GateError, ReadyGates};
use super::single_flight::{FlightAbandoned, SingleFlight};

/// Default URL of the post-capture editor
pub const DEFAULT_EDITOR_URL: &str = "https://app.screen-session.dev/editor";

/// Default URL of the sign-in page
pub const DEFAULT_AUTHENTICATION_URL: &str = "https://app.screen-session.dev/login";

/// Capture host creation errors, shared by every caller of one creation
#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Capture host creation was abandoned")]
    Abandoned,
}

impl From<FlightAbandoned> for HostError {
    fn from(_: FlightAbandoned) -> Self {
        Self::Abandoned
    }
}

/// Errors from coordinator operations
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("Platform call failed: {0}")]
    Platform(#[from] PlatformError),

    #[error("Capture host unavailable: {0}")]
    Host(#[from] HostError),

    #[error("Preferences error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Pages the coordinator opens on its own
#[derive(Debug, Clone)]
pub struct CoordinatorUrls {
    pub editor: String,
    pub authentication: String,
}

impl Default for CoordinatorUrls {
    fn default() -> Self {
        Self {
            editor: DEFAULT_EDITOR_URL.to_string(),
            authentication: DEFAULT_AUTHENTICATION_URL.to_string(),
        }
    }
}

/// Tabs the coordinator is tracking. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRegistry {
    /// Whether the session UI is visible
    pub active: bool,
    pub current_tab: Option<TabId>,
    pub original_tab: Option<TabId>,
    /// Tabs that received the UI, for the close broadcast
    pub injected_tabs: BTreeSet<TabId>,
    pub editor_tab: Option<TabId>,
    pub authentication_tab: Option<TabId>,
}

/// Result of a user gesture on a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GestureOutcome {
    /// No credentials stored; the sign-in tab was opened
    AuthenticationRequired,
    SessionClosed,
    /// Internal page; nothing happened
    Ignored,
    SessionStarted,
    InjectionFailed,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    registry: TabRegistry,
    gates: ReadyGates,
}

/// Session coordinator use case
pub struct SessionCoordinator<P, S, K>
where
    P: BrowserPlatform,
    S: SessionStore,
    K: PreferenceStore,
{
    platform: Arc<P>,
    session_store: Arc<S>,
    preferences: Arc<K>,
    urls: CoordinatorUrls,
    state: Mutex<CoordinatorState>,
    host: SingleFlight<HostError>,
}

impl<P, S, K> SessionCoordinator<P, S, K>
where
    P: BrowserPlatform,
    S: SessionStore,
    K: PreferenceStore,
{
    pub fn new(
        platform: Arc<P>,
        session_store: Arc<S>,
        preferences: Arc<K>,
        urls: CoordinatorUrls,
    ) -> Self {
        Self {
            platform,
            session_store,
            preferences,
            urls,
            state: Mutex::new(CoordinatorState::default()),
            host: SingleFlight::new(),
        }
    }

    /// Snapshot of the tab registry
    pub async fn registry(&self) -> TabRegistry {
        self.state.lock().await.registry.clone()
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.registry.active
    }

    /// Create the capture host unless it exists. Concurrent callers share
    /// one creation.
    pub async fn ensure_capture_host(&self) -> Result<(), HostError> {
        let platform = &self.platform;
        self.host
            .run(move || async move {
                if platform.has_capture_host().await {
                    return Ok(());
                }
                info!("Creating capture host");
                match platform.create_capture_host().await {
                    Ok(()) => Ok(()),
                    Err(PlatformError::HostAlreadyExists) => {
                        debug!("Capture host appeared concurrently");
                        Ok(())
                    }
                    Err(e) => {
                        error!(error = %e, "Capture host creation failed");
                        Err(e.into())
                    }
                }
            })
            .await
    }

    /// Dispatch one message. Only storage requests produce a reply.
    pub async fn route_message(&self, message: Message, sender: MessageSender) -> Option<Reply> {
        debug!(message = message.name(), sender = ?sender, "Routing message");

        match message {
            Message::CloseSession => {
                self.teardown_session().await;
                None
            }
            Message::StartTabCapture(request) => {
                self.start_tab_capture(request, sender).await;
                None
            }
            Message::StartDisplayCapture(request) => {
                self.start_display_capture(request, sender).await;
                None
            }
            Message::StartRecording => self.forward(EngineCommandKind::Record).await,
            Message::PauseRecording => self.forward(EngineCommandKind::Pause).await,
            Message::ResumeRecording => self.forward(EngineCommandKind::Resume).await,
            Message::SaveRecording => self.forward(EngineCommandKind::Stop).await,
            Message::DiscardRecording => self.forward(EngineCommandKind::Discard).await,
            Message::CancelCapture => self.forward(EngineCommandKind::Cancel).await,
            Message::SetMuted { muted } => self.forward(EngineCommandKind::SetMuted(muted)).await,
            Message::EngineEvent { event } => {
                self.on_engine_event(event).await;
                None
            }
            Message::GetSessionStorage { keys } => {
                Some(match self.session_store.get(&keys).await {
                    Ok(values) => Reply::Storage { values },
                    Err(e) => {
                        warn!(error = %e, "Session storage read failed");
                        Reply::Error {
                            message: e.to_string(),
                        }
                    }
                })
            }
            Message::SetSessionStorage { entries } => {
                Some(match self.session_store.set(entries).await {
                    Ok(()) => Reply::Ok,
                    Err(e) => {
                        warn!(error = %e, "Session storage write failed");
                        Reply::Error {
                            message: e.to_string(),
                        }
                    }
                })
            }
            Message::AuthenticationSucceeded { credentials } => {
                if let Err(e) = self.on_authenticated(credentials).await {
                    warn!(error = %e, "Authentication hand-off failed");
                }
                None
            }
        }
    }

    async fn start_tab_capture(&self, request: CaptureRequest, sender: MessageSender) {
        let target = match sender.tab() {
            Some(tab) => Some(tab),
            None => self.state.lock().await.registry.current_tab,
        };
        let target = match target {
            Some(tab) => Some(tab),
            None => self.platform.active_tab().await.map(|tab| tab.id),
        };

        // Without a stream id the engine fails the attempt before acquiring
        let stream_id = match target {
            Some(tab) => match self.platform.tab_capture_stream_id(tab).await {
                Ok(stream_id) => Some(stream_id),
                Err(e) => {
                    warn!(tab = %tab, error = %e, "No stream id for tab capture");
                    None
                }
            },
            None => None,
        };

        let request = CaptureRequest {
            surface: Some(Surface::Tab),
            ..request
        };
        self.start_capture(EngineCommandKind::Capture { request, stream_id }, sender)
            .await;
    }

    async fn start_display_capture(&self, request: CaptureRequest, sender: MessageSender) {
        let surface = match request.surface {
            Some(surface) if !surface.requires_stream_id() => surface,
            _ => Surface::Screen,
        };
        let request = CaptureRequest {
            surface: Some(surface),
            ..request
        };
        self.start_capture(
            EngineCommandKind::Capture {
                request,
                stream_id: None,
            },
            sender,
        )
        .await;
    }

    async fn start_capture(&self, kind: EngineCommandKind, sender: MessageSender) {
        let command = EngineCommand::new(kind);

        if let Err(e) = self.ensure_capture_host().await {
            let event = EngineEvent::failed(command.id, Operation::Capture, &e);
            self.reply_to(sender, TabMessage::EngineEvent { event }).await;
            return;
        }

        self.deliver(command).await;
    }

    /// Forward a command to an existing capture host
    async fn forward(&self, kind: EngineCommandKind) -> Option<Reply> {
        let command = EngineCommand::new(kind);

        if !self.platform.has_capture_host().await {
            warn!(correlation = %command.id, command = ?command.kind, "No capture host to forward to");
            if let Some(operation) = command.kind.operation() {
                let event = EngineEvent::failed(
                    command.id,
                    operation,
                    HostError::Platform(PlatformError::HostUnavailable),
                );
                self.relay(TabMessage::EngineEvent { event }).await;
            }
            return None;
        }

        self.deliver(command).await;
        None
    }

    async fn deliver(&self, command: EngineCommand) {
        let id = command.id;
        let operation = command.kind.operation();

        if let Err(e) = self.platform.send_to_capture_host(command).await {
            warn!(correlation = %id, error = %e, "Capture host did not accept command");
            if let Some(operation) = operation {
                let event = EngineEvent::failed(id, operation, e);
                self.relay(TabMessage::EngineEvent { event }).await;
            }
        }
    }

    /// Send to the tab that asked, else relay as usual
    async fn reply_to(&self, sender: MessageSender, message: TabMessage) {
        if let Some(tab) = sender.tab() {
            match self.platform.send_to_tab(tab, message.clone()).await {
                Ok(()) => return,
                Err(e) => debug!(tab = %tab, error = %e, "Sender tab unreachable, relaying"),
            }
        }
        self.relay(message).await;
    }

    /// Send to the session tab, falling back to the foreground tab when the
    /// remembered one is gone
    async fn relay(&self, message: TabMessage) {
        let current = self.state.lock().await.registry.current_tab;

        if let Some(tab) = current {
            match self.platform.send_to_tab(tab, message.clone()).await {
                Ok(()) => return,
                Err(e) => debug!(tab = %tab, error = %e, "Session tab unreachable, using foreground tab"),
            }
        }

        match self.platform.active_tab().await {
            Some(tab) => {
                if let Err(e) = self.platform.send_to_tab(tab.id, message).await {
                    warn!(tab = %tab.id, error = %e, "Relay dropped");
                }
            }
            None => warn!("No tab to relay to"),
        }
    }

    async fn on_engine_event(&self, event: EngineEvent) {
        info!(event = %event.name(), correlation = %event.id(), "Engine event");

        let saved = event.saved_blob().cloned();
        let discarded = event.is_success() && event.operation() == Operation::Discard;

        self.relay(TabMessage::EngineEvent { event }).await;

        if let Some(blob) = saved {
            self.teardown_session().await;
            match self
                .open_role_tab(TabRole::Editor, Some(TabMessage::LoadRecording { blob }))
                .await
            {
                Ok(tab) => info!(tab = %tab, "Editor opened"),
                Err(e) => warn!(error = %e, "Could not open editor"),
            }
        } else if discarded {
            self.teardown_session().await;
        }
    }

    /// Open the singleton tab for `role` and gate `payload` on its load
    pub async fn open_role_tab(
        &self,
        role: TabRole,
        payload: Option<TabMessage>,
    ) -> Result<TabId, CoordinatorError> {
        let url = match role {
            TabRole::Editor => &self.urls.editor,
            TabRole::Authentication => &self.urls.authentication,
        };

        // Held across open_tab so a load event cannot beat the gate
        let mut state = self.state.lock().await;
        if let Some(tab) = state.gates.pending_tab(role) {
            return Err(GateError::AlreadyPending { role, tab }.into());
        }

        let tab = self.platform.open_tab(url).await?;
        state.gates.register(role, tab.id, payload)?;
        match role {
            TabRole::Editor => state.registry.editor_tab = Some(tab.id),
            TabRole::Authentication => state.registry.authentication_tab = Some(tab.id),
        }
        Ok(tab.id)
    }

    /// React to a tab navigation event
    pub async fn on_tab_updated(&self, tab_id: TabId, change: TabChange, tab: Tab) {
        if !change.is_complete() {
            return;
        }

        let (gate, reinject) = {
            let mut state = self.state.lock().await;
            match state.gates.resolve(tab_id) {
                Some(gate) => (Some(gate), false),
                None => {
                    let reinject = state.registry.active && tab.active && !tab.is_privileged();
                    if reinject {
                        state.registry.current_tab = Some(tab_id);
                    }
                    (None, reinject)
                }
            }
        };

        if let Some(gate) = gate {
            info!(tab = %tab_id, role = %gate.role, "Tab ready");
            if let Some(payload) = gate.payload {
                if let Err(e) = self.platform.send_to_tab(tab_id, payload).await {
                    warn!(tab = %tab_id, error = %e, "Ready payload dropped");
                }
            }
            return;
        }

        if reinject {
            debug!(tab = %tab_id, "Re-injecting after navigation");
            self.inject(tab_id).await;
        }
    }

    /// Entry point for the user's toggle gesture
    pub async fn toggle_from_user_gesture(&self, tab: Tab) -> GestureOutcome {
        let preferences = match self.preferences.load().await {
            Ok(preferences) => preferences,
            Err(e) => {
                warn!(error = %e, "Could not read preferences");
                Preferences::empty()
            }
        };

        if !preferences.is_authenticated() {
            self.state.lock().await.registry.original_tab = Some(tab.id);
            match self.open_role_tab(TabRole::Authentication, None).await {
                Ok(auth) => info!(tab = %auth, "Sign-in required"),
                Err(e) => warn!(error = %e, "Could not open sign-in tab"),
            }
            return GestureOutcome::AuthenticationRequired;
        }

        if self.is_active().await {
            self.teardown_session().await;
            return GestureOutcome::SessionClosed;
        }

        if tab.is_privileged() {
            debug!(tab = %tab.id, url = %tab.url, "Ignoring gesture on internal page");
            return GestureOutcome::Ignored;
        }

        self.activate(tab.id).await
    }

    async fn activate(&self, tab: TabId) -> GestureOutcome {
        {
            let mut state = self.state.lock().await;
            state.registry.active = true;
            state.registry.current_tab = Some(tab);
            state.registry.original_tab = Some(tab);
        }

        if self.inject(tab).await {
            info!(tab = %tab, "Session started");
            GestureOutcome::SessionStarted
        } else {
            let mut state = self.state.lock().await;
            state.registry.active = false;
            state.registry.current_tab = None;
            GestureOutcome::InjectionFailed
        }
    }

    async fn inject(&self, tab: TabId) -> bool {
        match self.platform.inject_ui(tab).await {
            Ok(()) => {
                self.state.lock().await.registry.injected_tabs.insert(tab);
                true
            }
            Err(e) => {
                warn!(tab = %tab, error = %e, "UI injection failed");
                false
            }
        }
    }

    async fn on_authenticated(&self, credentials: String) -> Result<(), CoordinatorError> {
        let mut preferences = self.preferences.load().await?;
        preferences.credentials = Some(credentials);
        self.preferences.save(&preferences).await?;
        info!("Credentials stored");

        let (auth_tab, original, active) = {
            let mut state = self.state.lock().await;
            state.gates.cancel(TabRole::Authentication);
            (
                state.registry.authentication_tab.take(),
                state.registry.original_tab,
                state.registry.active,
            )
        };

        if let Some(tab) = auth_tab {
            if let Err(e) = self.platform.close_tab(tab).await {
                debug!(tab = %tab, error = %e, "Sign-in tab already gone");
            }
        }

        if let (Some(original), false) = (original, active) {
            let outcome = self.activate(original).await;
            debug!(tab = %original, outcome = ?outcome, "Resumed after sign-in");
        }
        Ok(())
    }

    /// Close the capture host, forget every tab and tell injected tabs the
    /// session ended. Safe to call with no session.
    pub async fn teardown_session(&self) {
        if self.platform.has_capture_host().await {
            if let Err(e) = self.platform.close_capture_host().await {
                warn!(error = %e, "Failed to close capture host");
            }
        }

        let injected = {
            let mut state = self.state.lock().await;
            let injected = std::mem::take(&mut state.registry.injected_tabs);
            let registry = &mut state.registry;
            registry.active = false;
            registry.current_tab = None;
            registry.original_tab = None;
            registry.editor_tab = None;
            registry.authentication_tab = None;
            injected
        };

        for tab in &injected {
            if let Err(e) = self.platform.send_to_tab(*tab, TabMessage::SessionClosed).await {
                debug!(tab = %tab, error = %e, "Close notice dropped");
            }
        }

        if let Err(e) = self.session_store.clear().await {
            warn!(error = %e, "Failed to clear session storage");
        }

        if !injected.is_empty() {
            info!(tabs = injected.len(), "Session torn down");
        }
    }
}
