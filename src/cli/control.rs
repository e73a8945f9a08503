//! Control envelopes and the in-process session runtime they drive

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::application::{
    serve_capture_host, CaptureEngine, CoordinatorUrls, SessionCoordinator,
};
use crate::domain::protocol::{EngineEvent, Message, MessageSender, TabMessage};
use crate::domain::tabs::{Tab, TabChange, TabId};
use crate::infrastructure::{
    BufferingWorker, ChannelEventSink, FsBlobStore, HeadlessBrowser, HeadlessMediaDevices,
    HostLauncher, MemorySessionStore, StreamGrants, XdgPreferenceStore,
};

/// One line on the control socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Envelope {
    /// A message sent by a tab, or by nobody in particular
    Route {
        #[serde(default, rename = "fromTab")]
        from_tab: Option<TabId>,
        message: Message,
    },
    /// The user clicked the toolbar action on `tab`
    Gesture { tab: Tab },
    TabUpdated {
        tab: Tab,
        #[serde(default)]
        change: TabChange,
    },
    TabRemoved { tab: TabId },
    /// Drain messages delivered to tabs
    Outbox {
        #[serde(default)]
        tab: Option<TabId>,
    },
    Status,
}

/// Anything that answers control envelopes
#[async_trait]
pub trait ControlHandler: Send + Sync + 'static {
    async fn handle(&self, envelope: Envelope) -> Value;
}

pub type Engine = CaptureEngine<
    HeadlessMediaDevices,
    BufferingWorker,
    MemorySessionStore,
    XdgPreferenceStore,
    FsBlobStore,
    ChannelEventSink,
>;

pub type Coordinator = SessionCoordinator<HeadlessBrowser, MemorySessionStore, XdgPreferenceStore>;

/// Coordinator, capture host and adapters wired together in one process
pub struct SessionRuntime {
    coordinator: Arc<Coordinator>,
    browser: Arc<HeadlessBrowser>,
    engine: Arc<Engine>,
}

impl SessionRuntime {
    /// Wire the runtime and start the task relaying engine events to the
    /// coordinator. Must be called inside a tokio runtime.
    pub fn start(preferences: XdgPreferenceStore, blobs: FsBlobStore, urls: CoordinatorUrls) -> Self {
        let session_store = Arc::new(MemorySessionStore::new());
        let preferences = Arc::new(preferences);
        let grants = Arc::new(StreamGrants::new());
        let (events, inbox) = ChannelEventSink::new();

        let engine = Arc::new(CaptureEngine::new(
            Arc::new(HeadlessMediaDevices::new(Arc::clone(&grants))),
            Arc::new(BufferingWorker::spawn()),
            Arc::clone(&session_store),
            Arc::clone(&preferences),
            Arc::new(blobs),
            Arc::new(events),
        ));

        let host_engine = Arc::clone(&engine);
        let launcher: HostLauncher =
            Box::new(move |rx| tokio::spawn(serve_capture_host(Arc::clone(&host_engine), rx)));
        let browser = Arc::new(HeadlessBrowser::new(grants, launcher));

        let coordinator = Arc::new(SessionCoordinator::new(
            Arc::clone(&browser),
            session_store,
            preferences,
            urls,
        ));

        tokio::spawn(relay_engine_events(Arc::clone(&coordinator), inbox));

        Self {
            coordinator,
            browser,
            engine,
        }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Tear the session down, e.g. before the process exits
    pub async fn shutdown(&self) {
        self.coordinator.teardown_session().await;
    }

    async fn status(&self) -> Value {
        json!({
            "status": "ok",
            "registry": self.coordinator.registry().await,
            "engine": self.engine.state().await.to_string(),
            "elapsedSeconds": self.engine.elapsed_seconds(),
            "muted": self.engine.is_muted().await,
        })
    }
}

async fn relay_engine_events(
    coordinator: Arc<Coordinator>,
    mut inbox: mpsc::UnboundedReceiver<EngineEvent>,
) {
    while let Some(event) = inbox.recv().await {
        coordinator
            .route_message(Message::EngineEvent { event }, MessageSender::CaptureHost)
            .await;
    }
    debug!("Engine event relay stopped");
}

fn ok() -> Value {
    json!({ "status": "ok" })
}

fn outbox_entry((tab, message): (TabId, TabMessage)) -> Value {
    json!({ "tab": tab, "message": message })
}

#[async_trait]
impl ControlHandler for SessionRuntime {
    async fn handle(&self, envelope: Envelope) -> Value {
        match envelope {
            Envelope::Route { from_tab, message } => {
                let sender = from_tab.map_or(MessageSender::External, MessageSender::Tab);
                match self.coordinator.route_message(message, sender).await {
                    Some(reply) => serde_json::to_value(reply).unwrap_or_else(|e| {
                        json!({ "status": "error", "message": e.to_string() })
                    }),
                    None => ok(),
                }
            }
            Envelope::Gesture { tab } => {
                self.browser.upsert_tab(tab.clone());
                let outcome = self.coordinator.toggle_from_user_gesture(tab).await;
                info!(outcome = ?outcome, "Gesture handled");
                json!({ "status": "ok", "outcome": outcome })
            }
            Envelope::TabUpdated { tab, change } => {
                self.browser.upsert_tab(tab.clone());
                self.coordinator.on_tab_updated(tab.id, change, tab).await;
                ok()
            }
            Envelope::TabRemoved { tab } => {
                self.browser.remove_tab(tab);
                ok()
            }
            Envelope::Outbox { tab } => {
                let messages: Vec<Value> = self
                    .browser
                    .take_outbox(tab)
                    .into_iter()
                    .map(outbox_entry)
                    .collect();
                json!({ "status": "ok", "messages": messages })
            }
            Envelope::Status => self.status().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_envelope_parses() {
        let envelope: Envelope = serde_json::from_value(json!({
            "kind": "route",
            "fromTab": 3,
            "message": { "type": "pause-recording" }
        }))
        .unwrap();
        assert_eq!(
            envelope,
            Envelope::Route {
                from_tab: Some(TabId(3)),
                message: Message::PauseRecording
            }
        );
    }

    #[test]
    fn tab_updated_defaults_change() {
        let envelope: Envelope = serde_json::from_value(json!({
            "kind": "tab-updated",
            "tab": { "id": 4, "url": "https://example.com" }
        }))
        .unwrap();
        match envelope {
            Envelope::TabUpdated { tab, change } => {
                assert_eq!(tab.id, TabId(4));
                assert!(!change.is_complete());
            }
            other => panic!("unexpected envelope: {:?}", other),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result = serde_json::from_value::<Envelope>(json!({ "kind": "reboot" }));
        assert!(result.is_err());
    }

    #[test]
    fn outbox_entry_shape() {
        let value = outbox_entry((TabId(2), TabMessage::SessionClosed));
        assert_eq!(value["tab"], 2);
        assert_eq!(value["message"]["type"], "session-closed");
    }
}
