//! Headless browser platform
//!
//! Keeps an in-memory tab table fed by the control socket, records what is
//! injected into and sent to each tab, and runs the capture host as a task
//! in the same process.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::application::ports::{BrowserPlatform, PlatformError};
use crate::domain::capture::StreamId;
use crate::domain::protocol::{EngineCommand, TabMessage};
use crate::domain::tabs::{Tab, TabId};
use crate::infrastructure::media::StreamGrants;

/// Messages kept for `outbox` queries before the oldest are dropped
const OUTBOX_CAPACITY: usize = 256;

/// First id handed to tabs the daemon opens itself
const FIRST_OPENED_TAB: u32 = 10_000;

/// Starts the capture host task on the given command channel
pub type HostLauncher =
    Box<dyn Fn(mpsc::UnboundedReceiver<EngineCommand>) -> JoinHandle<()> + Send + Sync>;

#[derive(Default)]
enum HostSlot {
    #[default]
    Empty,
    Starting,
    Running {
        commands: mpsc::UnboundedSender<EngineCommand>,
        task: JoinHandle<()>,
    },
}

#[derive(Default)]
struct BrowserState {
    tabs: BTreeMap<TabId, Tab>,
    active: Option<TabId>,
    next_id: u32,
    injected: BTreeSet<TabId>,
    outbox: VecDeque<(TabId, TabMessage)>,
    host: HostSlot,
}

/// In-process stand-in for the browser's privileged APIs
pub struct HeadlessBrowser {
    state: Mutex<BrowserState>,
    grants: Arc<StreamGrants>,
    launcher: HostLauncher,
}

impl HeadlessBrowser {
    pub fn new(grants: Arc<StreamGrants>, launcher: HostLauncher) -> Self {
        Self {
            state: Mutex::new(BrowserState {
                next_id: FIRST_OPENED_TAB,
                ..Default::default()
            }),
            grants,
            launcher,
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, BrowserState>, PlatformError> {
        self.state
            .lock()
            .map_err(|_| PlatformError::HostCreationFailed("browser state poisoned".to_string()))
    }

    /// Record a tab reported by the control socket
    pub fn upsert_tab(&self, tab: Tab) {
        if let Ok(mut state) = self.state() {
            if tab.active {
                state.active = Some(tab.id);
            }
            state.tabs.insert(tab.id, tab);
        }
    }

    /// Forget a tab closed by the user
    pub fn remove_tab(&self, tab: TabId) {
        if let Ok(mut state) = self.state() {
            state.tabs.remove(&tab);
            state.injected.remove(&tab);
            if state.active == Some(tab) {
                state.active = None;
            }
        }
    }

    /// Tabs currently showing the recording UI
    pub fn injected_tabs(&self) -> Vec<TabId> {
        self.state()
            .map(|state| state.injected.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drain messages delivered to tabs, optionally for one tab only
    pub fn take_outbox(&self, tab: Option<TabId>) -> Vec<(TabId, TabMessage)> {
        let Ok(mut state) = self.state() else {
            return Vec::new();
        };
        let (taken, kept): (Vec<_>, Vec<_>) = state
            .outbox
            .drain(..)
            .partition(|(id, _)| tab.map_or(true, |wanted| *id == wanted));
        state.outbox = kept.into();
        taken
    }
}

#[async_trait]
impl BrowserPlatform for HeadlessBrowser {
    async fn active_tab(&self) -> Option<Tab> {
        let state = self.state().ok()?;
        state.active.and_then(|id| state.tabs.get(&id).cloned())
    }

    async fn open_tab(&self, url: &str) -> Result<Tab, PlatformError> {
        let mut state = self.state()?;
        state.next_id += 1;
        let tab = Tab {
            id: TabId(state.next_id),
            url: url.to_string(),
            active: true,
        };
        state.active = Some(tab.id);
        state.tabs.insert(tab.id, tab.clone());
        info!(tab = %tab.id, url, "Opened tab");
        Ok(tab)
    }

    async fn close_tab(&self, tab: TabId) -> Result<(), PlatformError> {
        let mut state = self.state()?;
        state
            .tabs
            .remove(&tab)
            .ok_or(PlatformError::TabNotFound(tab))?;
        state.injected.remove(&tab);
        if state.active == Some(tab) {
            state.active = None;
        }
        info!(tab = %tab, "Closed tab");
        Ok(())
    }

    async fn inject_ui(&self, tab: TabId) -> Result<(), PlatformError> {
        let mut state = self.state()?;
        let target = state.tabs.get(&tab).ok_or(PlatformError::TabNotFound(tab))?;
        if target.is_privileged() {
            return Err(PlatformError::InjectionFailed {
                tab,
                message: format!("cannot script {}", target.url),
            });
        }
        state.injected.insert(tab);
        info!(tab = %tab, "Injected recording UI");
        Ok(())
    }

    async fn send_to_tab(&self, tab: TabId, message: TabMessage) -> Result<(), PlatformError> {
        let mut state = self.state()?;
        if !state.tabs.contains_key(&tab) {
            return Err(PlatformError::TabNotFound(tab));
        }
        debug!(tab = %tab, message = ?message, "Delivered tab message");
        if state.outbox.len() == OUTBOX_CAPACITY {
            state.outbox.pop_front();
        }
        state.outbox.push_back((tab, message));
        Ok(())
    }

    async fn has_capture_host(&self) -> bool {
        self.state()
            .is_ok_and(|state| matches!(state.host, HostSlot::Running { .. }))
    }

    async fn create_capture_host(&self) -> Result<(), PlatformError> {
        {
            let mut state = self.state()?;
            if !matches!(state.host, HostSlot::Empty) {
                return Err(PlatformError::HostAlreadyExists);
            }
            state.host = HostSlot::Starting;
        }

        // Document creation completes asynchronously
        tokio::task::yield_now().await;

        let (tx, rx) = mpsc::unbounded_channel();
        let task = (self.launcher)(rx);
        self.state()?.host = HostSlot::Running { commands: tx, task };
        info!("Capture host created");
        Ok(())
    }

    async fn close_capture_host(&self) -> Result<(), PlatformError> {
        let previous = std::mem::take(&mut self.state()?.host);
        let HostSlot::Running { commands, task } = previous else {
            return Ok(());
        };

        // Dropping the sender ends the host loop; its engine teardown must
        // finish before a new host can be created
        drop(commands);
        task.await
            .map_err(|e| PlatformError::HostShutdownFailed(e.to_string()))?;
        info!("Capture host closed");
        Ok(())
    }

    async fn send_to_capture_host(&self, command: EngineCommand) -> Result<(), PlatformError> {
        let state = self.state()?;
        match &state.host {
            HostSlot::Running { commands, .. } => commands
                .send(command)
                .map_err(|_| PlatformError::HostUnavailable),
            _ => Err(PlatformError::HostUnavailable),
        }
    }

    async fn tab_capture_stream_id(&self, tab: TabId) -> Result<StreamId, PlatformError> {
        if !self.state()?.tabs.contains_key(&tab) {
            return Err(PlatformError::StreamIdUnavailable(format!(
                "tab {} does not exist",
                tab
            )));
        }
        Ok(self.grants.issue(tab))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::protocol::EngineCommandKind;

    fn browser() -> (HeadlessBrowser, Arc<Mutex<Vec<EngineCommand>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let launcher: HostLauncher = Box::new(move |mut rx| {
            let sink = Arc::clone(&sink);
            tokio::spawn(async move {
                while let Some(command) = rx.recv().await {
                    sink.lock().unwrap().push(command);
                }
            })
        });
        (
            HeadlessBrowser::new(Arc::new(StreamGrants::new()), launcher),
            received,
        )
    }

    #[tokio::test]
    async fn second_concurrent_creation_is_rejected() {
        let (browser, _) = browser();

        let (a, b) = tokio::join!(browser.create_capture_host(), browser.create_capture_host());

        assert!(a.is_ok());
        assert!(matches!(b, Err(PlatformError::HostAlreadyExists)));
        assert!(browser.has_capture_host().await);
    }

    #[tokio::test]
    async fn commands_reach_the_host_until_closed() {
        let (browser, received) = browser();
        browser.create_capture_host().await.unwrap();

        browser
            .send_to_capture_host(EngineCommand::new(EngineCommandKind::Record))
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert_eq!(received.lock().unwrap().len(), 1);

        browser.close_capture_host().await.unwrap();
        let result = browser
            .send_to_capture_host(EngineCommand::new(EngineCommandKind::Pause))
            .await;
        assert!(matches!(result, Err(PlatformError::HostUnavailable)));
    }

    #[tokio::test]
    async fn close_waits_for_the_host_to_finish() {
        let finished = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&finished);
        let launcher: HostLauncher = Box::new(move |mut rx| {
            let flag = Arc::clone(&flag);
            tokio::spawn(async move {
                while rx.recv().await.is_some() {}
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                *flag.lock().unwrap() = true;
            })
        });
        let browser = HeadlessBrowser::new(Arc::new(StreamGrants::new()), launcher);
        browser.create_capture_host().await.unwrap();

        browser.close_capture_host().await.unwrap();

        assert!(*finished.lock().unwrap());
        assert!(!browser.has_capture_host().await);
        browser.create_capture_host().await.unwrap();
    }

    #[tokio::test]
    async fn privileged_tabs_refuse_injection() {
        let (browser, _) = browser();
        browser.upsert_tab(Tab::new(TabId(1), "chrome://extensions"));

        let result = browser.inject_ui(TabId(1)).await;
        assert!(matches!(result, Err(PlatformError::InjectionFailed { .. })));
        assert!(browser.injected_tabs().is_empty());
    }

    #[tokio::test]
    async fn outbox_filters_by_tab() {
        let (browser, _) = browser();
        browser.upsert_tab(Tab::new(TabId(1), "https://a.example"));
        browser.upsert_tab(Tab::new(TabId(2), "https://b.example"));
        browser.send_to_tab(TabId(1), TabMessage::SessionClosed).await.unwrap();
        browser.send_to_tab(TabId(2), TabMessage::SessionClosed).await.unwrap();

        assert_eq!(browser.take_outbox(Some(TabId(2))).len(), 1);
        assert_eq!(browser.take_outbox(None), vec![(TabId(1), TabMessage::SessionClosed)]);
    }

    #[tokio::test]
    async fn opened_tab_becomes_active() {
        let (browser, _) = browser();
        let tab = browser.open_tab("https://editor.example").await.unwrap();
        assert_eq!(browser.active_tab().await.map(|t| t.id), Some(tab.id));
    }
}
