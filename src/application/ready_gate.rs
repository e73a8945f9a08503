//! Wait-for-ready gates for tabs the coordinator opens itself
//!
//! A gate remembers which tab was opened for a role and what to send it once
//! the tab finishes loading. Each gate resolves at most once.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::protocol::TabMessage;
use crate::domain::tabs::{TabId, TabRole};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("A {role} tab ({tab}) is already waiting to load")]
    AlreadyPending { role: TabRole, tab: TabId },
}

/// A tab opened for a role that has not finished loading yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGate {
    pub role: TabRole,
    pub tab: TabId,
    /// Delivered to the tab on load completion
    pub payload: Option<TabMessage>,
}

/// One pending gate per role
#[derive(Debug, Default)]
pub struct ReadyGates {
    pending: HashMap<TabRole, PendingGate>,
}

impl ReadyGates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gate for `role`. A second gate for the same role is
    /// rejected while the first is still waiting.
    pub fn register(
        &mut self,
        role: TabRole,
        tab: TabId,
        payload: Option<TabMessage>,
    ) -> Result<(), GateError> {
        if let Some(existing) = self.pending.get(&role) {
            return Err(GateError::AlreadyPending {
                role,
                tab: existing.tab,
            });
        }
        self.pending.insert(role, PendingGate { role, tab, payload });
        Ok(())
    }

    pub fn pending_tab(&self, role: TabRole) -> Option<TabId> {
        self.pending.get(&role).map(|gate| gate.tab)
    }

    pub fn is_pending(&self, role: TabRole) -> bool {
        self.pending.contains_key(&role)
    }

    /// Resolve the gate waiting on `tab`, removing it.
    /// Later calls for the same tab return `None`.
    pub fn resolve(&mut self, tab: TabId) -> Option<PendingGate> {
        let role = self
            .pending
            .values()
            .find(|gate| gate.tab == tab)
            .map(|gate| gate.role)?;
        self.pending.remove(&role)
    }

    /// Drop the gate for `role` without resolving it
    pub fn cancel(&mut self, role: TabRole) -> Option<PendingGate> {
        self.pending.remove(&role)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::protocol::BlobId;

    fn load(blob: &str) -> Option<TabMessage> {
        Some(TabMessage::LoadRecording {
            blob: BlobId::new(blob),
        })
    }

    #[test]
    fn resolves_exactly_once() {
        let mut gates = ReadyGates::new();
        gates.register(TabRole::Editor, TabId(7), load("a")).unwrap();

        let gate = gates.resolve(TabId(7)).unwrap();
        assert_eq!(gate.role, TabRole::Editor);
        assert_eq!(gate.payload, load("a"));

        assert!(gates.resolve(TabId(7)).is_none());
        assert!(!gates.is_pending(TabRole::Editor));
    }

    #[test]
    fn unrelated_tab_does_not_resolve() {
        let mut gates = ReadyGates::new();
        gates.register(TabRole::Editor, TabId(7), None).unwrap();
        assert!(gates.resolve(TabId(8)).is_none());
        assert_eq!(gates.pending_tab(TabRole::Editor), Some(TabId(7)));
    }

    #[test]
    fn duplicate_role_is_rejected() {
        let mut gates = ReadyGates::new();
        gates.register(TabRole::Editor, TabId(1), load("a")).unwrap();

        let err = gates.register(TabRole::Editor, TabId(2), load("b")).unwrap_err();
        assert_eq!(
            err,
            GateError::AlreadyPending {
                role: TabRole::Editor,
                tab: TabId(1)
            }
        );

        // The original gate is untouched
        assert_eq!(gates.resolve(TabId(1)).unwrap().payload, load("a"));
    }

    #[test]
    fn roles_are_independent() {
        let mut gates = ReadyGates::new();
        gates.register(TabRole::Editor, TabId(1), None).unwrap();
        gates.register(TabRole::Authentication, TabId(2), None).unwrap();

        assert!(gates.cancel(TabRole::Authentication).is_some());
        assert!(gates.is_pending(TabRole::Editor));
        assert!(gates.resolve(TabId(2)).is_none());
    }
}
