//! Single-use tab capture grants

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use uuid::Uuid;

use crate::domain::capture::StreamId;
use crate::domain::tabs::TabId;

/// Why a stream id could not be redeemed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantRejection {
    Unknown,
    Consumed,
}

#[derive(Debug, Default)]
struct Ledger {
    issued: HashMap<StreamId, TabId>,
    consumed: HashSet<StreamId>,
}

/// Stream ids issued by the platform and redeemed by media acquisition.
/// Each id redeems exactly once.
#[derive(Debug, Default)]
pub struct StreamGrants {
    ledger: Mutex<Ledger>,
}

impl StreamGrants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh stream id for `tab`
    pub fn issue(&self, tab: TabId) -> StreamId {
        let stream_id = StreamId::new(Uuid::new_v4().to_string());
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.issued.insert(stream_id.clone(), tab);
        }
        stream_id
    }

    /// Redeem a stream id, returning the tab it authorizes
    pub fn redeem(&self, stream_id: &StreamId) -> Result<TabId, GrantRejection> {
        let mut ledger = self.ledger.lock().map_err(|_| GrantRejection::Unknown)?;
        match ledger.issued.remove(stream_id) {
            Some(tab) => {
                ledger.consumed.insert(stream_id.clone());
                Ok(tab)
            }
            None if ledger.consumed.contains(stream_id) => Err(GrantRejection::Consumed),
            None => Err(GrantRejection::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_id_redeems_once() {
        let grants = StreamGrants::new();
        let stream_id = grants.issue(TabId(4));

        assert_eq!(grants.redeem(&stream_id), Ok(TabId(4)));
        assert_eq!(grants.redeem(&stream_id), Err(GrantRejection::Consumed));
    }

    #[test]
    fn unknown_stream_id_is_rejected() {
        let grants = StreamGrants::new();
        assert_eq!(
            grants.redeem(&StreamId::new("forged")),
            Err(GrantRejection::Unknown)
        );
    }
}
