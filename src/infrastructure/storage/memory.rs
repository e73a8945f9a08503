//! In-memory session store

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::application::ports::{SessionStore, StorageError};

/// Session-scoped key/value store held in process memory.
///
/// Lives as long as the daemon, so UI contexts reconnecting after a restart
/// of their own can resynchronize from it.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<Map<String, Value>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, Map<String, Value>>, StorageError> {
        self.values
            .lock()
            .map_err(|_| StorageError::Read("session store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, keys: &[String]) -> Result<Map<String, Value>, StorageError> {
        let values = self.values()?;
        if keys.is_empty() {
            return Ok(values.clone());
        }
        Ok(keys
            .iter()
            .filter_map(|key| values.get(key).map(|v| (key.clone(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<(), StorageError> {
        self.values()?.extend(entries);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.values()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn get_returns_only_present_keys() {
        let store = MemorySessionStore::new();
        store
            .set(entries(&[("recordingState", json!("recording"))]))
            .await
            .unwrap();

        let values = store
            .get(&["recordingState".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["recordingState"], json!("recording"));
    }

    #[tokio::test]
    async fn empty_key_list_reads_everything() {
        let store = MemorySessionStore::new();
        store
            .set(entries(&[
                ("recordingState", json!("paused")),
                ("elapsedSeconds", json!(12)),
            ]))
            .await
            .unwrap();

        assert_eq!(store.get(&[]).await.unwrap().len(), 2);

        store.clear().await.unwrap();
        assert!(store.get(&[]).await.unwrap().is_empty());
    }
}
