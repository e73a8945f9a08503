//! Filesystem blob store for finished recordings

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use crate::application::ports::{BlobStore, StorageError};
use crate::domain::protocol::BlobId;

/// Stores each recording as `recording-<timestamp>-<id>.json` in one directory
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    /// Create a store under `$XDG_DATA_HOME/screen-session/recordings`
    pub fn new() -> Self {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join(crate::infrastructure::config::APP_DIR)
            .join("recordings");
        Self { dir }
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a blob is stored at
    pub fn path_of(&self, blob: &BlobId) -> PathBuf {
        self.dir.join(format!("{}.json", blob))
    }

    fn fresh_name() -> BlobId {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        BlobId::new(format!("recording-{}-{}", timestamp, &suffix[..8]))
    }
}

impl Default for FsBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<BlobId, StorageError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::Write(e.to_string()))?;

        let blob = Self::fresh_name();
        fs::write(self.path_of(&blob), bytes)
            .await
            .map_err(|e| StorageError::Write(e.to_string()))?;

        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::with_dir(dir.path().join("recordings"));

        let blob = store.put(b"{}".to_vec()).await.unwrap();

        assert!(blob.as_str().starts_with("recording-"));
        let written = std::fs::read(store.path_of(&blob)).unwrap();
        assert_eq!(written, b"{}");
    }

    #[tokio::test]
    async fn names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::with_dir(dir.path());

        let a = store.put(vec![1]).await.unwrap();
        let b = store.put(vec![2]).await.unwrap();
        assert_ne!(a, b);
    }
}
