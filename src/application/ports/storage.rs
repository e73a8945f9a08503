//! Session storage and blob storage port interfaces

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::protocol::BlobId;

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Storage read failed: {0}")]
    Read(String),

    #[error("Storage write failed: {0}")]
    Write(String),
}

/// Port for the session-scoped key/value store
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read `keys`; an empty slice reads every stored key.
    /// Missing keys are absent from the result.
    async fn get(&self, keys: &[String]) -> Result<Map<String, Value>, StorageError>;

    /// Write every entry, replacing existing values
    async fn set(&self, entries: Map<String, Value>) -> Result<(), StorageError>;

    /// Remove every key
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Port for persisting finished recordings
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` under a fresh name and return it
    async fn put(&self, bytes: Vec<u8>) -> Result<BlobId, StorageError>;
}
