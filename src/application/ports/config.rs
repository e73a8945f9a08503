//! Preference storage port interface

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::Preferences;
use crate::domain::error::ConfigError;

/// Port for the durable preference store
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Load preferences from storage.
    ///
    /// # Returns
    /// The loaded preferences (may have None fields if nothing is stored)
    async fn load(&self) -> Result<Preferences, ConfigError>;

    /// Save preferences to storage.
    async fn save(&self, preferences: &Preferences) -> Result<(), ConfigError>;

    /// Get the backing file path.
    fn path(&self) -> PathBuf;

    /// Check if the backing file exists.
    fn exists(&self) -> bool;

    /// Initialize storage with defaults.
    /// Fails if a file already exists.
    async fn init(&self) -> Result<(), ConfigError>;
}
