//! XDG preference store adapter

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::application::ports::PreferenceStore;
use crate::domain::config::Preferences;
use crate::domain::error::ConfigError;

/// Application directory name under the XDG config and data dirs
pub const APP_DIR: &str = "screen-session";

/// XDG-compliant preference store
pub struct XdgPreferenceStore {
    path: PathBuf,
}

impl XdgPreferenceStore {
    /// Create a store at `$XDG_CONFIG_HOME/screen-session/preferences.toml`
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join(APP_DIR);

        Self {
            path: config_dir.join("preferences.toml"),
        }
    }

    /// Create with custom path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse_toml(content: &str) -> Result<Preferences, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn to_toml(preferences: &Preferences) -> Result<String, ConfigError> {
        toml::to_string_pretty(preferences).map_err(|e| ConfigError::WriteError(e.to_string()))
    }
}

impl Default for XdgPreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreferenceStore for XdgPreferenceStore {
    async fn load(&self) -> Result<Preferences, ConfigError> {
        if !self.exists() {
            return Ok(Preferences::empty());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Self::parse_toml(&content)
    }

    async fn save(&self, preferences: &Preferences) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let content = Self::to_toml(preferences)?;

        fs::write(&self.path, content)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    async fn init(&self) -> Result<(), ConfigError> {
        if self.exists() {
            return Err(ConfigError::AlreadyExists(
                self.path.to_string_lossy().to_string(),
            ));
        }

        self.save(&Preferences::defaults()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_is_xdg() {
        let store = XdgPreferenceStore::new();
        let path = store.path().to_string_lossy().to_string();
        assert!(path.contains(APP_DIR));
        assert!(path.ends_with("preferences.toml"));
    }

    #[test]
    fn parse_partial_file() {
        let content = r#"
microphone_id = "usb-mic"
push_to_talk = true
surface = "window"
"#;

        let preferences = XdgPreferenceStore::parse_toml(content).unwrap();
        assert_eq!(preferences.microphone_id.as_deref(), Some("usb-mic"));
        assert_eq!(preferences.push_to_talk, Some(true));
        assert_eq!(preferences.countdown, None);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let result = XdgPreferenceStore::parse_toml("push_to_talk = maybe");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgPreferenceStore::with_path(dir.path().join("preferences.toml"));
        assert_eq!(store.load().await.unwrap(), Preferences::empty());
    }

    #[tokio::test]
    async fn init_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgPreferenceStore::with_path(dir.path().join("nested/preferences.toml"));

        store.init().await.unwrap();
        assert_eq!(store.load().await.unwrap(), Preferences::defaults());

        assert!(matches!(
            store.init().await,
            Err(ConfigError::AlreadyExists(_))
        ));
    }
}
