//! Config command handler

use crate::application::ports::PreferenceStore;
use crate::domain::capture::Surface;
use crate::domain::config::Preferences;
use crate::domain::error::{ConfigError, InvalidSurfaceError};

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: PreferenceStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
        ConfigAction::SignOut => handle_sign_out(store, presenter).await,
    }
}

async fn handle_init<S: PreferenceStore>(
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Preferences file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: PreferenceStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let mut preferences = store.load().await?;
    apply(&mut preferences, key, value)?;
    store.save(&preferences).await?;
    presenter.success(&format!("{} = {}", key, value));
    Ok(())
}

async fn handle_get<S: PreferenceStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let preferences = store.load().await?;
    presenter.output(lookup(&preferences, key).as_deref().unwrap_or(NOT_SET));
    Ok(())
}

async fn handle_list<S: PreferenceStore>(
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    let preferences = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(key, lookup(&preferences, key).as_deref().unwrap_or(NOT_SET));
    }
    let signed_in = if preferences.is_authenticated() {
        "yes"
    } else {
        "no"
    };
    presenter.key_value("signed_in", signed_in);

    Ok(())
}

fn handle_path<S: PreferenceStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

async fn handle_sign_out<S: PreferenceStore>(
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    let mut preferences = store.load().await?;
    if preferences.credentials.take().is_none() {
        presenter.warn("Not signed in");
        return Ok(());
    }
    store.save(&preferences).await?;
    presenter.success("Signed out");
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        })
    }
}

/// Validate `value` for `key` and store it
fn apply(preferences: &mut Preferences, key: &str, value: &str) -> Result<(), ConfigError> {
    let as_bool = || {
        parse_bool(value).ok_or_else(|| ConfigError::ValidationError {
            key: key.to_string(),
            message: "Value must be 'true' or 'false'".to_string(),
        })
    };

    match key {
        "microphone_id" => preferences.microphone_id = Some(value.to_string()),
        "camera_id" => preferences.camera_id = Some(value.to_string()),
        "push_to_talk" => preferences.push_to_talk = Some(as_bool()?),
        "desktop_audio" => preferences.desktop_audio = Some(as_bool()?),
        "countdown" => preferences.countdown = Some(as_bool()?),
        "surface" => {
            let surface: Surface = value.parse().map_err(|e: InvalidSurfaceError| {
                ConfigError::ValidationError {
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })?;
            preferences.surface = Some(surface.to_string());
        }
        _ => return check_key(key),
    }
    Ok(())
}

fn lookup(preferences: &Preferences, key: &str) -> Option<String> {
    match key {
        "microphone_id" => preferences.microphone_id.clone(),
        "camera_id" => preferences.camera_id.clone(),
        "push_to_talk" => preferences.push_to_talk.map(|b| b.to_string()),
        "desktop_audio" => preferences.desktop_audio.map(|b| b.to_string()),
        "surface" => preferences.surface.clone(),
        "countdown" => preferences.countdown.map(|b| b.to_string()),
        _ => None,
    }
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::XdgPreferenceStore;

    #[test]
    fn parse_bool_values() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("OFF"), Some(false));
        assert_eq!(parse_bool("1"), Some(true));
        assert!(parse_bool("maybe").is_none());
    }

    #[test]
    fn surface_is_normalized() {
        let mut preferences = Preferences::empty();
        apply(&mut preferences, "surface", "Window").unwrap();
        assert_eq!(preferences.surface.as_deref(), Some("window"));
    }

    #[test]
    fn invalid_surface_is_rejected() {
        let mut preferences = Preferences::empty();
        let result = apply(&mut preferences, "surface", "hologram");
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
        assert!(preferences.surface.is_none());
    }

    #[test]
    fn invalid_bool_is_rejected() {
        let mut preferences = Preferences::empty();
        assert!(apply(&mut preferences, "countdown", "sometimes").is_err());
    }

    #[test]
    fn credentials_are_not_a_settable_key() {
        assert!(check_key("credentials").is_err());
    }

    #[tokio::test]
    async fn set_then_get_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgPreferenceStore::with_path(dir.path().join("preferences.toml"));
        let presenter = Presenter::new();

        handle_set(&store, &presenter, "push_to_talk", "yes").await.unwrap();
        let preferences = store.load().await.unwrap();
        assert_eq!(preferences.push_to_talk, Some(true));
        assert_eq!(lookup(&preferences, "push_to_talk").as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn sign_out_clears_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgPreferenceStore::with_path(dir.path().join("preferences.toml"));
        store
            .save(&Preferences {
                credentials: Some("token".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        handle_sign_out(&store, &Presenter::new()).await.unwrap();
        assert!(!store.load().await.unwrap().is_authenticated());
    }
}
