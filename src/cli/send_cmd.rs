//! Send and devices command handlers

use crate::infrastructure::HeadlessMediaDevices;

use super::control::Envelope;
use super::presenter::Presenter;
use super::socket::{ControlSocketClient, SocketPath};

/// Send one envelope to the running daemon and print its reply
pub async fn handle_send_command(
    json: &str,
    socket_path: SocketPath,
    presenter: &Presenter,
) -> Result<(), String> {
    // Catch typos locally instead of round-tripping them
    serde_json::from_str::<Envelope>(json).map_err(|e| format!("Invalid envelope: {}", e))?;

    let client = ControlSocketClient::new(socket_path);
    if !client.is_daemon_running() {
        return Err("No daemon running. Start with: screen-session serve".to_string());
    }

    let response = client
        .send(json)
        .await
        .map_err(|e| format!("Failed to communicate with daemon: {}", e))?;

    presenter.reply(&response);
    Ok(())
}

/// List microphones on the default audio host
pub async fn handle_devices_command(presenter: &Presenter) -> Result<(), String> {
    let devices = tokio::task::spawn_blocking(HeadlessMediaDevices::list_microphones)
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;

    presenter.microphones(&devices);
    Ok(())
}
