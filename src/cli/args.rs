//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// screen-session - recording session daemon
#[derive(Parser, Debug)]
#[command(name = "screen-session")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Coordinates screen recording sessions across browser tabs")]
#[command(long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Control socket path
    #[arg(long, value_name = "PATH", env = "SCREEN_SESSION_SOCKET", global = true)]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the session daemon in the foreground
    Serve {
        /// Page opened after a recording is saved
        #[arg(long, value_name = "URL")]
        editor_url: Option<String>,

        /// Page opened when no credentials are stored
        #[arg(long, value_name = "URL")]
        authentication_url: Option<String>,
    },
    /// Send one JSON envelope to the running daemon and print the reply
    Send {
        /// Envelope, e.g. '{"kind":"gesture","tab":{"id":1,"url":"https://example.com","active":true}}'
        json: String,
    },
    /// Manage preferences
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List microphones visible to the audio host
    Devices,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create preferences file with defaults
    Init,
    /// Set a preference
    Set {
        /// Preference key
        key: String,
        /// Preference value
        value: String,
    },
    /// Get a preference
    Get {
        /// Preference key
        key: String,
    },
    /// List all preferences
    List,
    /// Show preferences file path
    Path,
    /// Forget stored credentials
    SignOut,
}

/// Valid preference keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "microphone_id",
    "camera_id",
    "push_to_talk",
    "desktop_audio",
    "surface",
    "countdown",
];

/// Check if a preference key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
