//! Domain error types

use thiserror::Error;

/// Error when an unknown capture surface is provided
#[derive(Debug, Clone, Error)]
#[error("Invalid surface: \"{input}\". Valid surfaces are: tab, window, screen")]
pub struct InvalidSurfaceError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read preferences file: {0}")]
    ReadError(String),

    #[error("Failed to parse preferences file: {0}")]
    ParseError(String),

    #[error("Failed to write preferences file: {0}")]
    WriteError(String),

    #[error("Invalid preference value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Preferences file already exists at: {0}")]
    AlreadyExists(String),
}
