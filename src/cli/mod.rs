//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, the control socket and
//! the serve runner.

pub mod args;
pub mod config_cmd;
pub mod control;
pub mod pid_file;
pub mod presenter;
pub mod send_cmd;
pub mod serve;
pub mod signals;
pub mod socket;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;

// Re-export commonly used types
pub use args::{Cli, Commands, ConfigAction};
pub use control::{ControlHandler, Envelope, SessionRuntime};
pub use presenter::Presenter;
pub use serve::{init_tracing, run_serve, ServeOptions};
