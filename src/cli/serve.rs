//! Daemon runner for the serve command

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::application::CoordinatorUrls;
use crate::infrastructure::{FsBlobStore, XdgPreferenceStore};

use super::control::SessionRuntime;
use super::pid_file::{PidFile, PidFileError};
use super::presenter::Presenter;
use super::signals::ShutdownSignals;
use super::socket::{ControlSocketServer, SocketPath};
use super::{EXIT_ERROR, EXIT_SUCCESS};

/// Options for the serve command
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub socket: Option<std::path::PathBuf>,
    pub editor_url: Option<String>,
    pub authentication_url: Option<String>,
}

impl ServeOptions {
    fn urls(&self) -> CoordinatorUrls {
        let defaults = CoordinatorUrls::default();
        CoordinatorUrls {
            editor: self.editor_url.clone().unwrap_or(defaults.editor),
            authentication: self
                .authentication_url
                .clone()
                .unwrap_or(defaults.authentication),
        }
    }
}

/// Install the global tracing subscriber. RUST_LOG wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "screen_session=debug"
    } else {
        "screen_session=info"
    };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Run the daemon until SIGINT or SIGTERM
pub async fn run_serve(options: ServeOptions) -> ExitCode {
    let presenter = Presenter::new();

    let pid_file = PidFile::new();
    match pid_file.acquire() {
        Ok(()) => {}
        Err(PidFileError::AlreadyRunning(pid)) => {
            presenter.error(&format!("Daemon already running (PID: {})", pid));
            // Leave the running daemon's PID file alone
            std::mem::forget(pid_file);
            return ExitCode::from(EXIT_ERROR);
        }
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let mut signals = match ShutdownSignals::install() {
        Ok(signals) => signals,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let socket_path = SocketPath::resolve(options.socket.clone());
    let mut server = ControlSocketServer::new(socket_path.clone());
    if let Err(e) = server.bind() {
        presenter.error(&format!("Failed to bind socket: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let runtime = Arc::new(SessionRuntime::start(
        XdgPreferenceStore::new(),
        FsBlobStore::new(),
        options.urls(),
    ));

    presenter.daemon_status("Started, waiting for envelopes...");
    presenter.info(&format!(
        "PID: {} | Socket: {} | SIGINT: exit",
        std::process::id(),
        socket_path.path().display()
    ));
    info!(socket = %socket_path.path().display(), "Control socket listening");

    let clean = tokio::select! {
        result = server.run(Arc::clone(&runtime)) => {
            if let Err(e) = &result {
                error!(error = %e, "Control socket stopped");
            }
            result.is_ok()
        }
        signal = signals.recv() => {
            info!(signal = ?signal, "Shutting down");
            true
        }
    };

    runtime.shutdown().await;
    presenter.daemon_status("Stopped");

    // Socket file goes with the server, PID file with its guard
    drop(server);
    let _ = pid_file.release();

    if clean {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}
