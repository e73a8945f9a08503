//! screen-session CLI entry point

use std::process::ExitCode;

use clap::Parser;

use screen_session::cli::{
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    init_tracing, run_serve,
    send_cmd::{handle_devices_command, handle_send_command},
    socket::SocketPath,
    Presenter, ServeOptions, EXIT_ERROR,
};
use screen_session::infrastructure::XdgPreferenceStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let presenter = Presenter::new();

    match cli.command {
        Commands::Serve {
            editor_url,
            authentication_url,
        } => {
            run_serve(ServeOptions {
                socket: cli.socket,
                editor_url,
                authentication_url,
            })
            .await
        }
        Commands::Send { json } => {
            if let Err(e) = handle_send_command(&json, SocketPath::resolve(cli.socket), &presenter).await {
                presenter.error(&e);
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Commands::Config { action } => {
            let store = XdgPreferenceStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Commands::Devices => {
            if let Err(e) = handle_devices_command(&presenter).await {
                presenter.error(&e);
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
    }
}
