//! k9-sync
//!
//! Keeps a local view of a remote K9 robot (telemetry, active routine,
//! personas, loops, camera stream and event history) in sync with its
//! control server.

mod api;
mod camera;
mod cli;
mod config;
mod data;
mod logging;
mod store;
mod sync;
#[cfg(test)]
mod testutil;

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use api::{ApiClient, RemoteCommand};
use cli::{Invocation, Mode};
use config::Config;
use store::StoreReader;
use sync::{create_session_channels, SessionCommand, SessionStatus, SyncSession};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Invocation { config_path, mode } = cli::parse_args(&args)?;

    if mode == Mode::Help {
        print_help();
        return Ok(());
    }

    // Initialize logging (file + stderr); hold the guard until exit
    let _log_guard = logging::init_logging()?;

    info!("k9-sync starting...");

    let config = Config::load(config_path)?;
    info!("Configuration loaded from {:?}", config.config_path());

    let runtime = tokio::runtime::Runtime::new()?;

    match mode {
        Mode::Help => Ok(()),
        Mode::Send(command) => runtime.block_on(send(&config, command)),
        Mode::Watch => watch(runtime, config),
    }
}

/// Execute one command and print the server's reply
async fn send(config: &Config, command: RemoteCommand) -> Result<()> {
    let api = ApiClient::new(config)?;
    info!("Sending {}", command.label());

    match api.execute(&command).await {
        Ok(reply) => {
            println!("{}", serde_json::to_string_pretty(&reply)?);
            Ok(())
        }
        Err(e) => {
            match e.status() {
                Some(status) => error!("Command {} rejected with {}", command.label(), status),
                None => error!("Command {} failed", command.label()),
            }
            Err(e.into())
        }
    }
}

/// Run a session until Ctrl+C, logging every state change
fn watch(runtime: tokio::runtime::Runtime, config: Config) -> Result<()> {
    let (cmd_tx, cmd_rx, status_tx, status_rx) = create_session_channels();
    let mut session = SyncSession::new(config, cmd_rx, status_tx)?;
    let reader = session.reader();
    let cancel = session.cancel_token();

    // Ctrl+C asks for an orderly shutdown; a second press cancels outright
    let pressed = AtomicBool::new(false);
    ctrlc::set_handler(move || {
        if pressed.swap(true, Ordering::SeqCst) {
            warn!("Ctrl+C received again, cancelling session");
            cancel.cancel();
            return;
        }
        info!("Ctrl+C received, shutting down...");
        if cmd_tx.try_send(SessionCommand::Shutdown).is_err() {
            cancel.cancel();
        }
    })?;

    runtime.spawn(log_states(reader));
    runtime.spawn(log_statuses(status_rx));

    let result = runtime.block_on(session.run());
    if let Err(e) = &result {
        error!("Sync session error: {:#}", e);
    }

    info!("Shutdown complete");
    result
}

async fn log_states(reader: StoreReader) {
    use futures::StreamExt;

    let mut states = reader.into_stream();
    while let Some(state) = states.next().await {
        info!("State: {}", state.summary());
        if let Some(snapshot) = &state.snapshot {
            debug!("Snapshot: {}", snapshot.as_value());
        }
    }
}

async fn log_statuses(mut status_rx: tokio::sync::broadcast::Receiver<SessionStatus>) {
    loop {
        match status_rx.recv().await {
            Ok(SessionStatus::BootstrapFailed(e)) => warn!("Initial load failed: {}", e),
            Ok(SessionStatus::CommandFailed { command, error }) => {
                warn!("Command {} failed: {}", command, error)
            }
            Ok(SessionStatus::Stopped) => break,
            Ok(status) => info!("Session: {:?}", status),
            Err(RecvError::Lagged(n)) => warn!("Missed {} session status updates", n),
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_help() {
    println!("k9-sync - Live state sync for the K9 robot dashboard");
    println!();
    println!("USAGE:");
    println!("    k9-sync [OPTIONS] [watch]");
    println!("    k9-sync [OPTIONS] send <COMMAND> [ARGS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help            Print this help message");
    println!("    -c, --config <PATH>   Use this config file instead of the default");
    println!();
    println!("COMMANDS:");
    println!("    loops [--awareness on|off] [--sensors on|off]");
    println!("    action <NAME>");
    println!("    persona <NAME>");
    println!("    create-persona <NAME> [--voice V] [--description D] [--prompt P]");
    println!("                          [--motivation M] [--image-prompt I]");
    println!("    prompt <TEXT> [--voice V] [--motivation M] [--image-prompt I]");
    println!("    goal <TEXT>");
    println!("    instruct <TEXT>");
    println!("    awareness <MESSAGE>");
    println!("    camera on|off [--fps N]");
    println!("    shutdown");
    println!();
    println!("    An empty value for a prompt option clears that field.");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG          Set log level (e.g., debug, info, warn)");
    println!("    K9_BASE_URL       Control server base URL");
    println!("    K9_API_TOKEN      Token sent as x-api-key");
    println!("    K9_SYNC_LOG_PATH  Directory for log files");
}
