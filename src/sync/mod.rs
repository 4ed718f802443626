//! Synchronization session - keeps the store consistent with the server

mod backoff;
pub mod bootstrap;
pub mod dispatch;
mod engine;
mod stream;

pub use backoff::Backoff;
pub use bootstrap::{BootstrapData, BootstrapError, SnapshotLoader};
pub use engine::{create_session_channels, SyncSession};
pub use stream::EventStreamClient;

use std::time::Duration;

use crate::api::RemoteCommand;

/// Commands that can be sent to the sync session
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Re-run the bootstrap; the result replaces the current baseline
    Refresh,
    /// Send a mutation to the server
    Execute(RemoteCommand),
    /// Tear the session down
    Shutdown,
}

/// Status updates from the sync session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    /// Opening the event stream
    Connecting { attempt: u32 },
    /// Event stream open
    Connected,
    /// Event stream lost; next attempt after `delay`
    Reconnecting { delay: Duration },
    /// A bootstrap was committed
    Bootstrapped,
    /// A mandatory bootstrap resource failed
    BootstrapFailed(String),
    CommandSucceeded { command: &'static str },
    CommandFailed { command: &'static str, error: String },
    /// Session finished
    Stopped,
}
