//! Synchronization session
//!
//! Owns the store and serializes every transition on one task. The event
//! stream worker, bootstrap fetches and command calls run on their own tasks
//! and hand results back through channels.

use anyhow::Result;
use reqwest::Url;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, RemoteCommand};
use crate::config::Config;
use crate::data::{Envelope, StreamEvent};
use crate::store::{Store, StoreReader};

use super::backoff::Backoff;
use super::bootstrap::{self, BootstrapData, BootstrapError, SnapshotLoader};
use super::dispatch;
use super::stream::EventStreamClient;
use super::{SessionCommand, SessionStatus};

type BootstrapOutcome = (u64, Result<BootstrapData, BootstrapError>);

/// The sync session keeps the store consistent with the server
pub struct SyncSession {
    config: Config,
    api: ApiClient,
    loader: SnapshotLoader,
    store: Store,
    /// Context the camera stream URL is resolved against
    page: Url,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    status_tx: broadcast::Sender<SessionStatus>,
    cancel: CancellationToken,
    /// Generation of the newest bootstrap; older results are discarded
    generation: u64,
}

impl SyncSession {
    pub fn new(
        config: Config,
        cmd_rx: mpsc::Receiver<SessionCommand>,
        status_tx: broadcast::Sender<SessionStatus>,
    ) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        let page = config.page_url()?;

        Ok(Self {
            config,
            loader: SnapshotLoader::new(api.clone()),
            api,
            store: Store::new(),
            page,
            cmd_rx,
            status_tx,
            cancel: CancellationToken::new(),
            generation: 0,
        })
    }

    /// Read-only view of the session's state
    pub fn reader(&self) -> StoreReader {
        self.store.reader()
    }

    /// Token that tears the session down when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the session main loop until shutdown or cancellation
    pub async fn run(&mut self) -> Result<()> {
        let session_id = self.config.session_id();
        info!("Sync session starting: {}", session_id);

        let (envelope_tx, mut envelope_rx) = mpsc::channel(self.config.stream.channel_capacity.max(1));
        let (bootstrap_tx, mut bootstrap_rx) = mpsc::channel::<BootstrapOutcome>(4);

        let stream = EventStreamClient::new(
            self.config.events_url()?,
            self.config.server.api_token.clone(),
            Backoff::from_config(&self.config.stream),
            envelope_tx,
            self.status_tx.clone(),
            self.cancel.child_token(),
        );
        let stream_handle: JoinHandle<()> = tokio::spawn(stream.run());

        self.spawn_bootstrap(&bootstrap_tx);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Sync session cancelled");
                    break;
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Refresh) => {
                            info!("Refresh requested");
                            self.spawn_bootstrap(&bootstrap_tx);
                        }
                        Some(SessionCommand::Execute(command)) => {
                            self.spawn_command(command);
                        }
                        Some(SessionCommand::Shutdown) | None => {
                            info!("Shutdown command received");
                            break;
                        }
                    }
                }

                Some(envelope) = envelope_rx.recv() => {
                    self.handle_envelope(envelope);
                }

                Some((generation, outcome)) = bootstrap_rx.recv() => {
                    self.handle_bootstrap(generation, outcome);
                }
            }
        }

        self.cancel.cancel();
        drop(envelope_rx);
        if let Err(e) = stream_handle.await {
            warn!("Event stream task ended abnormally: {}", e);
        }

        let _ = self.status_tx.send(SessionStatus::Stopped);
        info!("Sync session stopped");
        Ok(())
    }

    /// Start a bootstrap on its own task; supersedes any in flight
    fn spawn_bootstrap(&mut self, tx: &mpsc::Sender<BootstrapOutcome>) {
        self.generation += 1;
        let generation = self.generation;
        let loader = self.loader.clone();
        let cancel = self.cancel.clone();
        let tx = tx.clone();

        debug!("Starting bootstrap {}", generation);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return,
                outcome = loader.load() => outcome,
            };
            let _ = tx.send((generation, outcome)).await;
        });
    }

    fn handle_bootstrap(&self, generation: u64, outcome: Result<BootstrapData, BootstrapError>) {
        if generation != self.generation {
            debug!(
                "Discarding bootstrap {} superseded by {}",
                generation, self.generation
            );
            return;
        }

        let page = &self.page;
        match outcome {
            Ok(data) => {
                self.store.update(|state| bootstrap::commit(state, data, page));
                info!("Bootstrap committed: {}", self.store.current().summary());
                let _ = self.status_tx.send(SessionStatus::Bootstrapped);
            }
            Err(e) => {
                error!("Bootstrap failed: {}", e);
                self.store.update(|state| bootstrap::commit_failure(state, &e));
                let _ = self.status_tx.send(SessionStatus::BootstrapFailed(e.to_string()));
            }
        }
    }

    fn handle_envelope(&self, envelope: Envelope) {
        let event = StreamEvent::from_envelope(envelope);
        debug!("Applying {}", event.kind());
        let page = &self.page;
        self.store.update(|state| dispatch::apply(state, event, page));
    }

    /// Send a mutation on its own task and report the outcome
    fn spawn_command(&self, command: RemoteCommand) {
        let api = self.api.clone();
        let status_tx = self.status_tx.clone();

        tokio::spawn(async move {
            let label = command.label();
            match api.execute(&command).await {
                Ok(reply) => {
                    info!("Command {} accepted: {}", label, reply);
                    let _ = status_tx.send(SessionStatus::CommandSucceeded { command: label });
                }
                Err(e) => {
                    error!("Command {} failed: {}", label, e);
                    let _ = status_tx.send(SessionStatus::CommandFailed {
                        command: label,
                        error: e.to_string(),
                    });
                }
            }
        });
    }
}

/// Create command and status channels for the session
pub fn create_session_channels() -> (
    mpsc::Sender<SessionCommand>,
    mpsc::Receiver<SessionCommand>,
    broadcast::Sender<SessionStatus>,
    broadcast::Receiver<SessionStatus>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (status_tx, status_rx) = broadcast::channel(64);
    (cmd_tx, cmd_rx, status_tx, status_rx)
}
