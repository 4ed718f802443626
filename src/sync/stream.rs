//! Persistent event stream connection
//!
//! One worker per session. It owns the socket, parses inbound text into
//! envelopes and reconnects with backoff until cancelled.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::data::Envelope;

use super::backoff::Backoff;
use super::SessionStatus;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a connection ended
#[derive(Debug)]
enum Disconnect {
    Cancelled,
    /// Nobody is consuming envelopes any more
    ReceiverGone,
    Lost(String),
}

pub struct EventStreamClient {
    url: Url,
    api_token: Option<String>,
    backoff: Backoff,
    envelope_tx: mpsc::Sender<Envelope>,
    status_tx: broadcast::Sender<SessionStatus>,
    cancel: CancellationToken,
}

impl EventStreamClient {
    pub fn new(
        url: Url,
        api_token: Option<String>,
        backoff: Backoff,
        envelope_tx: mpsc::Sender<Envelope>,
        status_tx: broadcast::Sender<SessionStatus>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            url,
            api_token,
            backoff,
            envelope_tx,
            status_tx,
            cancel,
        }
    }

    /// Connect, pump and reconnect until cancelled.
    ///
    /// Attempts are strictly sequential; a lost connection schedules exactly
    /// one retry.
    pub async fn run(mut self) {
        info!("Event stream starting: {}", self.url);
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);
            let _ = self.status_tx.send(SessionStatus::Connecting { attempt });

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.connect() => result,
            };

            match connected {
                Ok(ws) => {
                    info!("Event stream connected");
                    self.backoff.reset();
                    attempt = 0;
                    let _ = self.status_tx.send(SessionStatus::Connected);

                    match self.pump(ws).await {
                        Disconnect::Cancelled => break,
                        Disconnect::ReceiverGone => {
                            debug!("Envelope receiver dropped, stopping event stream");
                            break;
                        }
                        Disconnect::Lost(reason) => warn!("Event stream lost: {}", reason),
                    }
                }
                Err(e) => warn!("Event stream connection failed: {:#}", e),
            }

            let delay = self.backoff.next_delay();
            info!("Reconnecting event stream in {:?}", delay);
            let _ = self.status_tx.send(SessionStatus::Reconnecting { delay });

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Event stream stopped");
    }

    async fn connect(&self) -> Result<WsStream> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .context("Invalid event stream URL")?;

        if let Some(token) = &self.api_token {
            let value = HeaderValue::from_str(token).context("API token is not a valid header value")?;
            request.headers_mut().insert("x-api-key", value);
        }

        let (ws, _response) = connect_async(request)
            .await
            .with_context(|| format!("Failed to connect to {}", self.url))?;
        Ok(ws)
    }

    async fn pump(&mut self, mut ws: WsStream) -> Disconnect {
        loop {
            let message = tokio::select! {
                _ = self.cancel.cancelled() => {
                    close(&mut ws).await;
                    return Disconnect::Cancelled;
                }
                message = ws.next() => message,
            };

            match message {
                None => return Disconnect::Lost("connection ended".to_string()),
                Some(Err(e)) => return Disconnect::Lost(e.to_string()),
                Some(Ok(Message::Text(text))) => match Envelope::parse(&text) {
                    Ok(envelope) => {
                        // Cancellation wins over a full channel
                        let delivered = tokio::select! {
                            _ = self.cancel.cancelled() => {
                                close(&mut ws).await;
                                return Disconnect::Cancelled;
                            }
                            sent = self.envelope_tx.send(envelope) => sent.is_ok(),
                        };
                        if !delivered {
                            return Disconnect::ReceiverGone;
                        }
                    }
                    Err(e) => warn!("Dropping malformed event: {}", e),
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("closed by server ({})", u16::from(f.code)))
                        .unwrap_or_else(|| "closed by server".to_string());
                    return Disconnect::Lost(reason);
                }
                // Pings are answered by tungstenite on the next read
                Some(Ok(_)) => {}
            }
        }
    }
}

async fn close(ws: &mut WsStream) {
    if let Err(e) = ws.close(None).await {
        debug!("Error closing event stream: {}", e);
    }
}
