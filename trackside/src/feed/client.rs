//! WebSocket feed client.
//!
//! [`FeedClient::connect`] spawns a single connection task for the configured
//! endpoint and returns a [`FeedHandle`] plus a channel of [`FeedEvent`]s.
//! The handle owns the connection: dropping it (or calling
//! [`FeedHandle::close`]) cancels the task, which sends a close frame and
//! releases the socket.
//!
//! ```text
//! ┌──────────────┐  frames   ┌──────────────┐  FeedEvent   ┌─────────────┐
//! │  WebSocket   │ ────────► │ decode_frame │ ───────────► │ RaceSession │
//! └──────────────┘           └──────┬───────┘              └─────────────┘
//!                                   │ ParseFailure
//!                                   ▼
//!                                dropped
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::message::{decode_binary, decode_frame, ParseFailure, TelemetryMessage};
use super::status::{ConnectionStatus, FeedStatus};

/// Default feed endpoint of the race simulator.
pub const DEFAULT_FEED_URL: &str = "ws://localhost:8765";

/// Default delay before reconnecting after the socket closes.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

type FeedSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for a feed connection.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket endpoint (`ws://` or `wss://`).
    pub url: String,
    /// Reconnect after the connection closes or fails.
    pub reconnect: bool,
    /// Delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Capacity of the event channel.
    pub event_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            reconnect: true,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl FeedConfig {
    /// Create a config for the given endpoint with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Enable or disable reconnection.
    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set the reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// Errors raised before a connection task can be started.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The endpoint is not a WebSocket URL.
    #[error("Invalid feed URL '{0}': expected ws:// or wss://")]
    InvalidUrl(String),
}

/// Events emitted by a feed connection, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The connection status changed.
    Status(ConnectionStatus),
    /// A frame decoded into a message.
    Message(TelemetryMessage),
    /// The transport failed. Non-fatal; the client may reconnect.
    TransportError(String),
}

/// Entry point for opening feed connections.
pub struct FeedClient;

impl FeedClient {
    /// Spawn a connection task for `config.url`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(
        config: FeedConfig,
    ) -> Result<(FeedHandle, mpsc::Receiver<FeedEvent>), FeedError> {
        if !(config.url.starts_with("ws://") || config.url.starts_with("wss://")) {
            return Err(FeedError::InvalidUrl(config.url));
        }

        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let (status_tx, status_rx) = watch::channel(FeedStatus::default());
        let shutdown = CancellationToken::new();

        let url = config.url.clone();
        let task = tokio::spawn(run_connection(config, event_tx, status_tx, shutdown.clone()));

        Ok((
            FeedHandle {
                url,
                shutdown,
                status: status_rx,
                task: Some(task),
            },
            event_rx,
        ))
    }
}

/// Owner of a running feed connection.
///
/// The connection is released when the handle is closed or dropped.
#[derive(Debug)]
pub struct FeedHandle {
    url: String,
    shutdown: CancellationToken,
    status: watch::Receiver<FeedStatus>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// The endpoint this handle is connected to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current connection status.
    pub fn status(&self) -> FeedStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<FeedStatus> {
        self.status.clone()
    }

    /// Whether teardown has been requested.
    pub fn is_closing(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Close the connection and wait for the task to finish.
    pub async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(url = %self.url, error = %e, "Feed task ended abnormally");
            }
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Why a connected socket stopped pumping frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpOutcome {
    /// Teardown was requested or nobody is listening anymore.
    Shutdown,
    /// The remote closed or the transport failed.
    Disconnected,
}

async fn run_connection(
    config: FeedConfig,
    events: mpsc::Sender<FeedEvent>,
    status: watch::Sender<FeedStatus>,
    shutdown: CancellationToken,
) {
    loop {
        set_connection(&status, ConnectionStatus::Connecting);
        if events
            .send(FeedEvent::Status(ConnectionStatus::Connecting))
            .await
            .is_err()
        {
            break;
        }

        debug!(url = %config.url, "Connecting to race feed");
        let attempt = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            result = tokio_tungstenite::connect_async(config.url.as_str()) => result,
        };

        let outcome = match attempt {
            Ok((stream, _response)) => {
                info!(url = %config.url, "Race feed connected");
                status.send_modify(|s| {
                    s.connection = ConnectionStatus::Open;
                    s.transport_error = None;
                });
                if events
                    .send(FeedEvent::Status(ConnectionStatus::Open))
                    .await
                    .is_err()
                {
                    break;
                }
                pump(stream, &events, &status, &shutdown).await
            }
            Err(e) => {
                warn!(url = %config.url, error = %e, "Race feed connection failed");
                report_transport_error(&events, &status, e.to_string()).await
            }
        };

        set_connection(&status, ConnectionStatus::Closed);
        let _ = events.send(FeedEvent::Status(ConnectionStatus::Closed)).await;

        if outcome == PumpOutcome::Shutdown || !config.reconnect {
            break;
        }

        debug!(
            url = %config.url,
            delay_ms = config.reconnect_delay.as_millis() as u64,
            "Reconnecting to race feed after delay"
        );
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }

    set_connection(&status, ConnectionStatus::Closed);
    info!(url = %config.url, "Race feed closed");
}

async fn pump(
    stream: FeedSocket,
    events: &mpsc::Sender<FeedEvent>,
    status: &watch::Sender<FeedStatus>,
    shutdown: &CancellationToken,
) -> PumpOutcome {
    let (mut write, mut read) = stream.split();

    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return PumpOutcome::Shutdown;
            }
            frame = read.next() => frame,
        };

        let decoded = match frame {
            Some(Ok(Message::Text(text))) => decode_frame(&text),
            Some(Ok(Message::Binary(bytes))) => decode_binary(&bytes),
            Some(Ok(Message::Close(reason))) => {
                debug!(?reason, "Race feed closed by server");
                return PumpOutcome::Disconnected;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!(error = %e, "Race feed transport error");
                return report_transport_error(events, status, e.to_string()).await;
            }
            None => return PumpOutcome::Disconnected,
        };

        match decoded {
            Ok(message) => {
                if events.send(FeedEvent::Message(message)).await.is_err() {
                    return PumpOutcome::Shutdown;
                }
            }
            Err(e) => drop_malformed(e),
        }
    }
}

fn drop_malformed(error: ParseFailure) {
    debug!(error = %error, "Dropping malformed feed frame");
}

async fn report_transport_error(
    events: &mpsc::Sender<FeedEvent>,
    status: &watch::Sender<FeedStatus>,
    error: String,
) -> PumpOutcome {
    status.send_modify(|s| s.transport_error = Some(error.clone()));
    match events.send(FeedEvent::TransportError(error)).await {
        Ok(()) => PumpOutcome::Disconnected,
        Err(_) => PumpOutcome::Shutdown,
    }
}

fn set_connection(status: &watch::Sender<FeedStatus>, connection: ConnectionStatus) {
    status.send_if_modified(|s| {
        if s.connection == connection {
            false
        } else {
            s.connection = connection;
            true
        }
    });
}
