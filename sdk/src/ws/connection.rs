//! Connection manager.
//!
//! Owns the socket, the in-flight connect attempt, the reconnect timer and
//! the heartbeat for one logical connection. It is driven by a single task:
//! the task awaits [`ConnectionManager::next_event`] and hands the result to
//! [`ConnectionManager::handle_event`] together with the registered
//! [`ConnectionHandler`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::config::WsConfig;
use super::error::WsError;
use super::messages::{ClientMessage, ServerMessage};
use super::metrics::WsMetrics;
use super::state::{ConnectionState, ConnectionStatus, RetryState};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ConnectFuture = Pin<Box<dyn Future<Output = Result<WsStream, WsError>> + Send>>;

/// Bound on flushing the close frame during a manual disconnect.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Receives connection lifecycle events and inbound messages.
pub trait ConnectionHandler: Send {
    /// Called once per successful open; returned messages are sent in order.
    fn on_connected(&mut self) -> Vec<ClientMessage>;

    /// Called whenever an open or opening connection goes away.
    fn on_disconnected(&mut self);

    /// Called for every well-formed inbound message.
    fn on_message(&mut self, message: ServerMessage);
}

/// Result of [`ConnectionManager::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Written to the socket.
    Sent,
    /// Dropped because the connection is not open.
    Dropped,
    /// The socket write failed.
    Failed,
}

/// Something the manager has to react to.
pub enum TransportEvent {
    /// The in-flight connect attempt finished.
    ConnectFinished(Result<WsStream, WsError>),
    /// The socket yielded a frame, an error, or ended (`None`).
    Frame(Option<Result<Message, tungstenite::Error>>),
    /// The reconnect timer fired.
    ReconnectDue,
    /// The heartbeat interval ticked.
    HeartbeatDue,
}

impl std::fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectFinished(Ok(_)) => write!(f, "ConnectFinished(Ok)"),
            Self::ConnectFinished(Err(e)) => write!(f, "ConnectFinished(Err({}))", e),
            Self::Frame(frame) => write!(f, "Frame({:?})", frame),
            Self::ReconnectDue => write!(f, "ReconnectDue"),
            Self::HeartbeatDue => write!(f, "HeartbeatDue"),
        }
    }
}

/// Single logical connection to the market-data server.
pub struct ConnectionManager {
    config: WsConfig,
    state: ConnectionState,
    retry: RetryState,
    reconnecting: bool,
    last_error: Option<String>,
    socket: Option<WsStream>,
    connecting: Option<ConnectFuture>,
    heartbeat: Option<Interval>,
    status_tx: watch::Sender<ConnectionStatus>,
    metrics: Arc<WsMetrics>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state)
            .field("retry", &self.retry)
            .field("reconnecting", &self.reconnecting)
            .field("last_error", &self.last_error)
            .field("connecting", &self.connecting.is_some())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Creates an idle manager publishing its status on `status_tx`.
    #[must_use]
    pub fn new(
        config: WsConfig,
        status_tx: watch::Sender<ConnectionStatus>,
        metrics: Arc<WsMetrics>,
    ) -> Self {
        let retry = RetryState::new(&config);
        Self {
            config,
            state: ConnectionState::Idle,
            retry,
            reconnecting: false,
            last_error: None,
            socket: None,
            connecting: None,
            heartbeat: None,
            status_tx,
            metrics,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the current status snapshot.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: self.state,
            reconnecting: self.reconnecting,
            attempt: self.retry.attempt(),
            last_error: self.last_error.clone(),
        }
    }

    /// Starts a connection attempt.
    ///
    /// No-op while connecting or open. Otherwise resets the attempt counter
    /// and cancels any pending reconnect.
    pub fn connect(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            debug!(state = %self.state, "connect ignored");
            return;
        }
        self.retry.reset();
        self.open_transport();
    }

    /// Closes the connection and stops reconnecting.
    pub async fn disconnect<H: ConnectionHandler>(&mut self, handler: &mut H) {
        let cancelled = self.retry.cancel();
        let aborted = self.connecting.take().is_some();
        self.heartbeat = None;
        self.reconnecting = false;

        if let Some(mut socket) = self.socket.take() {
            self.state = ConnectionState::Closing;
            self.publish();
            match tokio::time::timeout(CLOSE_TIMEOUT, socket.close(None)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "close frame not delivered"),
                Err(_) => debug!("close frame timed out"),
            }
            self.metrics.record_connection_closed();
        }

        self.state = ConnectionState::Closed;
        handler.on_disconnected();
        self.publish();
        info!(cancelled_reconnect = cancelled, aborted_connect = aborted, "disconnected");
    }

    /// Sends a message if the connection is open.
    pub async fn send(&mut self, message: &ClientMessage) -> SendOutcome {
        let socket = match self.socket.as_mut() {
            Some(socket) if self.state == ConnectionState::Open => socket,
            _ => {
                warn!(kind = message.kind(), state = %self.state, "not connected, dropping message");
                self.metrics.record_send_dropped();
                return SendOutcome::Dropped;
            }
        };

        let payload = match message.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(kind = message.kind(), error = %e, "failed to encode message");
                return SendOutcome::Failed;
            }
        };

        match socket.send(Message::Text(payload.into())).await {
            Ok(()) => {
                self.metrics.record_message_sent();
                debug!(kind = message.kind(), "sent");
                SendOutcome::Sent
            }
            Err(e) => {
                let err = WsError::from(e);
                warn!(kind = message.kind(), error = %err, "send failed");
                self.last_error = Some(WsError::SendFailed(err.to_string()).to_string());
                self.publish();
                SendOutcome::Failed
            }
        }
    }

    /// Waits for the next transport event.
    ///
    /// Pends forever while idle. Cancel safe: dropping the future loses no
    /// frame and leaves timers and the connect attempt in place.
    pub async fn next_event(&mut self) -> TransportEvent {
        tokio::select! {
            result = next_connect(&mut self.connecting) => TransportEvent::ConnectFinished(result),
            frame = next_frame(&mut self.socket) => TransportEvent::Frame(frame),
            () = self.retry.fired() => TransportEvent::ReconnectDue,
            () = next_tick(&mut self.heartbeat) => TransportEvent::HeartbeatDue,
        }
    }

    /// Reacts to one transport event.
    pub async fn handle_event<H: ConnectionHandler>(&mut self, event: TransportEvent, handler: &mut H) {
        match event {
            TransportEvent::ConnectFinished(Ok(socket)) => self.on_open(socket, handler).await,
            TransportEvent::ConnectFinished(Err(e)) => {
                warn!(error = %e, attempt = self.retry.attempt(), "connect failed");
                self.last_error = Some(e.to_string());
                self.on_abnormal_close(handler);
            }
            TransportEvent::Frame(Some(Ok(frame))) => self.on_frame(frame, handler),
            TransportEvent::Frame(Some(Err(e))) => {
                let err = WsError::from(e);
                warn!(error = %err, "stream error");
                self.last_error = Some(err.to_string());
                self.on_abnormal_close(handler);
            }
            TransportEvent::Frame(None) => {
                info!("stream ended");
                self.on_abnormal_close(handler);
            }
            TransportEvent::ReconnectDue => {
                info!(
                    attempt = self.retry.attempt(),
                    max = self.retry.max_attempts(),
                    "reconnecting"
                );
                self.open_transport();
            }
            TransportEvent::HeartbeatDue => {
                self.send(&ClientMessage::Ping).await;
            }
        }
    }

    fn open_transport(&mut self) {
        let url = self.config.endpoint_url();
        let timeout = self.config.connect_timeout;

        self.state = ConnectionState::Connecting;
        self.reconnecting = false;
        self.metrics.record_connect_attempt();
        debug!(url = %url, "opening transport");

        self.connecting = Some(Box::pin(async move {
            match tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url)).await {
                Ok(Ok((socket, _response))) => Ok(socket),
                Ok(Err(e)) => Err(WsError::Connection(e.to_string())),
                Err(_) => Err(WsError::Timeout),
            }
        }));
        self.publish();
    }

    async fn on_open<H: ConnectionHandler>(&mut self, socket: WsStream, handler: &mut H) {
        self.state = ConnectionState::Open;
        self.socket = Some(socket);
        self.retry.reset();
        self.reconnecting = false;
        self.last_error = None;
        self.heartbeat = self.config.heartbeat_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        self.metrics.record_connection_opened();
        self.publish();
        info!(client_id = %self.config.client_id, "connected");

        for message in handler.on_connected() {
            self.send(&message).await;
        }
    }

    fn on_frame<H: ConnectionHandler>(&mut self, frame: Message, handler: &mut H) {
        match frame {
            Message::Text(text) => {
                self.metrics.record_frame_received();
                match ServerMessage::parse(&text) {
                    Ok(message) => handler.on_message(message),
                    Err(e) => {
                        self.metrics.record_malformed_frame();
                        warn!(error = %e, "dropping malformed frame");
                    }
                }
            }
            Message::Binary(data) => {
                self.metrics.record_frame_received();
                self.metrics.record_malformed_frame();
                warn!(len = data.len(), "dropping binary frame");
            }
            Message::Close(frame) => {
                info!(frame = ?frame, "server closed connection");
                self.on_abnormal_close(handler);
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }

    fn on_abnormal_close<H: ConnectionHandler>(&mut self, handler: &mut H) {
        if self.socket.take().is_some() {
            self.metrics.record_connection_closed();
        }
        self.connecting = None;
        self.heartbeat = None;
        self.state = ConnectionState::Closed;
        handler.on_disconnected();
        self.schedule_reconnect();
        self.publish();
    }

    fn schedule_reconnect(&mut self) {
        if !self.config.auto_reconnect {
            self.reconnecting = false;
            return;
        }

        match self.retry.schedule() {
            Some(delay) => {
                self.reconnecting = true;
                self.metrics.record_reconnect_scheduled();
                info!(
                    attempt = self.retry.attempt() + 1,
                    max = self.retry.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "scheduling reconnect"
                );
            }
            None => {
                self.reconnecting = false;
                let attempts = self.retry.max_attempts();
                self.last_error.get_or_insert_with(|| {
                    format!("reconnect attempts exhausted after {} tries", attempts)
                });
                warn!(attempts, "giving up on reconnect");
            }
        }
    }

    fn publish(&self) {
        let next = self.status();
        self.status_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

async fn next_connect(slot: &mut Option<ConnectFuture>) -> Result<WsStream, WsError> {
    match slot {
        Some(attempt) => {
            let result = attempt.as_mut().await;
            *slot = None;
            result
        }
        None => std::future::pending().await,
    }
}

async fn next_frame(socket: &mut Option<WsStream>) -> Option<Result<Message, tungstenite::Error>> {
    match socket {
        Some(socket) => socket.next().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
