//! Connection state and retry bookkeeping.
//!
//! Both types are owned by the connection worker; observers only ever see
//! [`ConnectionStatus`] snapshots.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::Sleep;

use super::config::{ReconnectPolicy, WsConfig};

/// Lifecycle state of the single logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Never connected.
    #[default]
    Idle,
    /// Transport open in flight.
    Connecting,
    /// Transport open; frames flow.
    Open,
    /// Close frame being sent after a manual disconnect.
    Closing,
    /// Not connected; see [`ConnectionStatus::reconnecting`].
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Observable snapshot of the connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    /// Current lifecycle state.
    pub state: ConnectionState,

    /// True while `Closed` with a reconnect timer pending. Cleared once the
    /// attempt moves to `Connecting`.
    pub reconnecting: bool,

    /// Consecutive reconnect attempts since the last successful open.
    pub attempt: u32,

    /// Most recent transport error, cleared on a successful open.
    pub last_error: Option<String>,
}

impl ConnectionStatus {
    /// Returns true if the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Returns true if the client is closed with no reconnect pending.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state == ConnectionState::Closed && !self.reconnecting
    }
}

/// Reconnect attempt counter and the pending reconnect timer.
#[derive(Debug)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
    interval: Duration,
    policy: ReconnectPolicy,
    timer: Option<Pin<Box<Sleep>>>,
}

impl RetryState {
    /// Creates retry state from the client configuration.
    #[must_use]
    pub fn new(config: &WsConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_reconnect_attempts,
            interval: config.reconnect_interval,
            policy: config.reconnect_policy,
            timer: None,
        }
    }

    /// Returns the consecutive attempt count.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the attempt cap.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true if a reconnect timer is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.timer.is_some()
    }

    /// Returns true if the attempt budget is used up.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Zeroes the attempt counter and cancels any pending timer.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.cancel();
    }

    /// Cancels the pending timer. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        self.timer.take().is_some()
    }

    /// Arms the reconnect timer unless the budget is exhausted.
    ///
    /// Returns the delay that was armed. Must be called inside a tokio
    /// runtime.
    pub fn schedule(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            self.timer = None;
            return None;
        }
        let delay = self.policy.delay(self.interval, self.attempt);
        self.timer = Some(Box::pin(tokio::time::sleep(delay)));
        Some(delay)
    }

    /// Waits for the pending timer, then counts the attempt.
    ///
    /// Pends forever when no timer is armed. Cancel safe.
    pub async fn fired(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.as_mut().await;
                self.timer = None;
                self.attempt = self.attempt.saturating_add(1);
            }
            None => std::future::pending().await,
        }
    }
}
