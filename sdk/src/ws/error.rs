//! WebSocket error types.
//!
//! Provides error types for streaming client operations. Transport failures
//! inside the worker are never returned to callers; they are surfaced through
//! the connection status instead.

use std::fmt;

use crate::error::SdkError;

/// WebSocket errors.
#[derive(Debug)]
pub enum WsError {
    /// Connection failed.
    Connection(String),

    /// WebSocket protocol error.
    Protocol(String),

    /// Failed to serialize message.
    Serialization(String),

    /// Failed to deserialize message.
    Deserialization(String),

    /// Connect attempt exceeded the configured timeout.
    Timeout,

    /// The client worker has stopped.
    Closed,

    /// Invalid symbol passed to a subscription call.
    InvalidSymbol(SdkError),

    /// Invalid configuration.
    InvalidConfig(String),

    /// Send failed.
    SendFailed(String),

    /// No tokio runtime to spawn the worker on.
    Runtime(String),
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "connection failed: {}", msg),
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Self::Serialization(msg) => write!(f, "serialization failed: {}", msg),
            Self::Deserialization(msg) => write!(f, "deserialization failed: {}", msg),
            Self::Timeout => write!(f, "connect timed out"),
            Self::Closed => write!(f, "client closed"),
            Self::InvalidSymbol(err) => write!(f, "{}", err),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Self::SendFailed(msg) => write!(f, "send failed: {}", msg),
            Self::Runtime(msg) => write!(f, "runtime error: {}", msg),
        }
    }
}

impl std::error::Error for WsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidSymbol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for WsError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<SdkError> for WsError {
    fn from(err: SdkError) -> Self {
        Self::InvalidSymbol(err)
    }
}

impl From<serde_json::Error> for WsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialization(err.to_string())
    }
}
