//! Streaming client metrics.
//!
//! Provides atomic counters for monitoring the connection worker. The worker
//! is the only writer; any number of readers may take snapshots.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Metrics for one streaming client.
#[derive(Debug)]
pub struct WsMetrics {
    /// Transport open attempts (initial, manual and automatic).
    connect_attempts: AtomicU64,

    /// Attempts that reached the open state.
    connections_opened: AtomicU64,

    /// Open connections that were closed for any reason.
    connections_closed: AtomicU64,

    /// Reconnect timers armed.
    reconnects_scheduled: AtomicU64,

    /// Inbound data frames.
    frames_received: AtomicU64,

    /// Inbound frames dropped because they did not parse.
    malformed_frames: AtomicU64,

    /// Quote records written to the store.
    quotes_applied: AtomicU64,

    /// Outbound frames written to the socket.
    messages_sent: AtomicU64,

    /// Outbound messages dropped while not connected.
    sends_dropped: AtomicU64,

    /// Start time for rate calculation.
    start_time: Instant,
}

impl Default for WsMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl WsMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connect_attempts: AtomicU64::new(0),
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            reconnects_scheduled: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            malformed_frames: AtomicU64::new(0),
            quotes_applied: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            sends_dropped: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a transport open attempt.
    pub fn record_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a connection opened.
    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a connection closed.
    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an armed reconnect timer.
    pub fn record_reconnect_scheduled(&self) {
        self.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an inbound frame.
    pub fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a dropped malformed frame.
    pub fn record_malformed_frame(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a quote written to the store.
    pub fn record_quote_applied(&self) {
        self.quotes_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a message sent.
    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a send dropped while not connected.
    pub fn record_send_dropped(&self) {
        self.sends_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the total connect attempts.
    #[must_use]
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    /// Returns the total connections opened.
    #[must_use]
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    /// Returns the total connections closed.
    #[must_use]
    pub fn connections_closed(&self) -> u64 {
        self.connections_closed.load(Ordering::Relaxed)
    }

    /// Returns the total reconnect timers armed.
    #[must_use]
    pub fn reconnects_scheduled(&self) -> u64 {
        self.reconnects_scheduled.load(Ordering::Relaxed)
    }

    /// Returns the total frames received.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Returns the total malformed frames.
    #[must_use]
    pub fn malformed_frames(&self) -> u64 {
        self.malformed_frames.load(Ordering::Relaxed)
    }

    /// Returns the total quotes applied.
    #[must_use]
    pub fn quotes_applied(&self) -> u64 {
        self.quotes_applied.load(Ordering::Relaxed)
    }

    /// Returns the total messages sent.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Returns the total sends dropped.
    #[must_use]
    pub fn sends_dropped(&self) -> u64 {
        self.sends_dropped.load(Ordering::Relaxed)
    }

    /// Returns the uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns received frames per second.
    #[must_use]
    pub fn frames_per_second(&self) -> f64 {
        let elapsed = self.uptime().as_secs_f64();
        if elapsed > 0.0 {
            self.frames_received() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Returns a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> WsMetricsSnapshot {
        WsMetricsSnapshot {
            connect_attempts: self.connect_attempts(),
            connections_opened: self.connections_opened(),
            connections_closed: self.connections_closed(),
            reconnects_scheduled: self.reconnects_scheduled(),
            frames_received: self.frames_received(),
            malformed_frames: self.malformed_frames(),
            quotes_applied: self.quotes_applied(),
            messages_sent: self.messages_sent(),
            sends_dropped: self.sends_dropped(),
            uptime: self.uptime(),
            frames_per_second: self.frames_per_second(),
        }
    }
}

/// A point-in-time snapshot of client metrics.
#[derive(Debug, Clone)]
pub struct WsMetricsSnapshot {
    /// Connect attempts.
    pub connect_attempts: u64,
    /// Connections opened.
    pub connections_opened: u64,
    /// Connections closed.
    pub connections_closed: u64,
    /// Reconnect timers armed.
    pub reconnects_scheduled: u64,
    /// Frames received.
    pub frames_received: u64,
    /// Malformed frames dropped.
    pub malformed_frames: u64,
    /// Quotes applied.
    pub quotes_applied: u64,
    /// Messages sent.
    pub messages_sent: u64,
    /// Sends dropped while disconnected.
    pub sends_dropped: u64,
    /// Uptime.
    pub uptime: Duration,
    /// Frames per second.
    pub frames_per_second: f64,
}

impl fmt::Display for WsMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempts={} opened={} closed={} reconnects={} frames={} malformed={} quotes={} sent={} dropped={} uptime={:.1}s",
            self.connect_attempts,
            self.connections_opened,
            self.connections_closed,
            self.reconnects_scheduled,
            self.frames_received,
            self.malformed_frames,
            self.quotes_applied,
            self.messages_sent,
            self.sends_dropped,
            self.uptime.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = WsMetrics::new();
        assert_eq!(metrics.connect_attempts(), 0);
        assert_eq!(metrics.connections_opened(), 0);
        assert_eq!(metrics.sends_dropped(), 0);
    }

    #[test]
    fn test_metrics_record_connection_lifecycle() {
        let metrics = WsMetrics::default();

        metrics.record_connect_attempt();
        metrics.record_connect_attempt();
        metrics.record_connection_opened();
        metrics.record_connection_closed();
        metrics.record_reconnect_scheduled();

        assert_eq!(metrics.connect_attempts(), 2);
        assert_eq!(metrics.connections_opened(), 1);
        assert_eq!(metrics.connections_closed(), 1);
        assert_eq!(metrics.reconnects_scheduled(), 1);
    }

    #[test]
    fn test_metrics_record_frames() {
        let metrics = WsMetrics::new();

        metrics.record_frame_received();
        metrics.record_frame_received();
        metrics.record_malformed_frame();
        metrics.record_quote_applied();

        assert_eq!(metrics.frames_received(), 2);
        assert_eq!(metrics.malformed_frames(), 1);
        assert_eq!(metrics.quotes_applied(), 1);
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = WsMetrics::new();

        metrics.record_message_sent();
        metrics.record_send_dropped();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_sent, 1);
        assert_eq!(snapshot.sends_dropped, 1);
        assert!(snapshot.to_string().contains("dropped=1"));
    }
}
