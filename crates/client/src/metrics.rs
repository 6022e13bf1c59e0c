//! Delivery counters for senders and the HTTP client
//!
//! Counters are updated from the event loop and read from any thread via
//! `snapshot()`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of one queued sender
#[derive(Debug, Default)]
pub struct SenderMetrics {
    /// Buffers accepted by `write`
    pub enqueued: AtomicU64,

    /// Buffers handed to the network successfully
    pub sent: AtomicU64,

    /// Bytes handed to the network successfully
    pub bytes_sent: AtomicU64,

    /// Failed or refused attempts (each is retried)
    pub failed_attempts: AtomicU64,

    /// Buffers dropped without being sent (queue overflow, oversize)
    pub discarded: AtomicU64,

    /// Connections re-established after a loss
    pub reconnects: AtomicU64,
}

impl SenderMetrics {
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            failed_attempts: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sent(&self, byte_count: u64) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failed(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> SenderMetricsSnapshot {
        SenderMetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sender metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderMetricsSnapshot {
    pub enqueued: u64,
    pub sent: u64,
    pub bytes_sent: u64,
    pub failed_attempts: u64,
    pub discarded: u64,
    pub reconnects: u64,
}

/// Counters of the HTTP client
#[derive(Debug, Default)]
pub struct HttpMetrics {
    pub requests: AtomicU64,
    /// Responses with a 2xx status
    pub responses_ok: AtomicU64,
    /// Responses with any other status
    pub responses_error: AtomicU64,
    /// Requests completed without a response
    pub failures: AtomicU64,
    pub connections_opened: AtomicU64,
    pub connections_closed: AtomicU64,
}

impl HttpMetrics {
    pub const fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            responses_ok: AtomicU64::new(0),
            responses_error: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_response(&self, success: bool) {
        if success {
            self.responses_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.responses_error.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> HttpMetricsSnapshot {
        HttpMetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            responses_ok: self.responses_ok.load(Ordering::Relaxed),
            responses_error: self.responses_error.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of HTTP client metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HttpMetricsSnapshot {
    pub requests: u64,
    pub responses_ok: u64,
    pub responses_error: u64,
    pub failures: u64,
    pub connections_opened: u64,
    pub connections_closed: u64,
}

impl HttpMetricsSnapshot {
    /// Connections currently open
    pub fn open_connections(&self) -> u64 {
        self.connections_opened
            .saturating_sub(self.connections_closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_snapshot() {
        let metrics = SenderMetrics::new();
        metrics.record_enqueued();
        metrics.record_enqueued();
        metrics.record_sent(120);
        metrics.record_failed();
        metrics.record_discarded();
        metrics.record_reconnect();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.enqueued, 2);
        assert_eq!(snapshot.sent, 1);
        assert_eq!(snapshot.bytes_sent, 120);
        assert_eq!(snapshot.failed_attempts, 1);
        assert_eq!(snapshot.discarded, 1);
        assert_eq!(snapshot.reconnects, 1);
    }

    #[test]
    fn test_http_snapshot_open_connections() {
        let metrics = HttpMetrics::new();
        metrics.record_opened();
        metrics.record_opened();
        metrics.record_closed();
        metrics.record_response(true);
        metrics.record_response(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.open_connections(), 1);
        assert_eq!(snapshot.responses_ok, 1);
        assert_eq!(snapshot.responses_error, 1);
    }
}
