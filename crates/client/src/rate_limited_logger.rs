//! Rate-limited failure logging
//!
//! During a collector outage every frame produces a failed attempt. Logging
//! each one would flood the log, so failures are logged at most once per
//! interval with a count of what was suppressed in between. The first
//! success after a failure streak is logged once at `info`.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use framecast_client::RateLimitedLogger;
//!
//! let logger = RateLimitedLogger::new("tcp://collector:5500", Duration::from_secs(10));
//! let error = std::io::Error::other("connection refused");
//!
//! assert!(logger.failure("send failed", &error));
//! assert!(!logger.failure("send failed", &error));
//! ```

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between two logged failures
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Rate-limited logger for one transport
///
/// Thread-safe: atomic counters plus a mutex for the last log time.
pub struct RateLimitedLogger {
    /// Transport the failures belong to
    subject: String,

    /// Minimum interval between log messages
    min_interval: Duration,

    /// Last time we logged
    last_log_time: Mutex<Option<Instant>>,

    /// Failures since the last logged one
    pending: AtomicU64,

    /// Failures since the last success
    streak: AtomicU64,

    /// Failures ever recorded
    total: AtomicU64,
}

impl RateLimitedLogger {
    pub fn new(subject: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            subject: subject.into(),
            min_interval,
            last_log_time: Mutex::new(None),
            pending: AtomicU64::new(0),
            streak: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Logger with the default interval (10 seconds)
    pub fn with_default_interval(subject: impl Into<String>) -> Self {
        Self::new(subject, DEFAULT_LOG_INTERVAL)
    }

    /// Record a failure and log it if the interval has passed
    ///
    /// Returns true if the failure was logged, false if it was suppressed.
    pub fn failure(&self, message: &str, error: &dyn Display) -> bool {
        self.pending.fetch_add(1, Ordering::Relaxed);
        self.streak.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        if !self.should_log() {
            return false;
        }

        let count = self.pending.swap(0, Ordering::Relaxed);
        let total = self.total.load(Ordering::Relaxed);

        if count > 1 {
            tracing::warn!(
                transport = %self.subject,
                error = %error,
                suppressed_count = count - 1,
                total_failures = total,
                "{message} (rate-limited)"
            );
        } else {
            tracing::warn!(
                transport = %self.subject,
                error = %error,
                total_failures = total,
                "{message}"
            );
        }
        true
    }

    /// Record a success, logging recovery if a failure streak just ended
    ///
    /// Returns the length of the streak that ended (0 if there was none).
    pub fn success(&self) -> u64 {
        let streak = self.streak.swap(0, Ordering::Relaxed);
        if streak > 0 {
            self.pending.store(0, Ordering::Relaxed);
            *self.last_log_time.lock() = None;
            tracing::info!(
                transport = %self.subject,
                failed_attempts = streak,
                "delivery resumed"
            );
        }
        streak
    }

    fn should_log(&self) -> bool {
        let mut last_time = self.last_log_time.lock();
        let now = Instant::now();

        match *last_time {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                *last_time = Some(now);
                true
            }
        }
    }

    /// Failures recorded since the last logged one
    pub fn pending_count(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    /// Failures ever recorded
    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn refused() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused")
    }

    #[test]
    fn test_first_failure_always_logs() {
        let logger = RateLimitedLogger::new("udp://127.0.0.1:5500", Duration::from_secs(10));

        assert!(logger.failure("send failed", &refused()));
        assert_eq!(logger.total_count(), 1);
        assert_eq!(logger.pending_count(), 0);
    }

    #[test]
    fn test_rapid_failures_suppressed() {
        let logger = RateLimitedLogger::new("udp://127.0.0.1:5500", Duration::from_secs(10));

        assert!(logger.failure("send failed", &refused()));
        for _ in 0..10 {
            assert!(!logger.failure("send failed", &refused()));
        }

        assert_eq!(logger.total_count(), 11);
        assert_eq!(logger.pending_count(), 10);
    }

    #[test]
    fn test_zero_interval_logs_every_failure() {
        let logger = RateLimitedLogger::new("t", Duration::ZERO);
        assert!(logger.failure("a", &refused()));
        assert!(logger.failure("b", &refused()));
    }

    #[test]
    fn test_success_ends_streak_and_rearms_logging() {
        let logger = RateLimitedLogger::new("t", Duration::from_secs(10));

        logger.failure("send failed", &refused());
        logger.failure("send failed", &refused());
        assert_eq!(logger.success(), 2);
        assert_eq!(logger.success(), 0);

        // Next outage is reported immediately
        assert!(logger.failure("send failed", &refused()));
        assert_eq!(logger.total_count(), 3);
    }

    #[test]
    fn test_default_interval() {
        let logger = RateLimitedLogger::with_default_interval("t");
        assert_eq!(logger.min_interval, DEFAULT_LOG_INTERVAL);
        assert_eq!(logger.subject(), "t");
    }
}
