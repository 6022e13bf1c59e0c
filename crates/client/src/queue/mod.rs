//! Queued sender - FIFO delivery with one attempt in flight
//!
//! The frame-processing thread calls [`QueuedSender::enqueue`], which copies
//! the bytes into the queue and wakes the worker. A single worker task on the
//! reactor owns the head of the queue and hands it to a [`Channel`]:
//!
//! ```text
//!   enqueue ──► [ head | b2 | b3 | ... ] ──► worker ──► Channel::attempt_send
//!                  ▲                            │
//!                  └──── retry after backoff ◄──┘ (Failed / Refused)
//! ```
//!
//! The head is only removed after `Sent` or an explicit `Discard`; on
//! failure the same bytes are attempted again after the backoff delay. When
//! the queue is full the oldest buffer that is *not* the head is dropped and
//! counted.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::backoff::{Backoff, BackoffPolicy, RETRY_FLOOR};
use crate::error::{Result, TransportError};
use crate::metrics::{SenderMetrics, SenderMetricsSnapshot};
use crate::rate_limited_logger::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};
use crate::reactor::Reactor;
use crate::transport::{Transport, split_host_port};

/// Default bound on queued buffers per sender
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Port used when a target omits one
pub const DEFAULT_COLLECTOR_PORT: u16 = 5500;

/// Configuration for a queued sender
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Collector address (`host:port`)
    pub target: String,

    /// Maximum number of buffers waiting for delivery
    pub queue_capacity: usize,

    /// Retry delays after failed attempts
    pub backoff: BackoffPolicy,

    /// Wait between reconnect attempts (stream only)
    pub reconnect_interval: Duration,

    /// Connect timeout (stream only)
    pub connect_timeout: Duration,

    /// TCP keep-alive enabled (stream only)
    pub tcp_keepalive: bool,

    /// TCP keep-alive interval (stream only)
    pub tcp_keepalive_interval: Duration,

    /// Minimum interval between two logged failures
    pub log_interval: Duration,
}

impl SenderConfig {
    /// Defaults for datagram delivery: retries held at the 250ms floor
    pub fn udp(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            backoff: BackoffPolicy::fixed(RETRY_FLOOR),
            reconnect_interval: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            tcp_keepalive: false,
            tcp_keepalive_interval: Duration::from_secs(30),
            log_interval: DEFAULT_LOG_INTERVAL,
        }
    }

    /// Defaults for stream delivery: retries doubling up to 5s
    pub fn tcp(target: impl Into<String>) -> Self {
        Self {
            backoff: BackoffPolicy::exponential(RETRY_FLOOR, Duration::from_secs(5)),
            tcp_keepalive: true,
            ..Self::udp(target)
        }
    }

    /// Set queue capacity
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set retry backoff policy
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set reconnect interval
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Set connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable TCP keep-alive
    #[must_use]
    pub fn with_tcp_keepalive(mut self, enabled: bool) -> Self {
        self.tcp_keepalive = enabled;
        self
    }

    /// Set failure log interval
    #[must_use]
    pub fn with_log_interval(mut self, interval: Duration) -> Self {
        self.log_interval = interval;
        self
    }

    /// Check the settings and split the target into host and port
    pub(crate) fn validate(&self) -> Result<(String, u16)> {
        if self.queue_capacity == 0 {
            return Err(TransportError::InvalidConfig {
                field: "queue_capacity",
                reason: "must be at least 1",
            });
        }
        split_host_port(&self.target, DEFAULT_COLLECTOR_PORT)
            .ok_or_else(|| TransportError::invalid_target(&self.target, "expected host:port"))
    }
}

/// Result of one transmission attempt
#[derive(Debug)]
pub enum SendOutcome {
    /// Bytes were accepted by the network stack
    Sent,
    /// The channel cannot send right now (e.g. not connected)
    Refused,
    /// The attempt failed; the same bytes will be retried
    Failed(io::Error),
    /// The bytes can never be sent and are dropped
    Discard(&'static str),
}

/// A wire that the queued sender drives
#[async_trait]
pub trait Channel: Send + 'static {
    /// Wait until an attempt can be made
    ///
    /// Connection-oriented channels suspend here while disconnected.
    async fn ready(&mut self) {}

    /// Make one transmission attempt with the head of the queue
    async fn attempt_send(&mut self, buf: &[u8]) -> SendOutcome;
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Bytes>,
    /// The worker owns the head (attempt or retry in progress)
    pending: bool,
}

/// What happened to a buffer pushed onto a bounded queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pushed {
    Queued,
    /// The oldest buffer not in flight made room
    DroppedOldest,
    /// Only the in-flight head is queued; the newcomer was dropped
    DroppedNew,
}

impl QueueState {
    fn push(&mut self, buf: Bytes, capacity: usize) -> Pushed {
        let mut pushed = Pushed::Queued;
        if self.items.len() >= capacity {
            let victim = usize::from(self.pending);
            if self.items.remove(victim).is_none() {
                return Pushed::DroppedNew;
            }
            pushed = Pushed::DroppedOldest;
        }
        self.items.push_back(buf);
        pushed
    }

    /// Release the head once the worker is done with it
    fn pop_head(&mut self) {
        self.items.pop_front();
        self.pending = false;
    }
}

struct Shared {
    state: Mutex<QueueState>,
    /// Signalled when the queue drains
    idle: Condvar,
    /// Wakes the worker after an enqueue
    wake: Notify,
    capacity: usize,
    metrics: Arc<SenderMetrics>,
    failures: RateLimitedLogger,
    overflow: RateLimitedLogger,
}

/// FIFO sender with one attempt in flight and retry on failure
///
/// Dropping the sender stops its worker; undelivered buffers are lost. The
/// sender keeps its reactor alive.
pub struct QueuedSender {
    name: String,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    /// Keeps the event loop running while the sender exists
    _reactor: Reactor,
}

impl QueuedSender {
    /// Start a sender driving `channel` on the reactor
    pub fn with_channel<C: Channel>(
        reactor: &Reactor,
        name: impl Into<String>,
        config: &SenderConfig,
        metrics: Arc<SenderMetrics>,
        channel: C,
    ) -> Self {
        let name = name.into();
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            idle: Condvar::new(),
            wake: Notify::new(),
            capacity: config.queue_capacity.max(1),
            metrics,
            failures: RateLimitedLogger::new(name.clone(), config.log_interval),
            overflow: RateLimitedLogger::new(name.clone(), config.log_interval),
        });

        let worker = Worker {
            name: name.clone(),
            shared: Arc::clone(&shared),
            channel,
            backoff: Backoff::new(config.backoff),
        };
        let cancel = reactor.spawner().child_token();
        let token = cancel.clone();
        reactor.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = worker.run() => {}
            }
        });

        tracing::debug!(
            transport = %name,
            queue_capacity = shared.capacity,
            "sender started"
        );

        Self {
            name,
            shared,
            cancel,
            _reactor: reactor.clone(),
        }
    }

    /// Copy `data` into the queue and wake the worker
    ///
    /// Never blocks on I/O. When the queue is full the oldest buffer that is
    /// not currently being attempted is discarded.
    pub fn enqueue(&self, data: &[u8]) {
        let buf = Bytes::copy_from_slice(data);
        self.shared.metrics.record_enqueued();

        let pushed = self.shared.state.lock().push(buf, self.shared.capacity);
        if pushed != Pushed::Queued {
            self.overflowed();
        }
        if pushed != Pushed::DroppedNew {
            self.shared.wake.notify_one();
        }
    }

    fn overflowed(&self) {
        self.shared.metrics.record_discarded();
        self.shared.overflow.failure(
            "send queue full, discarding oldest buffer",
            &format!("capacity {}", self.shared.capacity),
        );
    }

    /// Buffers waiting for delivery, including the one in flight
    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> SenderMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Block until the queue is empty and nothing is in flight
    ///
    /// Returns false if `timeout` passed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !state.items.is_empty() || state.pending {
            if self.shared.idle.wait_until(&mut state, deadline).timed_out() {
                return state.items.is_empty() && !state.pending;
            }
        }
        true
    }
}

impl Transport for QueuedSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, data: &[u8]) {
        self.enqueue(data);
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        QueuedSender::wait_idle(self, timeout)
    }
}

impl Drop for QueuedSender {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for QueuedSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedSender")
            .field("name", &self.name)
            .field("queued", &self.len())
            .finish()
    }
}

struct Worker<C> {
    name: String,
    shared: Arc<Shared>,
    channel: C,
    backoff: Backoff,
}

impl<C: Channel> Worker<C> {
    async fn run(mut self) {
        loop {
            let head = next_head(&self.shared).await;
            self.channel.ready().await;

            match self.channel.attempt_send(&head).await {
                SendOutcome::Sent => {
                    self.pop_head();
                    self.shared.metrics.record_sent(head.len() as u64);
                    self.shared.failures.success();
                    self.backoff.reset();
                    tracing::trace!(transport = %self.name, bytes = head.len(), "buffer sent");
                }
                SendOutcome::Discard(reason) => {
                    self.pop_head();
                    self.shared.metrics.record_discarded();
                    tracing::warn!(
                        transport = %self.name,
                        bytes = head.len(),
                        reason,
                        "buffer discarded"
                    );
                }
                SendOutcome::Refused => {
                    self.shared.metrics.record_failed();
                    let delay = self.backoff.next_delay();
                    tracing::debug!(
                        transport = %self.name,
                        retry_in_ms = delay.as_millis() as u64,
                        "channel not ready, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                SendOutcome::Failed(e) => {
                    self.shared.metrics.record_failed();
                    self.shared.failures.failure("send failed", &e);
                    let delay = self.backoff.next_delay();
                    tracing::debug!(
                        transport = %self.name,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "send attempt failed"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn pop_head(&self) {
        let mut state = self.shared.state.lock();
        state.pop_head();
        if state.items.is_empty() {
            self.shared.idle.notify_all();
        }
    }
}

/// Take ownership of the head, waiting for an enqueue if the queue is empty
async fn next_head(shared: &Shared) -> Bytes {
    loop {
        {
            let mut state = shared.state.lock();
            if let Some(head) = state.items.front().cloned() {
                state.pending = true;
                return head;
            }
            state.pending = false;
            shared.idle.notify_all();
        }
        shared.wake.notified().await;
    }
}
