//! Stream sender - newline-delimited documents over one TCP connection
//!
//! The worker only attempts a send while the link is connected; while it is
//! down the head of the queue waits in [`Channel::ready`]. A write that fails
//! because the peer reset or closed the connection marks the link down,
//! starts a background reconnect, and reports the attempt as failed so the
//! same bytes are retried once the link is back.
//!
//! Reconnects run on the reactor: connect (with timeout) and on failure
//! retry after `reconnect_interval`, forever. The first connect is started
//! when the sender is created.

use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::error::Result;
use crate::metrics::SenderMetrics;
use crate::queue::{Channel, QueuedSender, SendOutcome, SenderConfig};
use crate::rate_limited_logger::RateLimitedLogger;
use crate::reactor::{Reactor, Spawner};

/// Connection state shared by the worker and the reconnect task
struct Link {
    name: String,
    host: String,
    port: u16,
    config: SenderConfig,

    /// True while a connection is established (or waiting to be picked up)
    connected: watch::Sender<bool>,

    /// Freshly established connection, handed to the worker in `ready`
    fresh: Mutex<Option<TcpStream>>,

    /// A reconnect task is running
    reconnecting: AtomicBool,

    /// At least one connection was established before
    established: AtomicBool,

    metrics: Arc<SenderMetrics>,
    connect_failures: RateLimitedLogger,
}

impl Link {
    async fn connect(&self) -> io::Result<TcpStream> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        let stream = timeout(self.config.connect_timeout, connect)
            .await
            .map_err(|_| io::Error::new(ErrorKind::TimedOut, "connection timed out"))??;

        // Documents are small and latency matters more than batching
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(
                transport = %self.name,
                error = %e,
                "failed to set TCP_NODELAY, continuing with default buffering"
            );
        }

        if self.config.tcp_keepalive {
            let interval = self.config.tcp_keepalive_interval;
            let keepalive = TcpKeepalive::new().with_time(interval);

            #[cfg(target_os = "linux")]
            let keepalive = keepalive.with_interval(interval);

            if let Err(e) = SockRef::from(&stream).set_tcp_keepalive(&keepalive) {
                tracing::debug!(
                    transport = %self.name,
                    error = %e,
                    "failed to set TCP keep-alive, continuing without keep-alive"
                );
            }
        }

        Ok(stream)
    }
}

/// Keep connecting until it works, then hand the stream over
async fn reconnect(link: Arc<Link>) {
    loop {
        match link.connect().await {
            Ok(stream) => {
                *link.fresh.lock() = Some(stream);
                link.reconnecting.store(false, Ordering::Release);

                if link.established.swap(true, Ordering::AcqRel) {
                    link.metrics.record_reconnect();
                    tracing::info!(transport = %link.name, "reconnected to collector");
                } else {
                    tracing::info!(transport = %link.name, "connected to collector");
                }
                link.connect_failures.success();
                link.connected.send_replace(true);
                return;
            }
            Err(e) => {
                link.connect_failures.failure("connect failed", &e);
                tracing::debug!(
                    transport = %link.name,
                    error = %e,
                    retry_in_ms = link.config.reconnect_interval.as_millis() as u64,
                    "connect attempt failed"
                );
                tokio::time::sleep(link.config.reconnect_interval).await;
            }
        }
    }
}

/// True for errors meaning the peer is gone and the socket is unusable
fn is_connection_lost(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
            | ErrorKind::WriteZero
    )
}

pub(crate) struct StreamChannel {
    link: Arc<Link>,
    spawner: Spawner,
    connected: watch::Receiver<bool>,
    /// Connection owned by the worker
    stream: Option<TcpStream>,
}

impl StreamChannel {
    fn new(link: Arc<Link>, spawner: Spawner) -> Self {
        let connected = link.connected.subscribe();
        let channel = Self {
            link,
            spawner,
            connected,
            stream: None,
        };
        channel.start_reconnect();
        channel
    }

    fn start_reconnect(&self) {
        if self.link.reconnecting.swap(true, Ordering::AcqRel) {
            return;
        }
        self.spawner.spawn(reconnect(Arc::clone(&self.link)));
    }

    fn disconnect(&mut self, error: &io::Error) {
        self.stream = None;
        self.link.connected.send_replace(false);
        tracing::warn!(
            transport = %self.link.name,
            error = %error,
            "connection to collector lost, reconnecting"
        );
        self.start_reconnect();
    }
}

#[async_trait]
impl Channel for StreamChannel {
    async fn ready(&mut self) {
        while self.stream.is_none() {
            let fresh = self.link.fresh.lock().take();
            if fresh.is_some() {
                self.stream = fresh;
                return;
            }
            let up = *self.connected.borrow_and_update();
            let changed = if up {
                // Flag is up but the stream was already taken; wait for the next change
                self.connected.changed().await
            } else {
                self.connected.wait_for(|up| *up).await.map(|_| ())
            };
            if changed.is_err() {
                return;
            }
        }
    }

    async fn attempt_send(&mut self, buf: &[u8]) -> SendOutcome {
        let Some(stream) = self.stream.as_mut() else {
            return SendOutcome::Refused;
        };

        let result = async {
            stream.write_all(buf).await?;
            stream.flush().await
        }
        .await;

        match result {
            Ok(()) => SendOutcome::Sent,
            Err(e) if is_connection_lost(&e) => {
                self.disconnect(&e);
                SendOutcome::Failed(e)
            }
            Err(e) => SendOutcome::Failed(e),
        }
    }
}

impl QueuedSender {
    /// Stream sender delivering to `config.target`
    ///
    /// Starts connecting immediately; documents written before the
    /// connection is up wait in the queue.
    ///
    /// # Errors
    ///
    /// Returns error if the target or queue settings are invalid.
    pub fn tcp(reactor: &Reactor, config: SenderConfig) -> Result<Self> {
        let (host, port) = config.validate()?;
        let name = format!("tcp://{}", config.target);
        let metrics = Arc::new(SenderMetrics::new());

        let (connected, _) = watch::channel(false);
        let link = Arc::new(Link {
            name: name.clone(),
            host,
            port,
            connect_failures: RateLimitedLogger::new(name.clone(), config.log_interval),
            config: config.clone(),
            connected,
            fresh: Mutex::new(None),
            reconnecting: AtomicBool::new(false),
            established: AtomicBool::new(false),
            metrics: Arc::clone(&metrics),
        });

        let channel = StreamChannel::new(link, reactor.spawner());
        Ok(Self::with_channel(reactor, name, &config, metrics, channel))
    }
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod stream_test;
