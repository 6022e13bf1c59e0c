//! Connection pool and client facade
//!
//! Callers never hold connections. [`HttpClient::submit`] looks up the live
//! connection for the request's `(host, port)` and appends the request to its
//! backlog, or opens a new connection. With reuse disabled every request gets
//! a throwaway connection that is never pooled.
//!
//! The map is only touched under its mutex, and a closing connection evicts
//! itself under the same lock before it stops accepting requests. A submit
//! that races with teardown sees the closed backlog and opens a fresh
//! connection instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::{mpsc, oneshot};

use super::codec::DEFAULT_USER_AGENT;
use super::connection::{Connection, Handler, PendingRequest};
use super::message::{Request, Response};
use super::url::Scheme;
use crate::error::HttpError;
use crate::metrics::{HttpMetrics, HttpMetricsSnapshot};
use crate::reactor::{Reactor, Spawner};

/// Identity of a reusable connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Reuse one connection per `(host, port)` for sequential requests
    pub keep_alive: bool,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// `user-agent` sent when a request sets none
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl HttpConfig {
    /// Enable or disable connection reuse
    #[must_use]
    pub fn with_keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    /// Set connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set default user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

struct PooledConnection {
    id: u64,
    tx: mpsc::UnboundedSender<PendingRequest>,
}

/// State shared between the client and its connection tasks
pub(crate) struct PoolShared {
    config: HttpConfig,
    connections: Mutex<HashMap<ConnectionKey, PooledConnection>>,
    next_id: AtomicU64,
    metrics: Arc<HttpMetrics>,
    spawner: Spawner,
}

impl PoolShared {
    pub(crate) fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub(crate) fn metrics(&self) -> &Arc<HttpMetrics> {
        &self.metrics
    }

    /// Remove the pool entry for `key` if it still belongs to connection `id`
    pub(crate) fn evict(&self, key: &ConnectionKey, id: u64) {
        let mut connections = self.connections.lock();
        if connections.get(key).is_some_and(|c| c.id == id) {
            connections.remove(key);
            tracing::debug!(connection = id, key = %key, "connection evicted from pool");
        }
    }

    /// Hand `pending` to the connection for `key`, opening one if needed
    pub(crate) fn dispatch(self: &Arc<Self>, key: ConnectionKey, pending: PendingRequest) {
        if !self.config.keep_alive {
            let (_, tx) = self.open(key);
            // A closed channel means the reactor is gone; dropping the
            // request reports that to its handler
            let _ = tx.send(pending);
            return;
        }

        let mut connections = self.connections.lock();
        let pending = match connections.get(&key) {
            Some(conn) => match conn.tx.send(pending) {
                Ok(()) => return,
                Err(mpsc::error::SendError(pending)) => {
                    // Closing, but not evicted yet
                    connections.remove(&key);
                    pending
                }
            },
            None => pending,
        };

        let (id, tx) = self.open(key.clone());
        let rejected = tx.send(pending).err();
        connections.insert(key, PooledConnection { id, tx });
        drop(connections);

        // Completed with a shutdown error outside the lock
        drop(rejected);
    }

    /// Spawn a connection task and return its id and backlog
    fn open(self: &Arc<Self>, key: ConnectionKey) -> (u64, mpsc::UnboundedSender<PendingRequest>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        tracing::debug!(connection = id, key = %key, "opening connection");

        let connection = Connection::new(id, key, self, rx);
        self.spawner.spawn(connection.run());
        (id, tx)
    }
}

/// Requests submitted but not yet completed
#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn begin(&self) {
        *self.count.lock() += 1;
    }

    fn end(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// HTTP/1.1 client with a per-destination connection pool
///
/// Cloning is not supported; share it behind an `Arc`. Requests complete on
/// the reactor thread through their handler.
pub struct HttpClient {
    shared: Arc<PoolShared>,
    in_flight: Arc<InFlight>,
    /// Keeps the event loop running while the client exists
    _reactor: Reactor,
}

impl HttpClient {
    pub fn new(reactor: &Reactor, config: HttpConfig) -> Self {
        tracing::debug!(
            keep_alive = config.keep_alive,
            connect_timeout_ms = config.connect_timeout.as_millis() as u64,
            "http client created"
        );
        Self {
            shared: Arc::new(PoolShared {
                config,
                connections: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                metrics: Arc::new(HttpMetrics::new()),
                spawner: reactor.spawner(),
            }),
            in_flight: Arc::new(InFlight::default()),
            _reactor: reactor.clone(),
        }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.shared.config
    }

    /// Send `request` and call `handler` with the outcome
    ///
    /// Never blocks. The handler runs exactly once, on the reactor, with
    /// either the response or the reason there is none (resolve or connect
    /// failure, connection lost, malformed response, https).
    pub fn submit<F>(&self, request: Request, handler: F)
    where
        F: FnOnce(Result<Response, HttpError>) + Send + 'static,
    {
        self.shared.metrics.record_request();
        self.in_flight.begin();

        let metrics = Arc::clone(&self.shared.metrics);
        let in_flight = Arc::clone(&self.in_flight);
        let handler: Handler = Box::new(move |result| {
            match &result {
                Ok(response) => metrics.record_response(response.is_success()),
                Err(_) => metrics.record_failure(),
            }
            handler(result);
            in_flight.end();
        });

        let scheme = request.url.scheme();
        let key = ConnectionKey {
            host: request.url.host().to_owned(),
            port: request.url.port_or_infer(),
        };
        let pending = PendingRequest::new(request, handler);

        if scheme == Scheme::Https {
            self.shared
                .spawner
                .spawn(async move { pending.complete(Err(HttpError::TlsUnsupported)) });
            return;
        }

        self.shared.dispatch(key, pending);
    }

    /// Send `request` and wait for the outcome
    pub async fn request(&self, request: Request) -> Result<Response, HttpError> {
        let (tx, rx) = oneshot::channel();
        self.submit(request, move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap_or(Err(HttpError::Shutdown))
    }

    /// Live pooled connections
    pub fn connection_count(&self) -> usize {
        self.shared.connections.lock().len()
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> HttpMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Block until every submitted request has completed
    ///
    /// Returns false if `timeout` passed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.in_flight.count.lock();
        while *count > 0 {
            if self.in_flight.idle.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("keep_alive", &self.shared.config.keep_alive)
            .field("connections", &self.connection_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;
