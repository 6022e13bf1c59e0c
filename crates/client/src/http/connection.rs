//! One HTTP/1.1 connection, driven by its own task on the reactor
//!
//! ```text
//!   Connecting ──► Idle ──► SendingRequest ──► AwaitingHeaders ──► AwaitingBody
//!        │          ▲ │                                                 │
//!        │          │ └── peer closed / unexpected bytes ──┐            │
//!        │          └────────────── keep-alive ◄───────────┼────────────┤
//!        └──────── connect failed ────────────────────────►  Closing ◄──┘
//! ```
//!
//! Requests arrive over an unbounded channel that doubles as the backlog;
//! only one is in flight at a time. When the connection closes it is evicted
//! from the pool first, then the channel is closed and every request still
//! in it is failed, so no caller is ever handed a connection mid-teardown.
//!
//! A malformed response fails only its own request. The rest of that
//! response cannot be framed, so the connection is dropped anyway and its
//! backlog is handed back to the pool instead of being failed.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::codec::{BodyFraming, BodyReader, encode_request, parse_head};
use super::message::{Request, Response};
use super::pool::{ConnectionKey, PoolShared};
use crate::error::HttpError;
use crate::metrics::HttpMetrics;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Completion callback of one request
pub(crate) type Handler = Box<dyn FnOnce(Result<Response, HttpError>) + Send>;

/// A request waiting in a connection's backlog or in flight on it
///
/// The handler is invoked exactly once. A request dropped without being
/// completed (the reactor shut down) reports [`HttpError::Shutdown`].
pub(crate) struct PendingRequest {
    pub(crate) request: Request,
    handler: Option<Handler>,
}

impl PendingRequest {
    pub(crate) fn new(request: Request, handler: Handler) -> Self {
        Self {
            request,
            handler: Some(handler),
        }
    }

    pub(crate) fn complete(mut self, result: Result<Response, HttpError>) {
        if let Some(handler) = self.handler.take() {
            handler(result);
        }
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler(Err(HttpError::Shutdown));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Connecting,
    Idle,
    SendingRequest,
    AwaitingHeaders,
    AwaitingBody,
    Closing,
}

pub(crate) struct Connection {
    id: u64,
    key: ConnectionKey,
    keep_alive: bool,
    connect_timeout: Duration,
    user_agent: String,
    metrics: Arc<HttpMetrics>,
    pool: Weak<PoolShared>,
    rx: mpsc::UnboundedReceiver<PendingRequest>,
    state: State,
}

impl Connection {
    pub(crate) fn new(
        id: u64,
        key: ConnectionKey,
        pool: &Arc<PoolShared>,
        rx: mpsc::UnboundedReceiver<PendingRequest>,
    ) -> Self {
        let config = pool.config();
        Self {
            id,
            key,
            keep_alive: config.keep_alive,
            connect_timeout: config.connect_timeout,
            user_agent: config.user_agent.clone(),
            metrics: Arc::clone(pool.metrics()),
            pool: Arc::downgrade(pool),
            rx,
            state: State::Connecting,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut stream = match self.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::debug!(connection = self.id, error = %e, "connection could not be established");
                self.close_with(|| replicate(&e));
                return;
            }
        };
        self.metrics.record_opened();
        self.transition(State::Idle);

        let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
        let mut unframed = false;
        loop {
            let pending = tokio::select! {
                biased;
                next = self.rx.recv() => match next {
                    Some(pending) => pending,
                    None => break,
                },
                read = stream.read_buf(&mut buf) => {
                    match read {
                        Ok(0) => tracing::debug!(connection = self.id, "peer closed idle connection"),
                        Ok(n) => tracing::debug!(connection = self.id, bytes = n, "unexpected data on idle connection"),
                        Err(e) => tracing::debug!(connection = self.id, error = %e, "idle connection failed"),
                    }
                    break;
                }
            };

            match self.exchange(&mut stream, &mut buf, &pending.request).await {
                Ok((response, reusable)) => {
                    pending.complete(Ok(response));
                    if !reusable {
                        break;
                    }
                    self.transition(State::Idle);
                }
                Err(e) if e.is_protocol() => {
                    tracing::debug!(connection = self.id, error = %e, "malformed response");
                    pending.complete(Err(e));
                    unframed = true;
                    break;
                }
                Err(e) => {
                    tracing::debug!(connection = self.id, error = %e, "request failed");
                    pending.complete(Err(e));
                    break;
                }
            }
        }

        drop(stream);
        self.metrics.record_closed();
        if unframed {
            self.reroute_backlog();
        } else {
            self.close_with(|| HttpError::EndOfStream);
        }
    }

    async fn connect(&self) -> Result<TcpStream, HttpError> {
        let ConnectionKey { host, port } = &self.key;
        let addrs: Vec<SocketAddr> = lookup_host((host.as_str(), *port))
            .await
            .map_err(|source| HttpError::Resolve {
                host: host.clone(),
                source,
            })?
            .collect();
        if addrs.is_empty() {
            return Err(HttpError::Resolve {
                host: host.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "no addresses"),
            });
        }

        let mut last_error = None;
        for addr in addrs {
            match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    let _ = stream.set_nodelay(true);
                    tracing::debug!(connection = self.id, peer = %addr, "connection established");
                    return Ok(stream);
                }
                Ok(Err(e)) => last_error = Some(e),
                Err(_) => {
                    last_error = Some(io::Error::new(io::ErrorKind::TimedOut, "connect timed out"));
                }
            }
        }

        let source = last_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no address connected"));
        Err(HttpError::connect(self.key.to_string(), source))
    }

    /// Send one request and read its response
    ///
    /// Returns the response and whether the connection may carry another
    /// request.
    async fn exchange(
        &mut self,
        stream: &mut TcpStream,
        buf: &mut BytesMut,
        request: &Request,
    ) -> Result<(Response, bool), HttpError> {
        self.transition(State::SendingRequest);
        let wire = encode_request(request, self.keep_alive, &self.user_agent);
        stream.write_all(&wire).await?;

        self.transition(State::AwaitingHeaders);
        let head = loop {
            if let Some((head, used)) = parse_head(buf)? {
                buf.advance(used);
                break head;
            }
            if stream.read_buf(buf).await? == 0 {
                return Err(HttpError::EndOfStream);
            }
        };
        let framing = BodyFraming::for_response(&head)?;

        self.transition(State::AwaitingBody);
        let mut body = BodyReader::new(framing);
        while !body.feed(buf) {
            if stream.read_buf(buf).await? == 0 {
                let body = body.finish_on_eof()?;
                return Ok((head.into_response(body), false));
            }
        }

        let reusable = self.keep_alive && head.keep_alive(framing);
        tracing::trace!(
            connection = self.id,
            status = head.status.as_u16(),
            reusable,
            "response received"
        );
        Ok((head.into_response(body.into_body()), reusable))
    }

    /// Evict, stop accepting requests, fail the backlog
    fn close_with(&mut self, error: impl Fn() -> HttpError) {
        self.transition(State::Closing);
        if let Some(pool) = self.pool.upgrade() {
            pool.evict(&self.key, self.id);
        }
        self.rx.close();

        let mut failed = 0usize;
        while let Ok(pending) = self.rx.try_recv() {
            pending.complete(Err(error()));
            failed += 1;
        }
        tracing::debug!(connection = self.id, backlog_failed = failed, "connection closed");
    }

    /// Evict, stop accepting requests, move the backlog to a new connection
    fn reroute_backlog(&mut self) {
        self.transition(State::Closing);
        let pool = self.pool.upgrade();
        if let Some(pool) = &pool {
            pool.evict(&self.key, self.id);
        }
        self.rx.close();

        let mut moved = 0usize;
        while let Ok(pending) = self.rx.try_recv() {
            match &pool {
                Some(pool) => pool.dispatch(self.key.clone(), pending),
                // Client dropped; the request reports shutdown
                None => drop(pending),
            }
            moved += 1;
        }
        tracing::debug!(connection = self.id, backlog_moved = moved, "connection closed after malformed response");
    }

    fn transition(&mut self, next: State) {
        tracing::trace!(connection = self.id, from = ?self.state, to = ?next, "connection state");
        self.state = next;
    }
}

/// Copy of a connect-phase error for each request that was waiting on it
fn replicate(e: &HttpError) -> HttpError {
    let copy = |source: &io::Error| io::Error::new(source.kind(), source.to_string());
    match e {
        HttpError::Resolve { host, source } => HttpError::Resolve {
            host: host.clone(),
            source: copy(source),
        },
        HttpError::Connect { target, source } => HttpError::Connect {
            target: target.clone(),
            source: copy(source),
        },
        HttpError::Io(source) => HttpError::Io(copy(source)),
        _ => HttpError::EndOfStream,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replicate_keeps_kind_and_message() {
        let original = HttpError::connect(
            "collector:80",
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        );
        let copy = replicate(&original);
        assert_eq!(copy.to_string(), original.to_string());
        match copy {
            HttpError::Connect { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::ConnectionRefused);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_dropped_request_reports_shutdown() {
        let (tx, rx) = std::sync::mpsc::channel();
        let url = "http://collector/".parse().unwrap();
        let pending = PendingRequest::new(
            Request::get(url),
            Box::new(move |result| tx.send(result.is_err()).unwrap()),
        );
        drop(pending);
        assert_eq!(rx.try_recv(), Ok(true));
    }

    #[test]
    fn test_completed_request_handler_runs_once() {
        let (tx, rx) = std::sync::mpsc::channel();
        let url = "http://collector/".parse().unwrap();
        let pending = PendingRequest::new(
            Request::get(url),
            Box::new(move |result| tx.send(result.is_ok()).unwrap()),
        );
        pending.complete(Err(HttpError::EndOfStream));
        assert_eq!(rx.try_recv(), Ok(false));
        assert!(rx.try_recv().is_err());
    }
}
