//! Framecast Client Library
//!
//! Transports that carry per-frame telemetry documents to a collector
//! without blocking the frame loop.
//!
//! # Architecture
//!
//! Every transport runs on a shared [`Reactor`] (one event loop, usually on
//! its own thread) and implements [`Transport`]:
//!
//! - [`QueuedSender`] - FIFO queue with one attempt in flight and backoff
//!   retry, over a [`Channel`]:
//!   - [`QueuedSender::udp`] - one datagram per document
//!   - [`QueuedSender::tcp`] - newline-delimited stream with reconnect
//! - [`http::PostTarget`] - POST per document through [`http::HttpClient`],
//!   an HTTP/1.1 client with per-destination connection reuse
//!
//! # Quick Start
//!
//! ```no_run
//! use framecast_client::{QueuedSender, Reactor, SenderConfig, Transport};
//!
//! let reactor = Reactor::start().unwrap();
//! let sender = QueuedSender::tcp(&reactor, SenderConfig::tcp("collector:5500")).unwrap();
//!
//! sender.write(b"{\"frame\":{}}\n");
//! sender.wait_idle(std::time::Duration::from_secs(1));
//! ```

pub mod backoff;
pub mod datagram;
pub mod error;
pub mod http;
pub mod metrics;
pub mod queue;
pub mod rate_limited_logger;
pub mod reactor;
pub mod stream;
pub mod transport;

pub use backoff::{Backoff, BackoffPolicy, RETRY_FLOOR};
pub use datagram::MAX_DATAGRAM_SIZE;
pub use error::{HttpError, Result, TransportError, UrlError};
pub use metrics::{HttpMetrics, HttpMetricsSnapshot, SenderMetrics, SenderMetricsSnapshot};
pub use queue::{
    Channel, DEFAULT_COLLECTOR_PORT, DEFAULT_QUEUE_CAPACITY, QueuedSender, SendOutcome,
    SenderConfig,
};
pub use rate_limited_logger::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};
pub use reactor::{REACTOR_THREAD_NAME, Reactor};
pub use transport::{Transport, split_host_port};

// Re-export for implementors of `Channel`
pub use async_trait::async_trait;
