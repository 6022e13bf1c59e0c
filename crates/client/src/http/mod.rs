//! HTTP/1.1 client engine
//!
//! A practical subset of HTTP/1.1 for posting telemetry:
//!
//! - [`url`] and [`headers`] model what goes on the request line and in the
//!   header block
//! - [`codec`] encodes requests and parses responses without doing I/O
//! - `connection` runs one socket through its request/response states
//! - [`pool`] hands requests to one connection per `(host, port)`
//! - [`target`] wraps the client as a [`Transport`](crate::Transport)

pub mod codec;
mod connection;
pub mod headers;
pub mod message;
pub mod pool;
pub mod target;
pub mod url;

pub use codec::{DEFAULT_USER_AGENT, MAX_HEAD_SIZE};
pub use headers::Headers;
pub use message::{Method, Request, Response, StatusClass, StatusCode, Version};
pub use pool::{ConnectionKey, HttpClient, HttpConfig};
pub use target::PostTarget;
pub use url::{Query, Scheme, Url};
