//! HTTP transport - each document is POSTed to one URL

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use super::message::Request;
use super::pool::{HttpClient, HttpConfig};
use super::url::{Scheme, Url};
use crate::error::{HttpError, Result, TransportError};
use crate::metrics::HttpMetricsSnapshot;
use crate::rate_limited_logger::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};
use crate::reactor::Reactor;
use crate::transport::Transport;

/// Transport that POSTs every document as `application/json`
///
/// Delivery is best-effort: a failed or rejected POST is logged (rate
/// limited) and the document is dropped.
pub struct PostTarget {
    name: String,
    url: Url,
    client: HttpClient,
    failures: Arc<RateLimitedLogger>,
}

impl PostTarget {
    /// # Errors
    ///
    /// Returns error if `url` does not parse or is not plain http.
    pub fn new(reactor: &Reactor, url: &str, config: HttpConfig) -> Result<Self> {
        Self::with_log_interval(reactor, url, config, DEFAULT_LOG_INTERVAL)
    }

    /// Like [`PostTarget::new`] with a custom failure log interval
    ///
    /// # Errors
    ///
    /// Returns error if `url` does not parse or is not plain http.
    pub fn with_log_interval(
        reactor: &Reactor,
        url: &str,
        config: HttpConfig,
        log_interval: Duration,
    ) -> Result<Self> {
        let url: Url = url.parse().map_err(HttpError::from)?;
        if url.scheme() == Scheme::Https {
            return Err(TransportError::Http(HttpError::TlsUnsupported));
        }

        let name = url.to_string();
        tracing::debug!(transport = %name, keep_alive = config.keep_alive, "http transport created");

        Ok(Self {
            failures: Arc::new(RateLimitedLogger::new(name.clone(), log_interval)),
            client: HttpClient::new(reactor, config),
            name,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> HttpMetricsSnapshot {
        self.client.metrics()
    }
}

impl Transport for PostTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, data: &[u8]) {
        let request = Request::post_json(self.url.clone(), Bytes::copy_from_slice(data));
        let failures = Arc::clone(&self.failures);

        self.client.submit(request, move |result| match result {
            Ok(response) if response.is_success() => {
                failures.success();
            }
            Ok(response) => {
                failures.failure(
                    "collector rejected document",
                    &format!("{} {}", response.status, response.reason),
                );
            }
            Err(e) => {
                failures.failure("post failed", &e);
            }
        });
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        self.client.wait_idle(timeout)
    }
}

impl std::fmt::Debug for PostTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostTarget")
            .field("url", &self.name)
            .field("client", &self.client)
            .finish()
    }
}
