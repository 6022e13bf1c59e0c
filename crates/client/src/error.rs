//! Error types for the telemetry transports
//!
//! Transport errors are only returned while a transport is being set up.
//! Once running, senders retry internally and HTTP completion handlers
//! receive an [`HttpError`] instead of a response.

use std::io;

use thiserror::Error;

/// Result type for transport setup
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while creating a transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The dedicated event loop could not be started
    #[error("failed to start reactor: {0}")]
    Reactor(#[source] io::Error),

    /// Target is not in `host:port` form
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget {
        /// Target as configured
        target: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// A sender setting is out of range
    #[error("invalid {field}: {reason}")]
    InvalidConfig {
        /// Setting name
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },

    /// HTTP endpoint could not be used
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl TransportError {
    /// Create an InvalidTarget error
    pub fn invalid_target(target: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason,
        }
    }
}

/// Errors from URL parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// No `scheme://` prefix
    #[error("missing scheme in '{0}'")]
    MissingScheme(String),

    /// Scheme other than http or https
    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    /// Empty or malformed host
    #[error("invalid host in '{0}'")]
    InvalidHost(String),

    /// Port is not a number in 0..=65535
    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

/// Errors delivered to HTTP completion handlers
///
/// An `Err` here is the "absent response": the request was not answered.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request URL could not be parsed
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] UrlError),

    /// The request needs TLS, which this client does not speak
    #[error("https is not supported")]
    TlsUnsupported,

    /// Host name did not resolve to any address
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    /// TCP connect failed or timed out
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },

    /// Socket read or write failed on an established connection
    #[error("connection i/o failed: {0}")]
    Io(#[from] io::Error),

    /// Status line did not start with HTTP/1.0 or HTTP/1.1
    #[error("unsupported http version '{0}'")]
    UnsupportedVersion(String),

    /// Status line without a three-digit status code
    #[error("malformed status line '{0}'")]
    InvalidStatusLine(String),

    /// Header line without a `:` separator, or a head that is not utf-8
    #[error("malformed header '{0}'")]
    InvalidHeader(String),

    /// Content-Length that is not a non-negative integer
    #[error("invalid content-length '{0}'")]
    InvalidContentLength(String),

    /// Transfer encoding this client cannot decode
    #[error("unsupported transfer-encoding '{0}'")]
    UnsupportedTransferEncoding(String),

    /// Response head larger than the accepted limit
    #[error("response head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },

    /// Connection closed before the response was complete
    #[error("connection closed before the response completed")]
    EndOfStream,

    /// The client was dropped before the request completed
    #[error("http client shut down")]
    Shutdown,
}

impl HttpError {
    /// True for malformed responses (as opposed to network failures)
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedVersion(_)
                | Self::InvalidStatusLine(_)
                | Self::InvalidHeader(_)
                | Self::InvalidContentLength(_)
                | Self::UnsupportedTransferEncoding(_)
                | Self::HeadTooLarge { .. }
        )
    }

    /// Create a Connect error
    pub fn connect(target: impl Into<String>, source: io::Error) -> Self {
        Self::Connect {
            target: target.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_target() {
        let err = TransportError::invalid_target("collector", "missing port");
        assert_eq!(err.to_string(), "invalid target 'collector': missing port");
    }

    #[test]
    fn test_error_display_connect() {
        let err = HttpError::connect(
            "127.0.0.1:9",
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        );
        assert_eq!(err.to_string(), "failed to connect to 127.0.0.1:9: refused");
    }

    #[test]
    fn test_http_error_wraps_into_transport_error() {
        let err: TransportError = HttpError::TlsUnsupported.into();
        assert_eq!(err.to_string(), "https is not supported");
    }

    #[test]
    fn test_protocol_classification() {
        assert!(HttpError::UnsupportedVersion("HTTP/2.0".into()).is_protocol());
        assert!(HttpError::HeadTooLarge { limit: 10 }.is_protocol());
        assert!(!HttpError::EndOfStream.is_protocol());
        assert!(!HttpError::TlsUnsupported.is_protocol());
    }
}
