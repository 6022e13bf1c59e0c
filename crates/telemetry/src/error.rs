//! Telemetry error types.

use framecast_client::TransportError;
use thiserror::Error;

/// Result type for telemetry setup
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors that can occur while setting up the publisher.
///
/// Publishing itself never fails; delivery problems stay inside the
/// transport.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured transport could not be created
    #[error("failed to create {kind} transport: {source}")]
    Transport {
        /// Transport type from the config (udp, tcp, http)
        kind: &'static str,
        #[source]
        source: TransportError,
    },
}

impl TelemetryError {
    /// Create a Transport error
    pub fn transport(kind: &'static str, source: TransportError) -> Self {
        Self::Transport { kind, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_transport_error_names_kind_and_keeps_source() {
        let source = TransportError::invalid_target("collector:port", "invalid port");
        let err = TelemetryError::transport("udp", source);
        assert!(err.to_string().starts_with("failed to create udp transport: "));
        assert!(err.source().is_some());
    }
}
