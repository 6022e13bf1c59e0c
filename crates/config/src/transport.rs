//! Transport selection
//!
//! Exactly one transport carries the per-frame documents. It is chosen by
//! the `type` key of the `[transport]` section; leaving the section out
//! disables telemetry.
//!
//! # Example
//!
//! ```toml
//! [transport]
//! type = "tcp"
//! target = "collector.local:5500"
//! retry_max = "10s"
//! ```

use serde::Deserialize;
use std::time::Duration;

/// Port used when a udp or tcp target omits one
pub const DEFAULT_PORT: u16 = 5500;

/// Default bound on queued documents
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Configured transport
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// One datagram per document
    Udp(UdpTransportConfig),
    /// Newline-delimited documents over one TCP connection
    Tcp(TcpTransportConfig),
    /// POST per document
    Http(HttpTransportConfig),
}

impl TransportConfig {
    /// Name of the transport type, as written in the config
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Udp(_) => "udp",
            Self::Tcp(_) => "tcp",
            Self::Http(_) => "http",
        }
    }
}

/// UDP transport configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct UdpTransportConfig {
    /// Collector address (`host[:port]`, default port 5500)
    pub target: String,

    /// Maximum documents waiting for delivery
    /// Default: 4096
    pub queue_capacity: usize,

    /// Delay before the first retry
    /// Default: 250ms
    #[serde(with = "humantime_serde")]
    pub retry_initial: Duration,

    /// Cap on the retry delay
    /// Default: 250ms (retries held at a fixed delay)
    #[serde(with = "humantime_serde")]
    pub retry_max: Duration,
}

impl Default for UdpTransportConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retry_initial: Duration::from_millis(250),
            retry_max: Duration::from_millis(250),
        }
    }
}

/// TCP transport configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TcpTransportConfig {
    /// Collector address (`host[:port]`, default port 5500)
    pub target: String,

    /// Maximum documents waiting for delivery
    /// Default: 4096
    pub queue_capacity: usize,

    /// Delay before the first retry
    /// Default: 250ms
    #[serde(with = "humantime_serde")]
    pub retry_initial: Duration,

    /// Cap on the retry delay, which doubles per failure
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub retry_max: Duration,

    /// Wait between reconnect attempts
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub reconnect_interval: Duration,

    /// Connect timeout
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Enable TCP keep-alive
    /// Default: true
    pub tcp_keepalive: bool,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retry_initial: Duration::from_millis(250),
            retry_max: Duration::from_secs(5),
            reconnect_interval: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            tcp_keepalive: true,
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpTransportConfig {
    /// Endpoint receiving the POSTs (`http://` only)
    pub url: String,

    /// Reuse one connection for sequential requests
    /// Default: true
    pub keep_alive: bool,

    /// `user-agent` header; the client default when unset
    pub user_agent: Option<String>,

    /// Connect timeout
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            keep_alive: true,
            user_agent: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udp_defaults() {
        let config: TransportConfig = toml::from_str("type = \"udp\"\ntarget = \"c:1\"").unwrap();
        let TransportConfig::Udp(udp) = config else {
            panic!("expected udp");
        };
        assert_eq!(udp.target, "c:1");
        assert_eq!(udp.queue_capacity, 4096);
        assert_eq!(udp.retry_initial, Duration::from_millis(250));
        assert_eq!(udp.retry_max, Duration::from_millis(250));
    }

    #[test]
    fn test_tcp_full() {
        let toml = r#"
type = "tcp"
target = "collector"
queue_capacity = 16
retry_initial = "500ms"
retry_max = "30s"
reconnect_interval = "1s"
connect_timeout = "2s"
tcp_keepalive = false
"#;
        let config: TransportConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.kind(), "tcp");
        let TransportConfig::Tcp(tcp) = config else {
            panic!("expected tcp");
        };
        assert_eq!(tcp.queue_capacity, 16);
        assert_eq!(tcp.retry_initial, Duration::from_millis(500));
        assert_eq!(tcp.retry_max, Duration::from_secs(30));
        assert_eq!(tcp.reconnect_interval, Duration::from_secs(1));
        assert_eq!(tcp.connect_timeout, Duration::from_secs(2));
        assert!(!tcp.tcp_keepalive);
    }

    #[test]
    fn test_http_defaults() {
        let config: TransportConfig =
            toml::from_str("type = \"http\"\nurl = \"http://c/frames\"").unwrap();
        assert_eq!(
            config,
            TransportConfig::Http(HttpTransportConfig {
                url: "http://c/frames".into(),
                ..HttpTransportConfig::default()
            })
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(toml::from_str::<TransportConfig>("type = \"carrier-pigeon\"").is_err());
        assert!(toml::from_str::<TransportConfig>("target = \"c:1\"").is_err());
    }

    #[test]
    fn test_bad_duration_rejected() {
        let toml = "type = \"tcp\"\ntarget = \"c\"\nretry_max = \"soon\"";
        assert!(toml::from_str::<TransportConfig>(toml).is_err());
    }
}
