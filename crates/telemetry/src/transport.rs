//! Build the configured transport
//!
//! Maps the `[transport]` config section onto the client crate's senders.

use framecast_client::http::{HttpConfig, PostTarget};
use framecast_client::{BackoffPolicy, QueuedSender, Reactor, SenderConfig, Transport};
use framecast_config::{
    HttpTransportConfig, TcpTransportConfig, TransportConfig, UdpTransportConfig,
};

use crate::error::{Result, TelemetryError};

/// Create the transport described by `config` on `reactor`
///
/// # Errors
///
/// Returns error if the target or URL is rejected by the transport.
pub fn build_transport(reactor: &Reactor, config: &TransportConfig) -> Result<Box<dyn Transport>> {
    let kind = config.kind();
    let transport: Box<dyn Transport> = match config {
        TransportConfig::Udp(udp) => Box::new(
            QueuedSender::udp(reactor, udp_sender_config(udp))
                .map_err(|e| TelemetryError::transport(kind, e))?,
        ),
        TransportConfig::Tcp(tcp) => Box::new(
            QueuedSender::tcp(reactor, tcp_sender_config(tcp))
                .map_err(|e| TelemetryError::transport(kind, e))?,
        ),
        TransportConfig::Http(http) => Box::new(
            PostTarget::new(reactor, &http.url, http_client_config(http))
                .map_err(|e| TelemetryError::transport(kind, e))?,
        ),
    };

    tracing::info!(transport = %transport.name(), "telemetry transport ready");
    Ok(transport)
}

fn udp_sender_config(udp: &UdpTransportConfig) -> SenderConfig {
    SenderConfig::udp(udp.target.trim())
        .with_queue_capacity(udp.queue_capacity)
        .with_backoff(BackoffPolicy::exponential(udp.retry_initial, udp.retry_max))
}

fn tcp_sender_config(tcp: &TcpTransportConfig) -> SenderConfig {
    SenderConfig::tcp(tcp.target.trim())
        .with_queue_capacity(tcp.queue_capacity)
        .with_backoff(BackoffPolicy::exponential(tcp.retry_initial, tcp.retry_max))
        .with_reconnect_interval(tcp.reconnect_interval)
        .with_connect_timeout(tcp.connect_timeout)
        .with_tcp_keepalive(tcp.tcp_keepalive)
}

fn http_client_config(http: &HttpTransportConfig) -> HttpConfig {
    let config = HttpConfig::default()
        .with_keep_alive(http.keep_alive)
        .with_connect_timeout(http.connect_timeout);
    match &http.user_agent {
        Some(user_agent) => config.with_user_agent(user_agent.clone()),
        None => config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use framecast_client::RETRY_FLOOR;
    use tokio::runtime::Handle;

    #[test]
    fn test_udp_defaults_hold_retry_at_floor() {
        let config = udp_sender_config(&UdpTransportConfig {
            target: " collector ".into(),
            ..Default::default()
        });
        assert_eq!(config.target, "collector");
        assert_eq!(config.queue_capacity, 4096);
        assert_eq!(config.backoff.initial, RETRY_FLOOR);
        assert_eq!(config.backoff.max, RETRY_FLOOR);
    }

    #[test]
    fn test_tcp_settings_carry_over() {
        let config = tcp_sender_config(&TcpTransportConfig {
            target: "collector:6000".into(),
            retry_max: Duration::from_secs(9),
            reconnect_interval: Duration::from_secs(1),
            tcp_keepalive: false,
            ..Default::default()
        });
        assert_eq!(config.backoff.max, Duration::from_secs(9));
        assert_eq!(config.backoff.multiplier, 2);
        assert_eq!(config.reconnect_interval, Duration::from_secs(1));
        assert!(!config.tcp_keepalive);
    }

    #[test]
    fn test_http_user_agent_override() {
        let config = http_client_config(&HttpTransportConfig {
            url: "http://collector/".into(),
            user_agent: Some("camera-7".into()),
            keep_alive: false,
            ..Default::default()
        });
        assert_eq!(config.user_agent, "camera-7");
        assert!(!config.keep_alive);
    }

    #[tokio::test]
    async fn test_build_each_kind() {
        let reactor = Reactor::from_handle(Handle::current());

        let udp = TransportConfig::Udp(UdpTransportConfig {
            target: "127.0.0.1".into(),
            ..Default::default()
        });
        assert_eq!(build_transport(&reactor, &udp).unwrap().name(), "udp://127.0.0.1");

        let tcp = TransportConfig::Tcp(TcpTransportConfig {
            target: "127.0.0.1:9".into(),
            ..Default::default()
        });
        assert_eq!(build_transport(&reactor, &tcp).unwrap().name(), "tcp://127.0.0.1:9");

        let http = TransportConfig::Http(HttpTransportConfig {
            url: "http://127.0.0.1:9/frames".into(),
            ..Default::default()
        });
        assert_eq!(
            build_transport(&reactor, &http).unwrap().name(),
            "http://127.0.0.1:9/frames"
        );
    }

    #[tokio::test]
    async fn test_build_reports_transport_kind() {
        let reactor = Reactor::from_handle(Handle::current());
        let http = TransportConfig::Http(HttpTransportConfig {
            url: "https://collector/".into(),
            ..Default::default()
        });

        let err = build_transport(&reactor, &http).err().expect("expected transport build error");
        assert!(err.to_string().starts_with("failed to create http transport"));
    }
}
