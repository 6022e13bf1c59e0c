//! Configuration validation
//!
//! Catches what TOML typing cannot:
//! - Required transport fields are present
//! - Retry delays are ordered and timeouts non-zero
//! - The http transport points at a plain `http://` URL

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::transport::{HttpTransportConfig, TcpTransportConfig, TransportConfig};
use std::time::Duration;

const COMPONENT: &str = "transport";

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let Some(transport) = &config.transport else {
        return Ok(());
    };

    let name = transport.kind();
    match transport {
        TransportConfig::Udp(udp) => {
            validate_target(name, &udp.target)?;
            validate_queue(name, udp.queue_capacity, udp.retry_initial, udp.retry_max)
        }
        TransportConfig::Tcp(tcp) => validate_tcp(name, tcp),
        TransportConfig::Http(http) => validate_http(name, http),
    }
}

fn validate_tcp(name: &str, tcp: &TcpTransportConfig) -> Result<()> {
    validate_target(name, &tcp.target)?;
    validate_queue(name, tcp.queue_capacity, tcp.retry_initial, tcp.retry_max)?;
    non_zero(name, "connect_timeout", tcp.connect_timeout)?;
    non_zero(name, "reconnect_interval", tcp.reconnect_interval)
}

fn validate_http(name: &str, http: &HttpTransportConfig) -> Result<()> {
    let url = http.url.trim();
    if url.is_empty() {
        return Err(ConfigError::missing_field(COMPONENT, name, "url"));
    }

    let scheme = url.split_once("://").map(|(scheme, _)| scheme.to_ascii_lowercase());
    match scheme.as_deref() {
        Some("http") => {}
        Some("https") => {
            return Err(ConfigError::invalid_value(
                COMPONENT,
                name,
                "url",
                "https is not supported",
            ));
        }
        _ => {
            return Err(ConfigError::invalid_value(
                COMPONENT,
                name,
                "url",
                format!("'{url}' is not an http:// url"),
            ));
        }
    }

    non_zero(name, "connect_timeout", http.connect_timeout)
}

fn validate_target(name: &str, target: &str) -> Result<()> {
    let target = target.trim();
    if target.is_empty() {
        return Err(ConfigError::missing_field(COMPONENT, name, "target"));
    }
    if target.contains("://") {
        return Err(ConfigError::invalid_value(
            COMPONENT,
            name,
            "target",
            format!("'{target}' must be host[:port], without a scheme"),
        ));
    }
    Ok(())
}

fn validate_queue(name: &str, capacity: usize, initial: Duration, max: Duration) -> Result<()> {
    if capacity == 0 {
        return Err(ConfigError::invalid_value(
            COMPONENT,
            name,
            "queue_capacity",
            "must be at least 1",
        ));
    }
    non_zero(name, "retry_initial", initial)?;
    if max < initial {
        return Err(ConfigError::invalid_value(
            COMPONENT,
            name,
            "retry_max",
            "must not be shorter than retry_initial",
        ));
    }
    Ok(())
}

fn non_zero(name: &str, field: &'static str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(ConfigError::invalid_value(
            COMPONENT,
            name,
            field,
            "must be greater than zero",
        ));
    }
    Ok(())
}
