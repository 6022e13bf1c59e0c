//! Framecast Configuration
//!
//! TOML-based configuration loading with sensible defaults. Every section is
//! optional; an empty file is a valid configuration with telemetry disabled.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use framecast_config::{Config, TransportConfig};
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[transport]\ntype = \"udp\"\ntarget = \"collector\"").unwrap();
//! assert!(matches!(config.transport, Some(TransportConfig::Udp(_))));
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "debug"
//!
//! [transport]
//! type = "http"
//! url = "http://collector.local:8080/frames"
//! keep_alive = true
//! ```

mod error;
mod logging;
mod transport;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use transport::{
    DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY, HttpTransportConfig, TcpTransportConfig,
    TransportConfig, UdpTransportConfig,
};

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Where documents go; `None` disables telemetry
    pub transport: Option<TransportConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// True if a transport is configured
    pub fn telemetry_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.telemetry_enabled());
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
[log]
level = "trace"
format = "json"

[transport]
type = "tcp"
target = "collector.local:6000"
reconnect_interval = "2s"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.log.level, LogLevel::Trace);
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(config.telemetry_enabled());

        let Some(TransportConfig::Tcp(tcp)) = config.transport else {
            panic!("expected tcp transport");
        };
        assert_eq!(tcp.target, "collector.local:6000");
        assert_eq!(tcp.reconnect_interval, Duration::from_secs(2));
        assert_eq!(tcp.retry_max, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_str("[transport\ntype = ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[transport]").unwrap();
        writeln!(file, "type = \"http\"").unwrap();
        writeln!(file, "url = \"http://collector:8080/frames\"").unwrap();
        writeln!(file, "keep_alive = false").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        let Some(TransportConfig::Http(http)) = config.transport else {
            panic!("expected http transport");
        };
        assert_eq!(http.url, "http://collector:8080/frames");
        assert!(!http.keep_alive);
    }

    #[test]
    fn test_from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framecast.toml");
        fs::write(&path, "[transport]\ntype = \"udp\"\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert_eq!(err.field(), Some("target"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }
}
