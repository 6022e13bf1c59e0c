//! Framecast telemetry - per-frame results shipped without blocking the frame loop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  accept   ┌──────────────┐  write   ┌──────────────┐
//! │ frame loop  │──────────▶│  Publisher   │─────────▶│  Transport   │──▶ collector
//! │ (caller)    │           │ (encode doc) │  (copy)  │ (reactor)    │
//! └─────────────┘           └──────────────┘          └──────────────┘
//! ```
//!
//! The transport is chosen once from config: UDP, TCP, or HTTP POST.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::str::FromStr;
//! use std::time::Duration;
//!
//! use framecast_client::Reactor;
//! use framecast_config::Config;
//! use framecast_protocol::FrameMetrics;
//! use framecast_telemetry::Publisher;
//!
//! let config = Config::from_str("[transport]\ntype = \"tcp\"\ntarget = \"collector\"").unwrap();
//! let reactor = Reactor::start().unwrap();
//! let publisher = Publisher::from_config(&reactor, &config).unwrap();
//!
//! publisher.accept(&[], &FrameMetrics::default());
//! publisher.flush(Duration::from_secs(1));
//! ```

pub mod error;
pub mod publisher;
pub mod transport;

pub use error::{Result, TelemetryError};
pub use publisher::Publisher;
pub use transport::build_transport;
