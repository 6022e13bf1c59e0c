//! Per-frame publisher
//!
//! The only entry point the vision pipeline uses. Each call to
//! [`Publisher::accept`] encodes one document and hands it to the transport,
//! which copies it into its queue and returns. Nothing here waits on the
//! network.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use framecast_client::{Reactor, Transport};
use framecast_config::Config;
use framecast_protocol::{FrameMetrics, ResultRecord, encode_frame};

use crate::error::Result;
use crate::transport::build_transport;

/// Encodes frames and ships them through the configured transport
///
/// A publisher without a transport counts frames and drops the documents.
pub struct Publisher {
    transport: Option<Box<dyn Transport>>,
    frames: AtomicU64,
    bytes: AtomicU64,
}

impl Publisher {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        tracing::debug!(transport = %transport.name(), "publisher created");
        Self {
            transport: Some(transport),
            frames: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Publisher that drops every document
    pub fn disabled() -> Self {
        Self {
            transport: None,
            frames: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Publisher for the `[transport]` section of `config`
    ///
    /// # Errors
    ///
    /// Returns error if the transport cannot be created.
    pub fn from_config(reactor: &Reactor, config: &Config) -> Result<Self> {
        match &config.transport {
            Some(transport) => Ok(Self::new(build_transport(reactor, transport)?)),
            None => {
                tracing::info!("no transport configured, telemetry disabled");
                Ok(Self::disabled())
            }
        }
    }

    /// Publish the results of one frame
    ///
    /// Never blocks on I/O.
    pub fn accept(&self, results: &[ResultRecord], metrics: &FrameMetrics) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        let Some(transport) = &self.transport else {
            return;
        };

        let document = encode_frame(results, metrics);
        self.bytes.fetch_add(document.len() as u64, Ordering::Relaxed);
        tracing::trace!(
            frame = metrics.frame_index,
            results = results.len(),
            bytes = document.len(),
            "frame published"
        );
        transport.write(&document);
    }

    /// Wait for the transport to drain; returns false on timeout
    ///
    /// Must not be called from the reactor thread.
    pub fn flush(&self, timeout: Duration) -> bool {
        match &self.transport {
            Some(transport) => transport.wait_idle(timeout),
            None => true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Transport name, if one is configured
    pub fn transport_name(&self) -> Option<&str> {
        self.transport.as_deref().map(|t| t.name())
    }

    /// Frames passed to [`Publisher::accept`]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Encoded bytes handed to the transport
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("transport", &self.transport_name())
            .field("frames", &self.frames())
            .finish()
    }
}

#[cfg(test)]
#[path = "publisher_test.rs"]
mod publisher_test;
