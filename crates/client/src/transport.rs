//! The seam between the publisher and the wire
//!
//! A transport accepts finished documents from the frame-processing thread
//! and delivers them in the background. `write` never blocks on the network.

use std::time::Duration;

/// A destination for serialized frame documents
pub trait Transport: Send + Sync {
    /// Human-readable destination, e.g. `tcp://collector:5500`
    fn name(&self) -> &str;

    /// Queue one document for delivery
    ///
    /// The bytes are copied before returning, so the caller may reuse its
    /// buffer immediately.
    fn write(&self, data: &[u8]);

    /// Block until everything written so far has been handled or `timeout`
    /// passes; returns true if the transport went idle
    ///
    /// Must not be called from the reactor thread.
    fn wait_idle(&self, timeout: Duration) -> bool {
        let _ = timeout;
        true
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write(&self, data: &[u8]) {
        (**self).write(data);
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        (**self).wait_idle(timeout)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write(&self, data: &[u8]) {
        (**self).write(data);
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        (**self).wait_idle(timeout)
    }
}

/// Split `host:port` (or `[v6]:port`), filling in `default_port` when absent
///
/// Returns `None` for an empty host or a port that is not a number.
pub fn split_host_port(target: &str, default_port: u16) -> Option<(String, u16)> {
    let target = target.trim();

    if let Some(rest) = target.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        if host.is_empty() {
            return None;
        }
        let port = match after {
            "" => default_port,
            _ => after.strip_prefix(':')?.parse().ok()?,
        };
        return Some((host.to_owned(), port));
    }

    match target.rsplit_once(':') {
        // Bare IPv6 literal without brackets
        Some((host, _)) if host.contains(':') => Some((target.to_owned(), default_port)),
        Some((host, port)) if !host.is_empty() => Some((host.to_owned(), port.parse().ok()?)),
        Some(_) => None,
        None if target.is_empty() => None,
        None => Some((target.to_owned(), default_port)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_host_port() {
        assert_eq!(
            split_host_port("collector:9000", 5500),
            Some(("collector".into(), 9000))
        );
        assert_eq!(
            split_host_port("collector", 5500),
            Some(("collector".into(), 5500))
        );
        assert_eq!(split_host_port("[::1]:7", 5500), Some(("::1".into(), 7)));
        assert_eq!(split_host_port("[::1]", 5500), Some(("::1".into(), 5500)));
        assert_eq!(split_host_port("::1", 5500), Some(("::1".into(), 5500)));
    }

    #[test]
    fn test_split_host_port_rejects_garbage() {
        assert_eq!(split_host_port("", 5500), None);
        assert_eq!(split_host_port(":80", 5500), None);
        assert_eq!(split_host_port("host:http", 5500), None);
        assert_eq!(split_host_port("host:70000", 5500), None);
        assert_eq!(split_host_port("[]:80", 5500), None);
        assert_eq!(split_host_port("[::1]80", 5500), None);
    }
}
