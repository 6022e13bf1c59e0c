//! Datagram sender - one UDP packet per document
//!
//! Success means the local stack accepted the datagram; there is no
//! acknowledgement. The collector address is resolved lazily on the first
//! attempt and again after any failure, so a collector that is not resolvable
//! yet at startup is picked up once it is.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::{UdpSocket, lookup_host};

use crate::error::Result;
use crate::metrics::SenderMetrics;
use crate::queue::{Channel, QueuedSender, SendOutcome, SenderConfig};
use crate::reactor::Reactor;

/// Largest payload a UDP datagram can carry over IPv4
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Unconnected UDP socket plus the resolved collector address
pub(crate) struct DatagramChannel {
    host: String,
    port: u16,
    socket: Option<(UdpSocket, SocketAddr)>,
}

impl DatagramChannel {
    pub(crate) fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            socket: None,
        }
    }

    async fn open(&self) -> io::Result<(UdpSocket, SocketAddr)> {
        let peer = lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address for {}", self.host),
                )
            })?;

        let local: SocketAddr = match peer {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).await?;

        tracing::debug!(peer = %peer, local = ?socket.local_addr().ok(), "datagram socket ready");
        Ok((socket, peer))
    }
}

#[async_trait]
impl Channel for DatagramChannel {
    async fn attempt_send(&mut self, buf: &[u8]) -> SendOutcome {
        if buf.len() > MAX_DATAGRAM_SIZE {
            return SendOutcome::Discard("document exceeds maximum datagram size");
        }

        if self.socket.is_none() {
            match self.open().await {
                Ok(opened) => self.socket = Some(opened),
                Err(e) => return SendOutcome::Failed(e),
            }
        }
        let Some((socket, peer)) = self.socket.as_ref() else {
            return SendOutcome::Refused;
        };

        match socket.send_to(buf, *peer).await {
            Ok(n) if n == buf.len() => SendOutcome::Sent,
            Ok(n) => SendOutcome::Failed(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short datagram write: {n} of {} bytes", buf.len()),
            )),
            Err(e) => {
                // Re-resolve on the next attempt
                self.socket = None;
                SendOutcome::Failed(e)
            }
        }
    }
}

impl QueuedSender {
    /// Datagram sender delivering to `config.target`
    ///
    /// # Errors
    ///
    /// Returns error if the target or queue settings are invalid.
    pub fn udp(reactor: &Reactor, config: SenderConfig) -> Result<Self> {
        let (host, port) = config.validate()?;
        let name = format!("udp://{}", config.target);
        let channel = DatagramChannel::new(host, port);
        Ok(Self::with_channel(
            reactor,
            name,
            &config,
            Arc::new(SenderMetrics::new()),
            channel,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::runtime::Handle;
    use tokio::time::timeout;

    use crate::transport::Transport;

    async fn collector() -> (UdpSocket, String) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap().to_string();
        (socket, addr)
    }

    #[tokio::test]
    async fn test_documents_arrive_as_datagrams() {
        let (collector, addr) = collector().await;
        let reactor = Reactor::from_handle(Handle::current());
        let sender = QueuedSender::udp(&reactor, SenderConfig::udp(&addr)).unwrap();

        sender.write(b"{\"frame\":1}\n");
        sender.write(b"{\"frame\":2}\n");

        let mut buf = [0u8; 1024];
        for expected in [&b"{\"frame\":1}\n"[..], &b"{\"frame\":2}\n"[..]] {
            let (n, _) = timeout(Duration::from_secs(5), collector.recv_from(&mut buf))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(&buf[..n], expected);
        }

        assert_eq!(sender.name(), format!("udp://{addr}"));
    }

    #[tokio::test]
    async fn test_oversized_document_is_discarded() {
        let (collector, addr) = collector().await;
        let reactor = Reactor::from_handle(Handle::current());
        let sender = QueuedSender::udp(&reactor, SenderConfig::udp(&addr)).unwrap();

        sender.write(&vec![b'x'; MAX_DATAGRAM_SIZE + 1]);
        sender.write(b"after");

        let mut buf = [0u8; 64];
        let (n, _) = timeout(Duration::from_secs(5), collector.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"after");
        assert_eq!(sender.metrics().discarded, 1);
    }

    #[tokio::test]
    async fn test_oversize_rejected_before_resolving() {
        let mut channel = DatagramChannel::new("127.0.0.1".into(), 9);
        let outcome = channel.attempt_send(&vec![0u8; MAX_DATAGRAM_SIZE + 1]).await;
        assert!(matches!(outcome, SendOutcome::Discard(_)));
        // Rejected before touching the network
        assert!(channel.socket.is_none());
    }

    #[tokio::test]
    async fn test_invalid_target_rejected() {
        let reactor = Reactor::from_handle(Handle::current());
        assert!(QueuedSender::udp(&reactor, SenderConfig::udp("host:notaport")).is_err());
        assert!(QueuedSender::udp(&reactor, SenderConfig::udp("")).is_err());
    }
}
