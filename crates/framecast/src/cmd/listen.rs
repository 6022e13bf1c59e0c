//! Listen command - minimal collector for checking what a publisher sends
//!
//! Binds a UDP socket or TCP listener and prints every received document on
//! stdout, one per line. Logs go to stderr unless configured otherwise.
//!
//! # Usage
//!
//! ```bash
//! framecast listen --udp 0.0.0.0:5500
//! framecast listen --tcp 127.0.0.1:5500 --count 10 --pretty
//! ```

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;

/// Largest datagram we can receive
const RECV_BUFFER_SIZE: usize = 65_536;

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("bind").required(true).args(["udp", "tcp"])))]
pub struct ListenArgs {
    /// Receive datagrams on this address
    #[arg(long, value_name = "ADDR")]
    udp: Option<String>,

    /// Accept stream connections on this address
    #[arg(long, value_name = "ADDR")]
    tcp: Option<String>,

    /// Exit after this many documents
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Pretty-print each document
    #[arg(short, long)]
    pretty: bool,
}

pub fn run(args: ListenArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(listen(args))
}

async fn listen(args: ListenArgs) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let receiver = if let Some(addr) = &args.udp {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("failed to bind udp {addr}"))?;
        tracing::info!(addr = %socket.local_addr()?, "listening for datagrams");
        tokio::spawn(receive_datagrams(socket, tx))
    } else if let Some(addr) = &args.tcp {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind tcp {addr}"))?;
        tracing::info!(addr = %listener.local_addr()?, "listening for connections");
        tokio::spawn(accept_streams(listener, tx))
    } else {
        anyhow::bail!("either --udp or --tcp is required");
    };

    let mut received = 0u64;
    while let Some(document) = rx.recv().await {
        println!("{}", render(&document, args.pretty));
        received += 1;
        if args.count.is_some_and(|count| received >= count) {
            break;
        }
    }

    receiver.abort();
    tracing::info!(documents = received, "listener stopped");
    Ok(())
}

/// Forward every newline-delimited document in each datagram
async fn receive_datagrams(socket: UdpSocket, tx: mpsc::UnboundedSender<String>) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        let (n, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                tracing::warn!(error = %e, "receive failed");
                continue;
            }
        };
        tracing::trace!(peer = %peer, bytes = n, "datagram received");

        for line in buf[..n].split(|&b| b == b'\n').filter(|l| !l.is_empty()) {
            if tx.send(String::from_utf8_lossy(line).into_owned()).is_err() {
                return;
            }
        }
    }
}

async fn accept_streams(listener: TcpListener, tx: mpsc::UnboundedSender<String>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tracing::info!(peer = %peer, "publisher connected");
                tokio::spawn(read_stream(stream, peer, tx.clone()));
            }
            Err(e) => tracing::warn!(error = %e, "accept failed"),
        }
    }
}

async fn read_stream(stream: TcpStream, peer: SocketAddr, tx: mpsc::UnboundedSender<String>) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.is_empty() => {}
            Ok(Some(line)) => {
                if tx.send(line).is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "read failed");
                break;
            }
        }
    }
    tracing::info!(peer = %peer, "publisher disconnected");
}

/// Document as printed; invalid JSON is passed through with a warning
fn render(document: &str, pretty: bool) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(document);
    match parsed {
        Ok(value) if pretty => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| document.to_string())
        }
        Ok(_) => document.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "received document is not valid json");
            document.to_string()
        }
    }
}
