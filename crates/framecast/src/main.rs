//! Framecast - per-frame telemetry for vision pipelines
//!
//! # Usage
//!
//! ```bash
//! # Publish synthetic frames to a collector (default command)
//! framecast --tcp collector.local synth --frames 600 --fps 30
//! framecast --config configs/framecast.toml
//!
//! # Print documents as they arrive
//! framecast listen --udp 0.0.0.0:5500
//! ```

mod cmd;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use framecast_config::{
    Config, HttpTransportConfig, LogFormat, LogOutput, TcpTransportConfig, TransportConfig,
    UdpTransportConfig,
};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Framecast - per-frame telemetry for vision pipelines
#[derive(Parser, Debug)]
#[command(name = "framecast")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(flatten)]
    transport: TransportOverride,
}

/// Stream documents somewhere other than the configured transport
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
struct TransportOverride {
    /// Send datagrams to host[:port]
    #[arg(long, value_name = "HOST:PORT")]
    udp: Option<String>,

    /// Stream to host[:port]
    #[arg(long, value_name = "HOST:PORT")]
    tcp: Option<String>,

    /// POST each document to this URL
    #[arg(long, value_name = "URL")]
    http: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish synthetic frames through the configured transport
    Synth(cmd::synth::SynthArgs),

    /// Receive documents and print them to stdout
    Listen(cmd::listen::ListenArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), &cli.transport)?;
    init_logging(&config, cli.log_level.as_deref())?;

    match cli.command {
        Some(Command::Synth(args)) => cmd::synth::run(args, &config),
        Some(Command::Listen(args)) => cmd::listen::run(args),
        // No subcommand = synth with defaults
        None => cmd::synth::run(cmd::synth::SynthArgs::default(), &config),
    }
}

/// Load the config file (if any) and apply the command-line transport
fn load_config(path: Option<&Path>, transport: &TransportOverride) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(transport) = transport.to_config() {
        config.transport = Some(transport);
        config.validate().context("invalid transport override")?;
    }

    Ok(config)
}

impl TransportOverride {
    fn to_config(&self) -> Option<TransportConfig> {
        if let Some(target) = &self.udp {
            return Some(TransportConfig::Udp(UdpTransportConfig {
                target: target.clone(),
                ..Default::default()
            }));
        }
        if let Some(target) = &self.tcp {
            return Some(TransportConfig::Tcp(TcpTransportConfig {
                target: target.clone(),
                ..Default::default()
            }));
        }
        self.http.as_ref().map(|url| {
            TransportConfig::Http(HttpTransportConfig {
                url: url.clone(),
                ..Default::default()
            })
        })
    }
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => config.log.level.as_str().to_string(),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(config: &Config, cli_level: Option<&str>) -> Result<()> {
    let level = resolve_log_level(cli_level, config);
    let filter = EnvFilter::try_new(&level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let writer = match config.log.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
    };

    let layer = match config.log.format {
        LogFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).init();

    Ok(())
}
