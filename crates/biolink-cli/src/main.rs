//! biolink CLI - stream and decode biosignal board packets
//!
//! Stream live samples from a serial board, replay binary captures, and
//! inspect the wire format from the command line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use biolink_core::{ProtocolVariant, PACKET_LEN, START_STREAM_COMMAND};
use biolink_transport::SerialSource;

mod config;
mod output;
mod session;

use config::BiolinkConfig;
use output::{OutputFormat, PacketPrinter};

/// biolink - OpenBCI-style sample stream tools
#[derive(Parser)]
#[command(name = "biolink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "BIOLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream packets from a board over serial
    Stream {
        /// Serial port (e.g. /dev/ttyUSB0, COM6)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate
        #[arg(short, long)]
        baud: Option<u32>,

        /// Firmware variant (cyton, xiao)
        #[arg(short, long)]
        variant: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Stop after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Attach to a board that is already streaming
        #[arg(long)]
        no_start: bool,
    },

    /// Decode a binary capture file
    Decode {
        /// Capture file
        file: PathBuf,

        /// Firmware variant (cyton, xiao)
        #[arg(short, long)]
        variant: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Read size used when replaying
        #[arg(long, default_value = "1024")]
        chunk_size: usize,
    },

    /// List serial ports
    Ports,

    /// Show version and protocol info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;

    // Handle Ctrl+C. `shutdown_tx` outlives every session so the channel
    // never closes under a running one.
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                let _ = shutdown_tx_clone.send(()).await;
            }
            Err(e) => warn!("Failed to listen for ctrl+c: {}", e),
        }
    });

    match cli.command {
        Commands::Stream {
            port,
            baud,
            variant,
            format,
            duration,
            no_start,
        } => {
            let config = BiolinkConfig::load(cli.config.as_deref())?;
            let variant = config.protocol.resolve(variant.as_deref())?;
            let format = format.or(config.output.format).unwrap_or_default();
            let serial = config.serial.to_serial_config(baud, no_start);

            let Some(port) = port.or_else(|| config.serial.port.clone()) else {
                bail!("No serial port given; pass --port or set serial.port in the config");
            };

            eprintln!(
                "{} Streaming from {} @ {} baud (start byte 0x{:02X})",
                "BIOLINK".cyan().bold(),
                port.yellow(),
                serial.baud_rate,
                variant.start_byte
            );

            let mut printer = PacketPrinter::new(io::stdout().lock(), format);
            let summary = session::stream_serial(
                &port,
                serial,
                variant,
                &mut printer,
                duration.map(Duration::from_secs),
                &mut shutdown_rx,
            )
            .await?;
            session::print_summary(&summary);
        }

        Commands::Decode {
            file,
            variant,
            format,
            chunk_size,
        } => {
            if chunk_size == 0 {
                bail!("--chunk-size must be at least 1");
            }

            let config = BiolinkConfig::load(cli.config.as_deref())?;
            let variant = config.protocol.resolve(variant.as_deref())?;
            let format = format.or(config.output.format).unwrap_or_default();

            eprintln!(
                "{} Decoding {}",
                "BIOLINK".cyan().bold(),
                file.display().to_string().yellow()
            );

            let mut printer = PacketPrinter::new(io::stdout().lock(), format);
            let summary =
                session::decode_file(&file, chunk_size, variant, &mut printer, &mut shutdown_rx)
                    .await?;
            session::print_summary(&summary);
        }

        Commands::Ports => {
            let ports = SerialSource::list_ports().context("Failed to list serial ports")?;
            if ports.is_empty() {
                println!("{}", "No serial ports found".yellow());
            }
            for port in ports {
                println!("  {}", port);
            }
        }

        Commands::Info => {
            print_info();
        }
    }

    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    // Packets go to stdout, so logs stay on stderr
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact().with_writer(io::stderr))
            .init();
    }

    Ok(())
}

fn print_info() {
    println!("{}", "biolink".cyan().bold());
    println!("  Version:  {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Platform: {} {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    if let Some(path) = config::default_path() {
        println!("  Config:   {}", path.display());
    }
    println!();
    println!("{}", "Variants:".bold());
    for name in ProtocolVariant::PRESETS {
        if let Ok(variant) = ProtocolVariant::by_name(name) {
            let stops: Vec<String> = variant
                .allowed_stop_nibbles
                .iter()
                .map(|n| format!("0x{:02X}", n))
                .collect();
            println!(
                "  {:<6} start 0x{:02X}  stop {} (mask 0x{:02X})",
                name,
                variant.start_byte,
                stops.join("/"),
                variant.stop_nibble_mask
            );
        }
    }
    println!();
    println!("{}", "Packet layout:".bold());
    println!("  {} bytes:", PACKET_LEN);
    println!("  [0]      start byte");
    println!("  [1]      sample counter (u8, wraps)");
    println!("  [2..26]  8 channels, int24 big-endian");
    println!("  [26..32] 3 aux values, int16 big-endian");
    println!("  [32]     stop byte (high nibble marker, low nibble packet type)");
    println!();
    println!(
        "  Start command: '{}' (0x{:02X})",
        START_STREAM_COMMAND as char, START_STREAM_COMMAND
    );
}
