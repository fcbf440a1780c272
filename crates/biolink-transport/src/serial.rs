//! Serial byte source
//!
//! Opens the board's USB-serial port, sends the one-shot start-streaming
//! command and forwards whatever the port produces as [`SourceEvent::Data`].
//! The bytes are not aligned to packets; that is the framer's job.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use biolink_core::{DEFAULT_BAUD_RATE, START_STREAM_COMMAND};

use crate::error::{Result, TransportError};
use crate::traits::{ByteSource, CommandSink, SourceEvent};

/// Read buffer size for the receiver task
const READ_BUF_SIZE: usize = 1024;

/// Event channel depth between the reader task and the receiver
const CHANNEL_DEPTH: usize = 100;

/// Serial source configuration
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate (default: 115200)
    pub baud_rate: u32,
    /// Data bits (default: 8)
    pub data_bits: u8,
    /// Stop bits (default: 1)
    pub stop_bits: u8,
    /// Parity (default: none)
    pub parity: SerialParity,
    /// Flow control (default: none)
    pub flow_control: SerialFlowControl,
    /// Pause between opening the port and sending the start command
    pub settle_delay: Duration,
    /// Byte that starts streaming; `None` to attach to a running stream
    pub start_command: Option<u8>,
}

/// Serial parity options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SerialParity {
    #[default]
    None,
    Odd,
    Even,
}

/// Serial flow control options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SerialFlowControl {
    #[default]
    None,
    Hardware,
    Software,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
            flow_control: SerialFlowControl::None,
            settle_delay: Duration::from_millis(200),
            start_command: Some(START_STREAM_COMMAND),
        }
    }
}

/// Wait for the board to settle, then send the start-streaming command.
pub async fn start_streaming<C>(sink: &C, command: u8, settle_delay: Duration) -> Result<()>
where
    C: CommandSink + ?Sized,
{
    tokio::time::sleep(settle_delay).await;
    sink.send(Bytes::copy_from_slice(&[command]))
        .await
        .map_err(|e| TransportError::SendFailed(format!("Start command failed: {}", e)))?;
    info!("Sent start command 0x{:02x} ('{}')", command, command as char);
    Ok(())
}

/// Serial byte source
#[cfg(feature = "serial")]
pub struct SerialSource;

#[cfg(feature = "serial")]
impl SerialSource {
    /// List available serial ports
    pub fn list_ports() -> Result<Vec<String>> {
        use tokio_serial::available_ports;
        let ports = available_ports().map_err(|e| {
            TransportError::ConnectionFailed(format!("Failed to list ports: {}", e))
        })?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    /// Open a port with the default configuration
    pub async fn open(port_name: &str) -> Result<(SerialSender, SerialReceiver)> {
        Self::open_with_config(port_name, SerialConfig::default()).await
    }

    /// Open a port, send the start command and spawn the reader task
    pub async fn open_with_config(
        port_name: &str,
        config: SerialConfig,
    ) -> Result<(SerialSender, SerialReceiver)> {
        use tokio::io::AsyncReadExt;
        use tokio_serial::SerialPortBuilderExt;

        let port = tokio_serial::new(port_name, config.baud_rate)
            .data_bits(data_bits(config.data_bits)?)
            .stop_bits(stop_bits(config.stop_bits)?)
            .parity(match config.parity {
                SerialParity::None => tokio_serial::Parity::None,
                SerialParity::Odd => tokio_serial::Parity::Odd,
                SerialParity::Even => tokio_serial::Parity::Even,
            })
            .flow_control(match config.flow_control {
                SerialFlowControl::None => tokio_serial::FlowControl::None,
                SerialFlowControl::Hardware => tokio_serial::FlowControl::Hardware,
                SerialFlowControl::Software => tokio_serial::FlowControl::Software,
            })
            .open_native_async()
            .map_err(|e| TransportError::ConnectionFailed(format!("Failed to open port: {}", e)))?;

        info!(
            "Serial port opened: {} @ {} baud",
            port_name, config.baud_rate
        );

        let (mut reader, writer) = tokio::io::split(port);
        let writer = Arc::new(tokio::sync::Mutex::new(writer));

        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let connected = Arc::new(Mutex::new(true));
        let connected_clone = connected.clone();

        // Spawn receiver task
        tokio::spawn(async move {
            let mut buf = vec![0u8; READ_BUF_SIZE];

            if tx.send(SourceEvent::Connected).await.is_err() {
                return;
            }

            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => {
                        *connected_clone.lock() = false;
                        let _ = tx.send(SourceEvent::Disconnected { reason: None }).await;
                        break;
                    }
                    Ok(n) => {
                        let data = Bytes::copy_from_slice(&buf[..n]);
                        if tx.send(SourceEvent::Data(data)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                        // Starvation, not an error.
                        if tx.send(SourceEvent::Data(Bytes::new())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Serial read error: {}", e);
                        *connected_clone.lock() = false;
                        let _ = tx
                            .send(SourceEvent::Disconnected {
                                reason: Some(e.to_string()),
                            })
                            .await;
                        break;
                    }
                }
            }
        });

        let sender = SerialSender { writer, connected };
        let receiver = SerialReceiver { rx };

        if let Some(command) = config.start_command {
            start_streaming(&sender, command, config.settle_delay).await?;
        }

        Ok((sender, receiver))
    }
}

#[cfg(feature = "serial")]
fn data_bits(bits: u8) -> Result<tokio_serial::DataBits> {
    use tokio_serial::DataBits;
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(TransportError::InvalidSetting(format!(
            "data bits must be 5-8, got {}",
            other
        ))),
    }
}

#[cfg(feature = "serial")]
fn stop_bits(bits: u8) -> Result<tokio_serial::StopBits> {
    use tokio_serial::StopBits;
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(TransportError::InvalidSetting(format!(
            "stop bits must be 1 or 2, got {}",
            other
        ))),
    }
}

#[cfg(feature = "serial")]
type PortWriter = tokio::io::WriteHalf<tokio_serial::SerialStream>;

/// Serial command sender
#[cfg(feature = "serial")]
pub struct SerialSender {
    writer: Arc<tokio::sync::Mutex<PortWriter>>,
    connected: Arc<Mutex<bool>>,
}

#[cfg(feature = "serial")]
#[async_trait]
impl CommandSink for SerialSender {
    async fn send(&self, data: Bytes) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&data)
            .await
            .map_err(|e| TransportError::SendFailed(format!("Serial write failed: {}", e)))?;
        writer.flush().await?;

        debug!("Serial sent {} bytes", data.len());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    async fn close(&self) -> Result<()> {
        *self.connected.lock() = false;
        Ok(())
    }
}

/// Serial receiver
#[cfg(feature = "serial")]
pub struct SerialReceiver {
    rx: mpsc::Receiver<SourceEvent>,
}

#[cfg(feature = "serial")]
#[async_trait]
impl ByteSource for SerialReceiver {
    async fn recv(&mut self) -> Option<SourceEvent> {
        self.rx.recv().await
    }
}

// Stub implementations when serial feature is disabled
#[cfg(not(feature = "serial"))]
pub struct SerialSource;

#[cfg(not(feature = "serial"))]
impl SerialSource {
    pub fn list_ports() -> Result<Vec<String>> {
        Err(TransportError::ConnectionFailed(
            "Serial feature not enabled. Compile with --features serial".into(),
        ))
    }

    pub async fn open(_port_name: &str) -> Result<(SerialSender, SerialReceiver)> {
        Err(TransportError::ConnectionFailed(
            "Serial feature not enabled. Compile with --features serial".into(),
        ))
    }

    pub async fn open_with_config(
        port_name: &str,
        _config: SerialConfig,
    ) -> Result<(SerialSender, SerialReceiver)> {
        Self::open(port_name).await
    }
}

#[cfg(not(feature = "serial"))]
pub struct SerialSender;

#[cfg(not(feature = "serial"))]
#[async_trait]
impl CommandSink for SerialSender {
    async fn send(&self, _data: Bytes) -> Result<()> {
        Err(TransportError::NotConnected)
    }

    fn is_connected(&self) -> bool {
        false
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(not(feature = "serial"))]
pub struct SerialReceiver;

#[cfg(not(feature = "serial"))]
#[async_trait]
impl ByteSource for SerialReceiver {
    async fn recv(&mut self) -> Option<SourceEvent> {
        None
    }
}
