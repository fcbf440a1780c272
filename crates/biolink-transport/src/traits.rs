//! Byte source trait definitions

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};

/// Events that can occur on a byte source
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// Source opened
    Connected,
    /// Bytes read; may be empty when the source timed out with nothing
    Data(Bytes),
    /// Source closed (clean or error)
    Disconnected { reason: Option<String> },
    /// Non-fatal error
    Error(String),
}

/// Trait for anything that yields raw board bytes
#[async_trait]
pub trait ByteSource: Send {
    /// Receive the next event. `None` once the source is exhausted.
    async fn recv(&mut self) -> Option<SourceEvent>;
}

/// Trait for writing commands to the board
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Send data
    async fn send(&self, data: Bytes) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Close the sink
    async fn close(&self) -> Result<()>;
}

/// A channel of events is a byte source; handy for simulators and tests.
#[async_trait]
impl ByteSource for mpsc::Receiver<SourceEvent> {
    async fn recv(&mut self) -> Option<SourceEvent> {
        mpsc::Receiver::recv(self).await
    }
}

/// A channel of command bytes is a sink; the board side of a simulator.
#[async_trait]
impl CommandSink for mpsc::Sender<Bytes> {
    async fn send(&self, data: Bytes) -> Result<()> {
        mpsc::Sender::send(self, data)
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        !self.is_closed()
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
