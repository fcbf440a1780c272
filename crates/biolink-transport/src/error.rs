//! Transport error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("invalid serial setting: {0}")]
    InvalidSetting(String),

    #[error("not connected")]
    NotConnected,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] biolink_core::Error),
}

#[cfg(feature = "serial")]
impl From<tokio_serial::Error> for TransportError {
    fn from(e: tokio_serial::Error) -> Self {
        TransportError::ConnectionFailed(e.to_string())
    }
}
