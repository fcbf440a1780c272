//! Error types for biolink

use thiserror::Error;

/// Result type alias for biolink operations
pub type Result<T> = std::result::Result<T, Error>;

/// biolink error types
///
/// None of these come out of the streaming path: [`Framer::feed`] and
/// [`decode`] recover silently. They are returned by the explicit
/// construction APIs.
///
/// [`Framer::feed`]: crate::Framer::feed
/// [`decode`]: crate::decode
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// First byte of a frame is not the variant's start marker
    #[error("invalid start byte: expected 0x{expected:02x}, got 0x{got:02x}")]
    InvalidStartByte { expected: u8, got: u8 },

    /// Frame is longer than a packet
    #[error("invalid frame length: {0} bytes (expected 33)")]
    InvalidLength(usize),

    /// Frame buffer too small
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    /// Protocol variant cannot validate anything
    #[error("invalid protocol variant: {0}")]
    InvalidVariant(String),

    /// No preset with this name
    #[error("unknown protocol variant: {0}")]
    UnknownVariant(String),
}

/// Why the decoder refused a frame
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// High nibble of the trailing byte is not in the allowed set
    #[error("invalid stop marker 0x{0:02x}")]
    InvalidStopMarker(u8),
}

/// A framed packet that produced no sample
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("frame rejected: {reason}")]
pub struct Rejected {
    pub reason: RejectReason,
}

impl Rejected {
    pub fn invalid_stop_marker(byte: u8) -> Self {
        Self {
            reason: RejectReason::InvalidStopMarker(byte),
        }
    }
}
