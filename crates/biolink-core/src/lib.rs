//! biolink core
//!
//! Framing and decoding for the fixed 33-byte sample packets streamed by
//! serial biosignal acquisition boards (OpenBCI Cyton and compatible
//! firmware).
//!
//! This crate provides:
//! - Stream framing with start-byte resynchronization ([`Framer`])
//! - Sample decoding with stop-marker validation ([`decode`], [`SamplePacket`])
//! - Firmware variant configuration ([`ProtocolVariant`])
//! - A combined framer/decoder for one stream ([`PacketDecoder`])
//!
//! Nothing here performs I/O. Feed it bytes from wherever they come from.

pub mod decoder;
pub mod error;
pub mod frame;
pub mod framer;
pub mod packet;
pub mod variant;

pub use decoder::{decode, DecodeStats, DecodedFrame, PacketDecoder, SampleDecoder};
pub use error::{Error, RejectReason, Rejected, Result};
pub use frame::RawFrame;
pub use framer::{Framer, FramerStats, Frames};
pub use packet::{PacketType, SamplePacket};
pub use variant::ProtocolVariant;

/// Bytes per packet: start + counter + 8×3 channels + 3×2 aux + stop
pub const PACKET_LEN: usize = 33;

/// Channel values per packet
pub const NUM_CHANNELS: usize = 8;

/// Aux values per packet
pub const NUM_AUX: usize = 3;

/// Start byte used by Cyton firmware
pub const START_BYTE_CYTON: u8 = 0xA0;

/// Start byte used by the XIAO nRF52840 port
pub const START_BYTE_XIAO: u8 = 0x41; // 'A'

/// Mask selecting the stop-marker nibble of the trailing byte
pub const STOP_NIBBLE_MASK: u8 = 0xF0;

/// Command byte that starts streaming on the board
pub const START_STREAM_COMMAND: u8 = b'b';

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115200;
