//! Raw 33-byte frames
//!
//! Frame format:
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Byte 0:      Start marker (0xA0 Cyton, 0x41 XIAO)               │
//! │ Byte 1:      Sample counter (uint8, wraps)                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Bytes 2-25:  8 channels, int24 big-endian                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Bytes 26-31: 3 aux values, int16 big-endian                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Byte 32:     Stop marker                                        │
//! │              [7:4] 0xC / 0xD / 0xA                              │
//! │              [3:0] Packet type                                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{Error, Result, SamplePacket, NUM_CHANNELS, PACKET_LEN};

/// Offset of the sample counter
pub const COUNTER_OFFSET: usize = 1;

/// Offset of the first channel value
pub const CHANNEL_OFFSET: usize = 2;

/// Bytes per channel value
pub const CHANNEL_WIDTH: usize = 3;

/// Offset of the first aux value
pub const AUX_OFFSET: usize = CHANNEL_OFFSET + NUM_CHANNELS * CHANNEL_WIDTH;

/// Bytes per aux value
pub const AUX_WIDTH: usize = 2;

/// Offset of the stop marker
pub const STOP_OFFSET: usize = PACKET_LEN - 1;

/// One aligned, not yet validated packet
#[derive(Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Bytes,
}

impl RawFrame {
    /// Wrap bytes the framer has already aligned and measured.
    pub(crate) fn from_aligned(bytes: Bytes) -> Self {
        debug_assert_eq!(bytes.len(), PACKET_LEN);
        Self { bytes }
    }

    /// Build a frame from an arbitrary buffer, checking length and start byte
    pub fn from_bytes(bytes: impl Into<Bytes>, start_byte: u8) -> Result<Self> {
        let bytes = bytes.into();

        if bytes.len() < PACKET_LEN {
            return Err(Error::BufferTooSmall {
                needed: PACKET_LEN,
                have: bytes.len(),
            });
        }
        if bytes.len() > PACKET_LEN {
            return Err(Error::InvalidLength(bytes.len()));
        }
        if bytes[0] != start_byte {
            return Err(Error::InvalidStartByte {
                expected: start_byte,
                got: bytes[0],
            });
        }

        Ok(Self { bytes })
    }

    /// Encode a packet into wire form.
    ///
    /// Channel values are truncated to their low 24 bits, so anything
    /// outside the int24 range wraps.
    pub fn encode(start_byte: u8, packet: &SamplePacket) -> Self {
        let mut buf = BytesMut::with_capacity(PACKET_LEN);

        buf.put_u8(start_byte);
        buf.put_u8(packet.sample_counter);

        for value in packet.channels {
            buf.put_uint(u64::from(value as u32 & 0x00FF_FFFF), CHANNEL_WIDTH);
        }

        for value in packet.aux {
            buf.put_i16(value);
        }

        buf.put_u8(packet.stop_byte);

        Self::from_aligned(buf.freeze())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn start_byte(&self) -> u8 {
        self.bytes[0]
    }

    pub fn sample_counter(&self) -> u8 {
        self.bytes[COUNTER_OFFSET]
    }

    pub fn stop_byte(&self) -> u8 {
        self.bytes[STOP_OFFSET]
    }

    /// Space-separated upper-case hex dump, e.g. `A0 2A 00 ...`
    pub fn to_hex(&self) -> String {
        hex_dump(&self.bytes)
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawFrame").field(&self.to_hex()).finish()
    }
}

/// Hex-dump any byte slice the same way frames are printed
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, b) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{:02X}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NUM_AUX;

    fn zero_frame() -> Vec<u8> {
        let mut bytes = vec![0u8; PACKET_LEN];
        bytes[0] = 0xA0;
        bytes[1] = 0x2A;
        bytes[STOP_OFFSET] = 0xC0;
        bytes
    }

    #[test]
    fn test_layout_offsets() {
        assert_eq!(AUX_OFFSET, 26);
        assert_eq!(STOP_OFFSET, 32);
        assert_eq!(AUX_OFFSET + NUM_AUX * AUX_WIDTH, STOP_OFFSET);
    }

    #[test]
    fn test_from_bytes_checks() {
        let frame = RawFrame::from_bytes(zero_frame(), 0xA0).unwrap();
        assert_eq!(frame.sample_counter(), 42);
        assert_eq!(frame.stop_byte(), 0xC0);

        assert_eq!(
            RawFrame::from_bytes(vec![0xA0; 10], 0xA0),
            Err(Error::BufferTooSmall {
                needed: PACKET_LEN,
                have: 10
            })
        );
        assert_eq!(
            RawFrame::from_bytes(vec![0xA0; 34], 0xA0),
            Err(Error::InvalidLength(34))
        );
        assert_eq!(
            RawFrame::from_bytes(zero_frame(), 0x41),
            Err(Error::InvalidStartByte {
                expected: 0x41,
                got: 0xA0
            })
        );
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0xA0, 0x01, 0xFF]), "A0 01 FF");
        assert_eq!(hex_dump(&[]), "");

        let frame = RawFrame::from_bytes(zero_frame(), 0xA0).unwrap();
        let hex = frame.to_hex();
        assert!(hex.starts_with("A0 2A 00"));
        assert!(hex.ends_with("00 C0"));
        assert_eq!(hex.len(), PACKET_LEN * 3 - 1);
    }

    #[test]
    fn test_encode_negative_channel() {
        let mut packet = SamplePacket::zeroed(7);
        packet.channels[0] = -1;
        packet.channels[7] = -(1 << 23);
        packet.aux[2] = -2;

        let frame = RawFrame::encode(0xA0, &packet);
        let bytes = frame.as_bytes();

        assert_eq!(&bytes[2..5], &[0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[23..26], &[0x80, 0x00, 0x00]);
        assert_eq!(&bytes[30..32], &[0xFF, 0xFE]);
        assert_eq!(frame.stop_byte(), 0xC0);
    }
}
