//! Decoded sample packets

use serde::{Deserialize, Serialize};

use crate::{NUM_AUX, NUM_CHANNELS};

/// Packet type carried in the low nibble of the stop byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PacketType {
    /// Aux bytes hold accelerometer axes
    Accel = 0,
    /// Aux bytes are raw, board-defined
    RawAux = 1,
    UserDefined = 2,
    AccelTimeSet = 3,
    AccelTimeSync = 4,
    RawAuxTimeSet = 5,
    RawAuxTimeSync = 6,
}

impl PacketType {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(PacketType::Accel),
            1 => Some(PacketType::RawAux),
            2 => Some(PacketType::UserDefined),
            3 => Some(PacketType::AccelTimeSet),
            4 => Some(PacketType::AccelTimeSync),
            5 => Some(PacketType::RawAuxTimeSet),
            6 => Some(PacketType::RawAuxTimeSync),
            _ => None,
        }
    }

    /// Packet type encoded in a stop byte
    pub fn from_stop_byte(byte: u8) -> Option<Self> {
        Self::from_u8(byte & 0x0F)
    }
}

/// One validated sample from the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePacket {
    pub sample_counter: u8,
    /// Channel values, int24 sign-extended
    pub channels: [i32; NUM_CHANNELS],
    /// Aux values, int16
    pub aux: [i16; NUM_AUX],
    /// Trailing byte as received
    pub stop_byte: u8,
}

impl SamplePacket {
    /// All-zero packet with a `0xC0` stop byte
    pub fn zeroed(sample_counter: u8) -> Self {
        Self {
            sample_counter,
            channels: [0; NUM_CHANNELS],
            aux: [0; NUM_AUX],
            stop_byte: 0xC0,
        }
    }

    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_stop_byte(self.stop_byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_from_stop_byte() {
        assert_eq!(PacketType::from_stop_byte(0xC0), Some(PacketType::Accel));
        assert_eq!(PacketType::from_stop_byte(0xC1), Some(PacketType::RawAux));
        assert_eq!(
            PacketType::from_stop_byte(0xD6),
            Some(PacketType::RawAuxTimeSync)
        );
        assert_eq!(PacketType::from_stop_byte(0xC7), None);
        assert_eq!(PacketType::from_stop_byte(0xAF), None);
    }

    #[test]
    fn test_packet_type_of_packet() {
        let mut packet = SamplePacket::zeroed(0);
        assert_eq!(packet.packet_type(), Some(PacketType::Accel));

        packet.stop_byte = 0xC4;
        assert_eq!(packet.packet_type(), Some(PacketType::AccelTimeSync));
    }
}
