//! Protocol variants
//!
//! Boards running different firmware builds agree on the 33-byte layout but
//! not on the start marker. A [`ProtocolVariant`] carries the handful of
//! constants that differ so one framer and one decoder serve all of them.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, START_BYTE_CYTON, START_BYTE_XIAO, STOP_NIBBLE_MASK};

/// Stop-marker high nibbles accepted by stock firmware
pub const DEFAULT_STOP_NIBBLES: [u8; 3] = [0xC0, 0xD0, 0xA0];

/// Start/stop marker configuration for one firmware flavour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVariant {
    /// Value of byte 0 of every frame
    pub start_byte: u8,
    /// Mask applied to the trailing byte before checking it
    #[serde(default = "default_stop_mask")]
    pub stop_nibble_mask: u8,
    /// Masked trailing-byte values that mark a data frame
    #[serde(default = "default_stop_nibbles")]
    pub allowed_stop_nibbles: Vec<u8>,
}

fn default_stop_mask() -> u8 {
    STOP_NIBBLE_MASK
}

fn default_stop_nibbles() -> Vec<u8> {
    DEFAULT_STOP_NIBBLES.to_vec()
}

impl ProtocolVariant {
    /// Variant with the given start byte and the stock stop-marker rules
    pub fn new(start_byte: u8) -> Self {
        Self {
            start_byte,
            stop_nibble_mask: STOP_NIBBLE_MASK,
            allowed_stop_nibbles: default_stop_nibbles(),
        }
    }

    /// OpenBCI Cyton (start byte `0xA0`)
    pub fn cyton() -> Self {
        Self::new(START_BYTE_CYTON)
    }

    /// XIAO nRF52840 firmware port (start byte `0x41`)
    pub fn xiao() -> Self {
        Self::new(START_BYTE_XIAO)
    }

    /// Names accepted by [`ProtocolVariant::by_name`]
    pub const PRESETS: &'static [&'static str] = &["cyton", "xiao"];

    /// Look up a preset by name (case-insensitive)
    pub fn by_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "cyton" => Ok(Self::cyton()),
            "xiao" => Ok(Self::xiao()),
            _ => Err(Error::UnknownVariant(name.to_string())),
        }
    }

    /// Override the accepted stop nibbles
    pub fn with_stop_nibbles(mut self, nibbles: impl Into<Vec<u8>>) -> Self {
        self.allowed_stop_nibbles = nibbles.into();
        self
    }

    /// Check that the variant can accept at least one frame
    pub fn validate(&self) -> Result<()> {
        if self.stop_nibble_mask == 0 {
            return Err(Error::InvalidVariant("stop nibble mask is zero".into()));
        }
        if self.allowed_stop_nibbles.is_empty() {
            return Err(Error::InvalidVariant(
                "no allowed stop nibbles configured".into(),
            ));
        }
        if let Some(n) = self
            .allowed_stop_nibbles
            .iter()
            .find(|&&n| n & !self.stop_nibble_mask != 0)
        {
            return Err(Error::InvalidVariant(format!(
                "stop nibble 0x{:02x} has bits outside mask 0x{:02x}",
                n, self.stop_nibble_mask
            )));
        }
        Ok(())
    }

    /// Whether `byte` is a valid trailing byte for this variant
    pub fn accepts_stop_byte(&self, byte: u8) -> bool {
        self.allowed_stop_nibbles
            .contains(&(byte & self.stop_nibble_mask))
    }
}

impl Default for ProtocolVariant {
    fn default() -> Self {
        Self::cyton()
    }
}
