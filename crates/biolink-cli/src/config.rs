//! TOML configuration
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! settle_delay_ms = 200
//! send_start_command = true
//!
//! [protocol]
//! variant = "xiao"            # or "cyton"
//! # start_byte = 0x41          # overrides the preset
//! # allowed_stop_nibbles = [0xC0, 0xD0, 0xA0]
//!
//! [output]
//! format = "table"
//! ```
//!
//! Command-line flags win over file values.

use anyhow::{Context, Result};
use biolink_core::ProtocolVariant;
use biolink_transport::SerialConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::output::OutputFormat;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BiolinkConfig {
    pub serial: SerialSection,
    pub protocol: ProtocolSection,
    pub output: OutputSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialSection {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub settle_delay_ms: Option<u64>,
    pub send_start_command: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolSection {
    pub variant: Option<String>,
    pub start_byte: Option<u8>,
    pub stop_nibble_mask: Option<u8>,
    pub allowed_stop_nibbles: Option<Vec<u8>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub format: Option<OutputFormat>,
}

impl BiolinkConfig {
    /// Parse a config document
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse config")
    }

    /// Load from an explicit path, or the user config dir if present
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))
    }
}

/// `<config dir>/biolink/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("biolink").join("config.toml"))
}

impl ProtocolSection {
    /// Resolve the variant, with `name` (from the command line) taking
    /// precedence over the file's preset name
    pub fn resolve(&self, name: Option<&str>) -> Result<ProtocolVariant> {
        let preset = name.or(self.variant.as_deref()).unwrap_or("cyton");
        let mut variant = ProtocolVariant::by_name(preset)?;

        if let Some(start) = self.start_byte {
            variant.start_byte = start;
        }
        if let Some(mask) = self.stop_nibble_mask {
            variant.stop_nibble_mask = mask;
        }
        if let Some(nibbles) = &self.allowed_stop_nibbles {
            variant.allowed_stop_nibbles = nibbles.clone();
        }

        variant.validate()?;
        Ok(variant)
    }
}

impl SerialSection {
    pub fn to_serial_config(&self, baud: Option<u32>, no_start: bool) -> SerialConfig {
        let mut config = SerialConfig::default();

        if let Some(rate) = baud.or(self.baud_rate) {
            config.baud_rate = rate;
        }
        if let Some(ms) = self.settle_delay_ms {
            config.settle_delay = Duration::from_millis(ms);
        }
        if no_start || self.send_start_command == Some(false) {
            config.start_command = None;
        }

        config
    }
}
