//! Packet printers for the console

use std::io::{self, Write};
use std::time::Instant;

use biolink_core::{frame::hex_dump, DecodedFrame, SamplePacket, NUM_AUX, NUM_CHANNELS};
use clap::ValueEnum;
use colored::Colorize;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned columns, one row per packet
    #[default]
    Table,
    /// One JSON object per line
    Json,
    /// Hex dump of every candidate frame, rejected ones included
    Raw,
}

pub struct PacketPrinter<W> {
    out: W,
    format: OutputFormat,
    started: Instant,
    header_printed: bool,
}

impl<W: Write> PacketPrinter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            started: Instant::now(),
            header_printed: false,
        }
    }

    /// Print one candidate frame. Rejected frames only show up in raw mode.
    pub fn print(&mut self, decoded: &DecodedFrame) -> io::Result<()> {
        match (self.format, &decoded.sample) {
            (OutputFormat::Raw, sample) => {
                let status = match sample {
                    Ok(_) => "ok".green().to_string(),
                    Err(rejected) => rejected.to_string().red().to_string(),
                };
                writeln!(
                    self.out,
                    "{:>10.3}  {}  {}",
                    self.started.elapsed().as_secs_f64(),
                    hex_dump(decoded.frame.as_bytes()),
                    status
                )
            }
            (_, Ok(packet)) => self.print_packet(packet),
            (_, Err(_)) => Ok(()),
        }
    }

    pub fn print_packet(&mut self, packet: &SamplePacket) -> io::Result<()> {
        match self.format {
            OutputFormat::Table => {
                if !self.header_printed {
                    self.print_header()?;
                }
                write!(self.out, "{:>6}", packet.sample_counter)?;
                for value in packet.channels {
                    write!(self.out, " {:>10}", value)?;
                }
                for value in packet.aux {
                    write!(self.out, " {:>10}", value)?;
                }
                writeln!(self.out)
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, packet)?;
                writeln!(self.out)
            }
            OutputFormat::Raw => writeln!(
                self.out,
                "{:>10.3}  {}",
                self.started.elapsed().as_secs_f64(),
                packet.sample_counter
            ),
        }
    }

    fn print_header(&mut self) -> io::Result<()> {
        self.header_printed = true;
        write!(self.out, "{:>6}", "Sample")?;
        for i in 1..=NUM_CHANNELS {
            write!(self.out, " {:>10}", format!("Ch{}", i))?;
        }
        for i in 1..=NUM_AUX {
            write!(self.out, " {:>10}", format!("Aux{}", i))?;
        }
        writeln!(self.out)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biolink_core::{decode, ProtocolVariant, RawFrame};

    fn decoded(packet: SamplePacket) -> DecodedFrame {
        let frame = RawFrame::encode(0xA0, &packet);
        let sample = decode(&frame, &ProtocolVariant::cyton());
        DecodedFrame { frame, sample }
    }

    fn render(format: OutputFormat, frames: &[DecodedFrame]) -> String {
        colored::control::set_override(false);
        let mut printer = PacketPrinter::new(Vec::new(), format);
        for frame in frames {
            printer.print(frame).unwrap();
        }
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn test_table_output() {
        let mut packet = SamplePacket::zeroed(42);
        packet.channels[0] = -8_388_608;
        packet.aux[2] = 7;

        let text = render(OutputFormat::Table, &[decoded(packet), decoded(packet)]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Sample"));
        assert!(lines[0].ends_with("Aux3"));
        assert!(lines[1].starts_with("    42   -8388608"));
        assert!(lines[1].ends_with("         7"));
        assert_eq!(lines[1].len(), 6 + 11 * 11);
    }

    #[test]
    fn test_json_output() {
        let text = render(OutputFormat::Json, &[decoded(SamplePacket::zeroed(3))]);
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["sample_counter"], 3);
        assert_eq!(value["stop_byte"], 0xC0);
    }

    #[test]
    fn test_rejected_only_in_raw() {
        let mut bad = SamplePacket::zeroed(1);
        bad.stop_byte = 0x00;
        let frames = [decoded(bad)];

        assert!(render(OutputFormat::Table, &frames).is_empty());
        assert!(render(OutputFormat::Json, &frames).is_empty());

        let raw = render(OutputFormat::Raw, &frames);
        assert!(raw.contains("A0 01 00"));
        assert!(raw.contains("invalid stop marker 0x00"));
    }
}
