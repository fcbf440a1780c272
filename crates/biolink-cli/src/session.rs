//! Acquisition sessions
//!
//! A session pumps one [`PacketStream`] into a [`PacketPrinter`] until the
//! source closes, Ctrl-C arrives, or the optional time limit elapses.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use biolink_core::{DecodeStats, FramerStats, ProtocolVariant};
use biolink_transport::{
    ByteSource, CommandSink, PacketStream, ReaderSource, SerialConfig, SerialSource,
};
use colored::Colorize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::output::PacketPrinter;

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    SourceClosed(Option<String>),
    Interrupted,
    TimeLimit,
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub stats: DecodeStats,
    pub framer: FramerStats,
    pub elapsed: Duration,
    pub stop: StopReason,
}

pub async fn run<S, W>(
    mut stream: PacketStream<S>,
    printer: &mut PacketPrinter<W>,
    duration: Option<Duration>,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> Result<SessionSummary>
where
    S: ByteSource,
    W: Write,
{
    let started = Instant::now();
    let deadline = tokio::time::sleep(duration.unwrap_or(Duration::MAX));
    tokio::pin!(deadline);

    let stop = loop {
        tokio::select! {
            decoded = stream.next_frame() => {
                match decoded {
                    Some(decoded) => printer
                        .print(&decoded)
                        .context("Failed to write packet")?,
                    None => {
                        break StopReason::SourceClosed(stream.close_reason().map(str::to_owned));
                    }
                }
            }
            // a closed channel disables this arm
            Some(()) = shutdown_rx.recv() => break StopReason::Interrupted,
            _ = &mut deadline, if duration.is_some() => break StopReason::TimeLimit,
        }
    };

    printer.flush()?;
    debug!("session ended: {:?}", stop);

    Ok(SessionSummary {
        stats: stream.stats(),
        framer: stream.framer_stats(),
        elapsed: started.elapsed(),
        stop,
    })
}

/// Stream live from a serial port
pub async fn stream_serial<W: Write>(
    port: &str,
    config: SerialConfig,
    variant: ProtocolVariant,
    printer: &mut PacketPrinter<W>,
    duration: Option<Duration>,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> Result<SessionSummary> {
    let (sender, receiver) = SerialSource::open_with_config(port, config)
        .await
        .with_context(|| format!("Failed to open {}", port))?;

    let stream = PacketStream::new(receiver, variant)?;
    let summary = run(stream, printer, duration, shutdown_rx).await;

    sender.close().await?;
    summary
}

/// Replay a binary capture file
pub async fn decode_file<W: Write>(
    path: &Path,
    chunk_size: usize,
    variant: ProtocolVariant,
    printer: &mut PacketPrinter<W>,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> Result<SessionSummary> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    info!("Replaying {} in {} byte chunks", path.display(), chunk_size);

    let source = ReaderSource::with_chunk_size(file, chunk_size);
    let stream = PacketStream::new(source, variant)?;
    run(stream, printer, None, shutdown_rx).await
}

pub fn print_summary(summary: &SessionSummary) {
    let stop = match &summary.stop {
        StopReason::SourceClosed(None) => "source closed".to_string(),
        StopReason::SourceClosed(Some(reason)) => format!("source closed: {}", reason),
        StopReason::Interrupted => "interrupted".to_string(),
        StopReason::TimeLimit => "time limit reached".to_string(),
    };

    eprintln!();
    eprintln!(
        "{} Session ended ({}) after {:.1}s",
        "BIOLINK".cyan().bold(),
        stop,
        summary.elapsed.as_secs_f64()
    );
    eprintln!("  Packets:         {}", summary.stats.packets.to_string().green());
    eprintln!(
        "  Rejected:        {}",
        if summary.stats.rejected > 0 {
            summary.stats.rejected.to_string().yellow()
        } else {
            summary.stats.rejected.to_string().normal()
        }
    );
    eprintln!("  Bytes received:  {}", summary.framer.bytes_received);
    eprintln!("  Bytes discarded: {}", summary.framer.bytes_discarded);
    eprintln!("  Resyncs:         {}", summary.framer.resyncs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use biolink_core::{RawFrame, SamplePacket};
    use biolink_transport::SourceEvent;

    fn capture() -> Vec<u8> {
        let mut data = vec![0x11, 0x22];
        for counter in 0..5u8 {
            data.extend_from_slice(RawFrame::encode(0xA0, &SamplePacket::zeroed(counter)).as_bytes());
        }
        let mut bad = SamplePacket::zeroed(5);
        bad.stop_byte = 0x10;
        data.extend_from_slice(RawFrame::encode(0xA0, &bad).as_bytes());
        data
    }

    #[tokio::test]
    async fn test_session_runs_to_source_close() {
        let data = capture();
        let stream =
            PacketStream::new(ReaderSource::with_chunk_size(&data[..], 7), ProtocolVariant::cyton())
                .unwrap();
        let mut printer = PacketPrinter::new(Vec::new(), OutputFormat::Json);
        let (_tx, mut rx) = mpsc::channel(1);

        let summary = run(stream, &mut printer, None, &mut rx).await.unwrap();

        assert_eq!(summary.stop, StopReason::SourceClosed(None));
        assert_eq!(summary.stats.packets, 5);
        assert_eq!(summary.stats.rejected, 1);
        assert_eq!(summary.framer.bytes_discarded, 2);
        assert_eq!(summary.framer.bytes_received, data.len() as u64);
    }

    #[tokio::test]
    async fn test_session_interrupted() {
        // source that never closes
        let (_events_tx, events_rx) = mpsc::channel::<SourceEvent>(1);
        let stream = PacketStream::new(events_rx, ProtocolVariant::cyton()).unwrap();
        let mut printer = PacketPrinter::new(Vec::new(), OutputFormat::Table);
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(()).await.unwrap();

        let summary = run(stream, &mut printer, None, &mut rx).await.unwrap();
        assert_eq!(summary.stop, StopReason::Interrupted);
        assert_eq!(summary.stats.packets, 0);
    }

    #[tokio::test]
    async fn test_closed_shutdown_channel_is_not_an_interrupt() {
        let data = capture();
        let stream =
            PacketStream::new(ReaderSource::with_chunk_size(&data[..], 33), ProtocolVariant::cyton())
                .unwrap();
        let mut printer = PacketPrinter::new(Vec::new(), OutputFormat::Table);
        let (tx, mut rx) = mpsc::channel::<()>(1);
        drop(tx);

        let summary = run(stream, &mut printer, None, &mut rx).await.unwrap();
        assert_eq!(summary.stop, StopReason::SourceClosed(None));
        assert_eq!(summary.stats.packets, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_time_limit() {
        let (_events_tx, events_rx) = mpsc::channel::<SourceEvent>(1);
        let stream = PacketStream::new(events_rx, ProtocolVariant::cyton()).unwrap();
        let mut printer = PacketPrinter::new(Vec::new(), OutputFormat::Table);
        let (_tx, mut rx) = mpsc::channel(1);

        let summary = run(stream, &mut printer, Some(Duration::from_secs(5)), &mut rx)
            .await
            .unwrap();
        assert_eq!(summary.stop, StopReason::TimeLimit);
    }
}
