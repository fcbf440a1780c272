//! Packet stream over a byte source
//!
//! Pulls chunks from a [`ByteSource`] through a [`PacketDecoder`] and hands
//! out packets one at a time. Session length is the caller's business: stop
//! polling (or drop the stream) to end it.

use std::collections::VecDeque;

use futures::Stream;
use tracing::{debug, info, warn};

use biolink_core::{
    DecodeStats, DecodedFrame, FramerStats, PacketDecoder, ProtocolVariant, SamplePacket,
};

use crate::error::Result;
use crate::traits::{ByteSource, SourceEvent};

/// Decoded packets from one byte source
pub struct PacketStream<S> {
    source: S,
    decoder: PacketDecoder,
    pending: VecDeque<DecodedFrame>,
    closed: bool,
    close_reason: Option<String>,
}

impl<S: ByteSource> PacketStream<S> {
    /// Wrap a source; fails if the variant cannot accept any frame
    pub fn new(source: S, variant: ProtocolVariant) -> Result<Self> {
        variant.validate()?;
        Ok(Self {
            source,
            decoder: PacketDecoder::new(variant),
            pending: VecDeque::new(),
            closed: false,
            close_reason: None,
        })
    }

    /// Next candidate frame and its decode outcome, rejected frames included.
    ///
    /// Returns `None` once the source has closed and every buffered frame
    /// has been handed out.
    pub async fn next_frame(&mut self) -> Option<DecodedFrame> {
        loop {
            if let Some(decoded) = self.pending.pop_front() {
                return Some(decoded);
            }
            if self.closed {
                return None;
            }

            match self.source.recv().await {
                Some(SourceEvent::Data(bytes)) => {
                    if bytes.is_empty() {
                        // starved; try again
                        continue;
                    }
                    self.pending.extend(self.decoder.feed_frames(&bytes));
                }
                Some(SourceEvent::Connected) => {
                    debug!("byte source connected");
                }
                Some(SourceEvent::Error(e)) => {
                    warn!("byte source error: {}", e);
                }
                Some(SourceEvent::Disconnected { reason }) => {
                    match &reason {
                        Some(r) => warn!("byte source disconnected: {}", r),
                        None => info!("byte source closed"),
                    }
                    self.closed = true;
                    self.close_reason = reason;
                }
                None => {
                    self.closed = true;
                }
            }
        }
    }

    /// Next successfully decoded packet
    pub async fn next_packet(&mut self) -> Option<SamplePacket> {
        loop {
            let decoded = self.next_frame().await?;
            if let Ok(packet) = decoded.sample {
                return Some(packet);
            }
        }
    }

    /// Turn into a [`Stream`] of packets
    pub fn into_packets(self) -> impl Stream<Item = SamplePacket> {
        futures::stream::unfold(self, |mut stream| async move {
            let packet = stream.next_packet().await?;
            Some((packet, stream))
        })
    }

    pub fn stats(&self) -> DecodeStats {
        self.decoder.stats()
    }

    pub fn framer_stats(&self) -> FramerStats {
        self.decoder.framer_stats()
    }

    pub fn is_closed(&self) -> bool {
        self.closed && self.pending.is_empty()
    }

    /// Why the source closed, if it reported a reason
    pub fn close_reason(&self) -> Option<&str> {
        self.close_reason.as_deref()
    }

    pub fn variant(&self) -> &ProtocolVariant {
        self.decoder.variant()
    }
}
