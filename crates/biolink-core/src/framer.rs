//! Packet framer for accumulating partial reads.
//!
//! The wire has no length field and no checksum, only a start marker and a
//! constrained stop nibble, so alignment is recovered structurally: anything
//! in front of the next visible start byte is discarded.
//!
//! # Example
//!
//! ```
//! use biolink_core::{Framer, ProtocolVariant};
//!
//! let mut framer = Framer::new(ProtocolVariant::cyton());
//!
//! // Data arrives in chunks from the serial port
//! let chunk = [0x00u8, 0x13, 0x37];
//! for frame in framer.feed(&chunk) {
//!     println!("frame #{}", frame.sample_counter());
//! }
//! assert!(framer.is_empty());
//! ```

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::{ProtocolVariant, RawFrame, PACKET_LEN};

const DEFAULT_CAPACITY: usize = 4 * 1024;

/// Diagnostic counters for one framer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Bytes handed to [`Framer::feed`]
    pub bytes_received: u64,
    /// Bytes dropped while searching for a start byte
    pub bytes_discarded: u64,
    /// Times the buffer front was not a start byte
    pub resyncs: u64,
    /// Candidate frames extracted
    pub frames: u64,
}

/// Stateful byte-stream framer.
///
/// Between calls the buffer is either shorter than a packet or begins with
/// the start byte. One framer serves one stream.
#[derive(Debug)]
pub struct Framer {
    buffer: BytesMut,
    variant: ProtocolVariant,
    stats: FramerStats,
}

impl Framer {
    pub fn new(variant: ProtocolVariant) -> Self {
        Self::with_capacity(variant, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(variant: ProtocolVariant, capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            variant,
            stats: FramerStats::default(),
        }
    }

    /// Append a chunk and return an iterator over the frames it completes.
    ///
    /// Extraction is lazy. Frames not pulled before the iterator is dropped
    /// stay buffered and come out of the next call, so the overall frame
    /// sequence does not depend on chunk boundaries.
    #[must_use = "frames are extracted only as the iterator is consumed"]
    pub fn feed(&mut self, chunk: &[u8]) -> Frames<'_> {
        self.extend(chunk);
        Frames { framer: self }
    }

    /// Append a chunk and collect every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawFrame> {
        self.feed(chunk).collect()
    }

    /// Append without extracting.
    pub(crate) fn extend(&mut self, chunk: &[u8]) {
        self.stats.bytes_received += chunk.len() as u64;
        self.buffer.extend_from_slice(chunk);
    }

    pub(crate) fn next_frame(&mut self) -> Option<RawFrame> {
        self.resync();

        if self.buffer.len() < PACKET_LEN {
            return None;
        }

        let bytes = self.buffer.split_to(PACKET_LEN).freeze();
        self.stats.frames += 1;

        // The bytes after a misaligned candidate need not start a frame.
        self.resync();

        Some(RawFrame::from_aligned(bytes))
    }

    fn resync(&mut self) {
        let start = self.variant.start_byte;

        while !self.buffer.is_empty() && self.buffer[0] != start {
            self.stats.resyncs += 1;

            // Search from offset 1; offset 0 is already known not to match.
            match self.buffer[1..].iter().position(|&b| b == start) {
                Some(pos) => {
                    let skip = pos + 1;
                    trace!(skip, "resync: dropping bytes before start byte");
                    self.buffer.advance(skip);
                    self.stats.bytes_discarded += skip as u64;
                }
                None => {
                    trace!(
                        len = self.buffer.len(),
                        "resync: no start byte buffered, clearing"
                    );
                    self.stats.bytes_discarded += self.buffer.len() as u64;
                    self.buffer.clear();
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop buffered bytes. Counters are kept.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    pub fn variant(&self) -> &ProtocolVariant {
        &self.variant
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(ProtocolVariant::default())
    }
}

/// Lazy iterator returned by [`Framer::feed`]
#[derive(Debug)]
pub struct Frames<'a> {
    framer: &'a mut Framer,
}

impl Iterator for Frames<'_> {
    type Item = RawFrame;

    fn next(&mut self) -> Option<RawFrame> {
        self.framer.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SamplePacket;

    fn frame_bytes(counter: u8) -> Vec<u8> {
        RawFrame::encode(0xA0, &SamplePacket::zeroed(counter))
            .as_bytes()
            .to_vec()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut framer = Framer::default();
        let frames = framer.push(&frame_bytes(42));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].sample_counter(), 42);
        assert!(framer.is_empty());
    }

    #[test]
    fn test_partial_frame_is_buffered() {
        let mut framer = Framer::default();
        let bytes = frame_bytes(1);

        assert!(framer.push(&bytes[..20]).is_empty());
        assert_eq!(framer.buffered(), 20);

        let frames = framer.push(&bytes[20..]);
        assert_eq!(frames.len(), 1);
        assert!(framer.is_empty());
    }

    #[test]
    fn test_garbage_without_start_byte_is_cleared() {
        let mut framer = Framer::default();

        assert!(framer.push(&[0x01, 0x02, 0x03, 0x04]).is_empty());
        assert!(framer.is_empty());

        let stats = framer.stats();
        assert_eq!(stats.bytes_received, 4);
        assert_eq!(stats.bytes_discarded, 4);
        assert_eq!(stats.resyncs, 1);
    }

    #[test]
    fn test_garbage_prefix_is_trimmed() {
        let mut framer = Framer::default();
        let mut data = vec![0x11, 0x22];
        data.extend_from_slice(&frame_bytes(1)[..10]);

        assert!(framer.push(&data).is_empty());
        assert_eq!(framer.buffered(), 10);
        assert_eq!(framer.stats().bytes_discarded, 2);
    }

    #[test]
    fn test_dropped_iterator_keeps_frames() {
        let mut framer = Framer::default();
        let mut data = frame_bytes(1);
        data.extend(frame_bytes(2));
        data.extend(frame_bytes(3));

        let first: Vec<_> = framer.feed(&data).take(1).collect();
        assert_eq!(first[0].sample_counter(), 1);
        assert_eq!(framer.buffered(), 2 * PACKET_LEN);

        let rest = framer.push(&[]);
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].sample_counter(), 2);
        assert_eq!(rest[1].sample_counter(), 3);
    }

    #[test]
    fn test_clear_keeps_stats() {
        let mut framer = Framer::default();
        let _ = framer.push(&frame_bytes(1)[..5]);
        framer.clear();

        assert!(framer.is_empty());
        assert_eq!(framer.stats().bytes_received, 5);
    }
}
