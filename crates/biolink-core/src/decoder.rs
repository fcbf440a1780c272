//! Sample decoding
//!
//! [`decode`] turns one aligned frame into a [`SamplePacket`]. The only
//! integrity check the protocol offers is the stop-marker nibble; a frame
//! that fails it is rejected and nothing else about it is trusted.

use tracing::debug;

use crate::frame::{AUX_OFFSET, AUX_WIDTH, CHANNEL_OFFSET, CHANNEL_WIDTH, COUNTER_OFFSET};
use crate::{
    Framer, FramerStats, ProtocolVariant, RawFrame, Rejected, SamplePacket, NUM_AUX,
    NUM_CHANNELS,
};

/// Sign-extend a big-endian int24.
pub fn int24_be(bytes: [u8; 3]) -> i32 {
    let raw = (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2]);
    if raw & 0x80_0000 != 0 {
        raw as i32 - (1 << 24)
    } else {
        raw as i32
    }
}

/// Sign-extend a big-endian int16.
pub fn int16_be(bytes: [u8; 2]) -> i16 {
    i16::from_be_bytes(bytes)
}

/// Decode one frame against a variant's stop-marker rules
pub fn decode(frame: &RawFrame, variant: &ProtocolVariant) -> Result<SamplePacket, Rejected> {
    let bytes = frame.as_bytes();
    let stop_byte = frame.stop_byte();

    if !variant.accepts_stop_byte(stop_byte) {
        return Err(Rejected::invalid_stop_marker(stop_byte));
    }

    let mut channels = [0i32; NUM_CHANNELS];
    for (i, value) in channels.iter_mut().enumerate() {
        let at = CHANNEL_OFFSET + CHANNEL_WIDTH * i;
        *value = int24_be([bytes[at], bytes[at + 1], bytes[at + 2]]);
    }

    let mut aux = [0i16; NUM_AUX];
    for (i, value) in aux.iter_mut().enumerate() {
        let at = AUX_OFFSET + AUX_WIDTH * i;
        *value = int16_be([bytes[at], bytes[at + 1]]);
    }

    Ok(SamplePacket {
        sample_counter: bytes[COUNTER_OFFSET],
        channels,
        aux,
        stop_byte,
    })
}

/// [`decode`] bound to one variant
#[derive(Debug, Clone, Default)]
pub struct SampleDecoder {
    variant: ProtocolVariant,
}

impl SampleDecoder {
    pub fn new(variant: ProtocolVariant) -> Self {
        Self { variant }
    }

    pub fn decode(&self, frame: &RawFrame) -> Result<SamplePacket, Rejected> {
        decode(frame, &self.variant)
    }

    pub fn variant(&self) -> &ProtocolVariant {
        &self.variant
    }
}

/// Decoder-side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Packets decoded
    pub packets: u64,
    /// Frames dropped for a bad stop marker
    pub rejected: u64,
}

/// A framed candidate together with its decode outcome
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub frame: RawFrame,
    pub sample: Result<SamplePacket, Rejected>,
}

/// Framer and decoder wired together for one stream
#[derive(Debug, Default)]
pub struct PacketDecoder {
    framer: Framer,
    decoder: SampleDecoder,
    stats: DecodeStats,
}

impl PacketDecoder {
    pub fn new(variant: ProtocolVariant) -> Self {
        Self {
            framer: Framer::new(variant.clone()),
            decoder: SampleDecoder::new(variant),
            stats: DecodeStats::default(),
        }
    }

    /// Feed a chunk and iterate the packets it completes.
    ///
    /// Rejected frames are skipped and counted.
    #[must_use = "packets are decoded only as the iterator is consumed"]
    pub fn feed(&mut self, chunk: &[u8]) -> Packets<'_> {
        self.framer.extend(chunk);
        Packets { inner: self }
    }

    /// Feed a chunk and iterate every candidate frame, rejected ones included.
    #[must_use = "frames are decoded only as the iterator is consumed"]
    pub fn feed_frames(&mut self, chunk: &[u8]) -> DecodedFrames<'_> {
        self.framer.extend(chunk);
        DecodedFrames { inner: self }
    }

    fn next_decoded(&mut self) -> Option<DecodedFrame> {
        let frame = self.framer.next_frame()?;
        let sample = self.decoder.decode(&frame);

        match &sample {
            Ok(_) => self.stats.packets += 1,
            Err(rejected) => {
                self.stats.rejected += 1;
                debug!(frame = %frame.to_hex(), "{}", rejected);
            }
        }

        Some(DecodedFrame { frame, sample })
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    pub fn framer_stats(&self) -> FramerStats {
        self.framer.stats()
    }

    pub fn buffered(&self) -> usize {
        self.framer.buffered()
    }

    pub fn variant(&self) -> &ProtocolVariant {
        self.decoder.variant()
    }
}

/// Lazy iterator returned by [`PacketDecoder::feed`]
#[derive(Debug)]
pub struct Packets<'a> {
    inner: &'a mut PacketDecoder,
}

impl Iterator for Packets<'_> {
    type Item = SamplePacket;

    fn next(&mut self) -> Option<SamplePacket> {
        loop {
            let decoded = self.inner.next_decoded()?;
            if let Ok(packet) = decoded.sample {
                return Some(packet);
            }
        }
    }
}

/// Lazy iterator returned by [`PacketDecoder::feed_frames`]
#[derive(Debug)]
pub struct DecodedFrames<'a> {
    inner: &'a mut PacketDecoder,
}

impl Iterator for DecodedFrames<'_> {
    type Item = DecodedFrame;

    fn next(&mut self) -> Option<DecodedFrame> {
        self.inner.next_decoded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RejectReason;

    #[test]
    fn test_int24_boundaries() {
        assert_eq!(int24_be([0x80, 0x00, 0x00]), -(1 << 23));
        assert_eq!(int24_be([0x7F, 0xFF, 0xFF]), (1 << 23) - 1);
        assert_eq!(int24_be([0xFF, 0xFF, 0xFF]), -1);
        assert_eq!(int24_be([0x00, 0x00, 0x01]), 1);
    }

    #[test]
    fn test_int16_boundaries() {
        assert_eq!(int16_be([0x80, 0x00]), i16::MIN);
        assert_eq!(int16_be([0x7F, 0xFF]), i16::MAX);
        assert_eq!(int16_be([0xFF, 0xFF]), -1);
    }

    #[test]
    fn test_reject_reports_stop_byte() {
        let mut packet = SamplePacket::zeroed(3);
        packet.stop_byte = 0xB0;
        let frame = RawFrame::encode(0xA0, &packet);

        let err = decode(&frame, &ProtocolVariant::cyton()).unwrap_err();
        assert_eq!(err.reason, RejectReason::InvalidStopMarker(0xB0));
        assert_eq!(err.to_string(), "frame rejected: invalid stop marker 0xb0");
    }

    #[test]
    fn test_packet_decoder_counts() {
        let mut bad = SamplePacket::zeroed(1);
        bad.stop_byte = 0x00;

        let mut data = RawFrame::encode(0xA0, &SamplePacket::zeroed(0)).into_bytes().to_vec();
        data.extend_from_slice(RawFrame::encode(0xA0, &bad).as_bytes());
        data.extend_from_slice(RawFrame::encode(0xA0, &SamplePacket::zeroed(2)).as_bytes());

        let mut decoder = PacketDecoder::new(ProtocolVariant::cyton());
        let counters: Vec<u8> = decoder.feed(&data).map(|p| p.sample_counter).collect();

        assert_eq!(counters, vec![0, 2]);
        assert_eq!(
            decoder.stats(),
            DecodeStats {
                packets: 2,
                rejected: 1
            }
        );
        assert_eq!(decoder.framer_stats().frames, 3);
    }

    #[test]
    fn test_feed_frames_exposes_rejections() {
        let mut bad = SamplePacket::zeroed(9);
        bad.stop_byte = 0xE0;
        let frame = RawFrame::encode(0xA0, &bad);

        let mut decoder = PacketDecoder::new(ProtocolVariant::cyton());
        let decoded: Vec<_> = decoder.feed_frames(frame.as_bytes()).collect();

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].frame, frame);
        assert!(decoded[0].sample.is_err());
    }
}
