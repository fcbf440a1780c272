//! Property tests for biolink core
//!
//! Random packets must survive encode/decode unchanged, and random streams
//! must frame identically no matter how they are split.

use biolink_core::{decode, Framer, ProtocolVariant, RawFrame, SamplePacket};
use proptest::prelude::*;

fn any_packet() -> impl Strategy<Value = SamplePacket> {
    (
        any::<u8>(),
        prop::array::uniform8(-(1i32 << 23)..(1i32 << 23)),
        any::<[i16; 3]>(),
        prop::sample::select(vec![0xC0u8, 0xD0, 0xA0]),
        0u8..16,
    )
        .prop_map(|(sample_counter, channels, aux, marker, kind)| SamplePacket {
            sample_counter,
            channels,
            aux,
            stop_byte: marker | kind,
        })
}

/// Valid frames interleaved with noise that is heavy in start bytes
fn noisy_stream() -> impl Strategy<Value = Vec<u8>> {
    let noise = prop::collection::vec(prop_oneof![1 => Just(0xA0u8), 2 => any::<u8>()], 0..40);
    let frame = any_packet().prop_map(|p| RawFrame::encode(0xA0, &p).into_bytes().to_vec());
    prop::collection::vec(prop_oneof![noise, frame], 0..24)
        .prop_map(|segments| segments.concat())
}

proptest! {
    #[test]
    fn prop_roundtrip(packet in any_packet(), xiao in any::<bool>()) {
        let variant = if xiao { ProtocolVariant::xiao() } else { ProtocolVariant::cyton() };
        let frame = RawFrame::encode(variant.start_byte, &packet);
        prop_assert_eq!(decode(&frame, &variant), Ok(packet));
    }

    #[test]
    fn prop_chunking_invariance(
        data in noisy_stream(),
        sizes in prop::collection::vec(1usize..80, 1..16),
    ) {
        let mut whole = Framer::new(ProtocolVariant::cyton());
        let expected = whole.push(&data);

        let mut framer = Framer::new(ProtocolVariant::cyton());
        let mut frames = Vec::new();
        let mut rest = &data[..];
        for size in sizes.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let (chunk, tail) = rest.split_at((*size).min(rest.len()));
            frames.extend(framer.feed(chunk));
            rest = tail;
        }

        prop_assert_eq!(frames, expected);
        prop_assert_eq!(framer.buffered(), whole.buffered());
        prop_assert_eq!(framer.stats().frames, whole.stats().frames);
        prop_assert_eq!(framer.stats().bytes_discarded, whole.stats().bytes_discarded);
    }
}
