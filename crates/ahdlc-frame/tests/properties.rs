//! Property tests for the framing codec: round-trip under arbitrary
//! fragmentation, resync after consecutive flags, corruption detection and
//! decode-buffer bounds.

use std::ops::RangeInclusive;

use ahdlc_frame::{
    escaped_len, Channel, DecodeStats, Diagnostic, FrameConfig, Registry, CONTROL_ESCAPE, FLAG,
};

use bytes::Bytes;
use proptest::prelude::*;

const MAX_PAYLOAD: usize = 64;

fn channel() -> Channel {
    Channel::new(FrameConfig::with_max_payload(MAX_PAYLOAD)).unwrap()
}

/// Raw bytes biased toward the two reserved values.
fn biased_bytes(len: RangeInclusive<usize>) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        prop_oneof![
            3 => any::<u8>(),
            1 => Just(FLAG),
            1 => Just(CONTROL_ESCAPE),
        ],
        len,
    )
}

/// Payloads of `1..=2×S` bytes whose escaped form fits the `2×S` bound.
///
/// Half the cases are longer than `S`, where only the escaped bound limits
/// what the encoder accepts.
fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        biased_bytes(1..=MAX_PAYLOAD),
        biased_bytes(MAX_PAYLOAD + 1..=2 * MAX_PAYLOAD),
    ]
    .prop_filter("escaped payload must fit 2 x S", |p| {
        escaped_len(p) <= 2 * MAX_PAYLOAD
    })
}

/// Feed `wire` in pieces cut at `cuts`, decoding after each piece.
fn feed_in_pieces(ch: &mut Channel, wire: &[u8], cuts: &[usize]) -> Vec<Bytes> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (wire.len() + 1)).collect();
    points.push(0);
    points.push(wire.len());
    points.sort_unstable();
    points.dedup();

    let mut frames = Vec::new();
    for window in points.windows(2) {
        ch.feed(&wire[window[0]..window[1]]).unwrap();
        while let Some(frame) = ch.try_decode() {
            frames.push(frame);
        }
    }
    frames
}

proptest! {
    #[test]
    fn round_trip_whole_buffer(payload in payload()) {
        let mut ch = channel();
        let wire = ch.encode(&payload).unwrap();
        ch.feed(&wire).unwrap();
        prop_assert_eq!(ch.try_decode(), Some(Bytes::from(payload)));
        prop_assert_eq!(ch.queued(), 0);
    }

    #[test]
    fn round_trip_byte_at_a_time(payload in payload()) {
        let mut ch = channel();
        let wire = ch.encode(&payload).unwrap();
        let (last, head) = wire.split_last().unwrap();
        for byte in head {
            ch.feed(std::slice::from_ref(byte)).unwrap();
            prop_assert!(ch.try_decode().is_none());
        }
        ch.feed(std::slice::from_ref(last)).unwrap();
        prop_assert_eq!(ch.try_decode(), Some(Bytes::from(payload)));
    }

    #[test]
    fn round_trip_arbitrary_splits(
        payloads in proptest::collection::vec(payload(), 1..4),
        cuts in proptest::collection::vec(any::<usize>(), 0..8),
    ) {
        let mut ch = channel();
        let wire: Vec<u8> = payloads
            .iter()
            .flat_map(|p| ch.encode(p).unwrap().to_vec())
            .collect();
        let frames = feed_in_pieces(&mut ch, &wire, &cuts);
        let expected: Vec<Bytes> = payloads.into_iter().map(Bytes::from).collect();
        prop_assert_eq!(frames, expected);
        prop_assert_eq!(ch.stats().checksum_errors, 0);
    }

    #[test]
    fn double_flag_clears_residual_state(
        junk in proptest::collection::vec(any::<u8>(), 0..80),
        payload in payload(),
    ) {
        let mut ch = channel();
        let wire = ch.encode(&payload).unwrap();
        ch.feed(&[FLAG]).unwrap();
        if !junk.is_empty() {
            ch.feed(&junk).unwrap();
        }
        ch.feed(&[FLAG, FLAG]).unwrap();
        // Whatever the junk produced, nothing from it survives the two flags.
        while ch.try_decode().is_some() {}

        ch.feed(&wire).unwrap();
        prop_assert_eq!(ch.try_decode(), Some(Bytes::from(payload)));
    }

    #[test]
    fn single_bit_flip_is_detected(
        payload in payload(),
        position in any::<usize>(),
        bit in 0u32..8,
    ) {
        let mut ch = channel();
        let mut wire = ch.encode(&payload).unwrap().to_vec();

        // Flip a data byte in the body, including the byte carried by an
        // escape. The flip must not create a flag, and outside an escape it
        // must not create a new escape either.
        let body: Vec<usize> = (1..wire.len() - 1)
            .filter(|&i| {
                let flipped = wire[i] ^ (1 << bit);
                let escaped = wire[i - 1] == CONTROL_ESCAPE;
                !matches!(wire[i], FLAG | CONTROL_ESCAPE)
                    && flipped != FLAG
                    && (escaped || flipped != CONTROL_ESCAPE)
            })
            .collect();
        prop_assume!(!body.is_empty());
        let index = body[position % body.len()];
        wire[index] ^= 1 << bit;

        ch.feed(&wire).unwrap();
        prop_assert_eq!(ch.try_decode(), None);
        prop_assert!(
            matches!(ch.last_diagnostic(), Some(Diagnostic::ChecksumMismatch { .. })),
            "expected checksum mismatch, got {:?}",
            ch.last_diagnostic()
        );
        prop_assert_eq!(ch.stats().frames, 0);
    }

    #[test]
    fn decoded_length_never_exceeds_bound(
        stream in proptest::collection::vec(any::<u8>(), 0..600),
        max_payload in 1usize..16,
    ) {
        let mut ch = Channel::new(FrameConfig::with_max_payload(max_payload)).unwrap();
        if !stream.is_empty() {
            ch.feed(&stream).unwrap();
        }
        while let Some(frame) = ch.try_decode() {
            prop_assert!(frame.len() <= 2 * max_payload);
        }
    }

    #[test]
    fn encode_respects_escaped_bound(
        payload in proptest::collection::vec(any::<u8>(), 0..200),
        max_payload in 1usize..100,
    ) {
        let mut ch = Channel::new(FrameConfig::with_max_payload(max_payload)).unwrap();
        match ch.encode(&payload) {
            Ok(wire) => {
                prop_assert!(escaped_len(&payload) <= 2 * max_payload);
                prop_assert!(wire.len() <= 2 * max_payload + 6);
            }
            Err(_) => prop_assert!(escaped_len(&payload) > 2 * max_payload),
        }
    }
}

#[test]
fn scenario_escaped_encode_prefix() {
    let mut registry = Registry::new();
    let id = registry.allocate(64).unwrap();
    let wire = registry.encode(id, &[0x01, 0x7E, 0x7D, 0x02]).unwrap();

    assert_eq!(&wire[..7], &[0x7E, 0x01, 0x7D, 0x5E, 0x7D, 0x5D, 0x02]);
    assert_eq!(wire[wire.len() - 1], 0x7E);

    registry.feed(id, &wire).unwrap();
    let frame = registry.try_decode(id).unwrap().unwrap();
    assert_eq!(frame.payload.as_ref(), &[0x01, 0x7E, 0x7D, 0x02]);
}

#[test]
fn scenario_three_flags_yield_nothing() {
    let mut registry = Registry::new();
    let id = registry.allocate(64).unwrap();
    registry.feed(id, &[0x7E, 0x7E, 0x7E]).unwrap();
    assert!(registry.try_decode(id).unwrap().is_none());
    assert_eq!(registry.stats(id).unwrap().resyncs, 2);
}

#[test]
fn scenario_split_frame_completes_on_second_half() {
    let mut registry = Registry::new();
    let id = registry.allocate(64).unwrap();
    let payload: Vec<u8> = (0..=63).collect();
    let wire = registry.encode(id, &payload).unwrap();
    let (head, tail) = wire.split_at(wire.len() / 2);

    registry.feed(id, head).unwrap();
    assert!(registry.try_decode(id).unwrap().is_none());
    registry.feed(id, tail).unwrap();
    let frame = registry.try_decode(id).unwrap().unwrap();
    assert_eq!(frame.payload.as_ref(), payload.as_slice());
}

#[test]
fn overflowing_stream_resyncs_and_recovers() {
    let mut ch = Channel::new(FrameConfig::with_max_payload(4)).unwrap();
    let mut stream = vec![FLAG];
    stream.extend(std::iter::repeat(0x11).take(32));
    stream.extend_from_slice(&ch.encode(b"ok").unwrap());
    ch.feed(&stream).unwrap();

    assert_eq!(ch.try_decode().unwrap().as_ref(), b"ok");
    assert_eq!(
        ch.stats(),
        DecodeStats {
            frames: 1,
            overflows: 1,
            // Bytes after the overflow are dropped until the next flag.
            discarded_bytes: 32 - 11,
            ..DecodeStats::default()
        }
    );
}

#[test]
fn channels_decode_in_parallel_threads() {
    let handles: Vec<_> = (0..4u8)
        .map(|n| {
            std::thread::spawn(move || {
                let mut ch = channel();
                let payload = vec![n; 16];
                let wire = ch.encode(&payload).unwrap();
                for byte in wire.iter() {
                    ch.feed(std::slice::from_ref(byte)).unwrap();
                }
                ch.try_decode().map(|frame| frame.to_vec()) == Some(payload)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
