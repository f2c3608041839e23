//! Property tests for the wire codec and the streaming parser.
//!
//! Runs on host only, mirroring the property-test file this crate is
//! modeled on. Covers the round-trip and arbitrary-chunking invariants the
//! runtime depends on: whatever bytes the codec writes, the parser must
//! reassemble into the same frame, regardless of how those bytes are split
//! across reads.

use blynklink::frame::{Command, Frame, FrameCodec, MAX_PAYLOAD_LEN};
use blynklink::parser::ParserSM;
use proptest::prelude::*;

const COMMANDS: [Command; 13] = [
    Command::Response,
    Command::Ping,
    Command::Bridge,
    Command::HardwareSync,
    Command::Internal,
    Command::Property,
    Command::Hardware,
    Command::Group,
    Command::Login,
    Command::Redirect,
    Command::DebugPrint,
    Command::EventLog,
    Command::EventClear,
];

fn arb_command() -> impl Strategy<Value = Command> {
    (0..COMMANDS.len()).prop_map(|i| COMMANDS[i])
}

fn arb_frame() -> impl Strategy<Value = Frame> {
    (
        arb_command(),
        any::<u16>(),
        proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_LEN),
    )
        .prop_map(|(cmd, id, payload)| {
            if cmd == Command::Response {
                Frame::response(id, payload.len() as u16)
            } else {
                Frame::new(cmd, id, &payload)
            }
        })
}

fn feed_all(parser: &mut ParserSM, bytes: &[u8]) -> Vec<Frame> {
    bytes.iter().filter_map(|&b| parser.feed_byte(b)).collect()
}

proptest! {
    /// `decode(encode(frame)) == frame`, modulo truncation at 512 bytes.
    #[test]
    fn encode_then_parse_round_trips(frame in arb_frame()) {
        let mut buf = [0u8; 5 + MAX_PAYLOAD_LEN];
        let n = FrameCodec::encode(&frame, &mut buf);

        let mut parser = ParserSM::new();
        let frames = feed_all(&mut parser, &buf[..n]);

        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(frames[0].command, frame.command);
        prop_assert_eq!(frames[0].id, frame.id);
        prop_assert_eq!(frames[0].length, frame.length);
        prop_assert_eq!(&frames[0].payload[..], &frame.payload[..]);
    }

    /// Feeding the same byte stream split into arbitrarily many chunks must
    /// yield the same sequence of frames as feeding it whole.
    #[test]
    fn any_chunking_yields_same_frame_sequence(
        frames in proptest::collection::vec(arb_frame(), 1..=6),
        chunk_size in 1usize..=64,
    ) {
        let mut whole = Vec::new();
        for f in &frames {
            let mut buf = [0u8; 5 + MAX_PAYLOAD_LEN];
            let n = FrameCodec::encode(f, &mut buf);
            whole.extend_from_slice(&buf[..n]);
        }

        let mut baseline_parser = ParserSM::new();
        let baseline = feed_all(&mut baseline_parser, &whole);

        let mut chunked_parser = ParserSM::new();
        let mut chunked = Vec::new();
        for chunk in whole.chunks(chunk_size) {
            chunked.extend(feed_all(&mut chunked_parser, chunk));
        }

        prop_assert_eq!(baseline.len(), chunked.len());
        for (a, b) in baseline.iter().zip(chunked.iter()) {
            prop_assert_eq!(a.command, b.command);
            prop_assert_eq!(a.id, b.id);
            prop_assert_eq!(a.length, b.length);
            prop_assert_eq!(&a.payload[..], &b.payload[..]);
        }
    }

    /// No sequence of input bytes ever yields a frame whose payload or
    /// reported length exceeds the wire-protocol maximum.
    #[test]
    fn parser_never_exceeds_max_payload(bytes in proptest::collection::vec(any::<u8>(), 0..=2048)) {
        let mut parser = ParserSM::new();
        for &byte in &bytes {
            if let Some(frame) = parser.feed_byte(byte) {
                prop_assert!(frame.payload.len() <= MAX_PAYLOAD_LEN);
                prop_assert!(frame.length as usize <= MAX_PAYLOAD_LEN);
            }
        }
    }
}
