//! Fuzz target: `ParserSM::feed_byte`
//!
//! Drives arbitrary byte sequences through the streaming frame parser and
//! asserts it never panics and never yields a frame whose payload exceeds
//! the wire-protocol maximum.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use blynklink::frame::MAX_PAYLOAD_LEN;
use blynklink::parser::ParserSM;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut parser = ParserSM::new();
    for &byte in data {
        if let Some(frame) = parser.feed_byte(byte) {
            assert!(frame.payload.len() <= MAX_PAYLOAD_LEN);
            assert!(frame.length as usize <= MAX_PAYLOAD_LEN);
        }
    }

    parser.reset();
    for &byte in data {
        let _ = parser.feed_byte(byte);
    }
});
