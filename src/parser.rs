//! Byte-wise receive state machine.
//!
//! Fed one byte at a time from the socket read path; never allocates on the
//! heap (the in-progress payload lives in a fixed-capacity buffer). State is
//! held inline so each connection owns exactly one parser — no process-global
//! parser state, unlike the reference implementation this protocol is drawn
//! from.

use crate::frame::{Frame, MAX_PAYLOAD_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Cmd,
    Id,
    Len,
    Payload,
}

/// The Blynk frame reassembly state machine: `CMD -> ID -> LEN -> PAYLOAD -> CMD`.
#[derive(Debug)]
pub struct ParserSM {
    state: State,
    command: u8,
    id: u16,
    length: u16,
    byte_count: u16,
    payload: heapless::Vec<u8, MAX_PAYLOAD_LEN>,
}

impl ParserSM {
    pub const fn new() -> Self {
        Self {
            state: State::Cmd,
            command: 0,
            id: 0,
            length: 0,
            byte_count: 0,
            payload: heapless::Vec::new(),
        }
    }

    /// Drop any partial frame and return to the initial state. Called on
    /// session teardown so a fresh connection starts from a clean slate.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed one byte. Returns `Some(frame)` exactly when a complete frame has
    /// just been reassembled.
    pub fn feed_byte(&mut self, byte: u8) -> Option<Frame> {
        match self.state {
            State::Cmd => {
                self.command = byte;
                self.byte_count = 0;
                self.id = 0;
                self.state = State::Id;
                None
            }
            State::Id => {
                self.id = (self.id << 8) | u16::from(byte);
                self.byte_count += 1;
                if self.byte_count >= 2 {
                    self.byte_count = 0;
                    self.length = 0;
                    self.state = State::Len;
                }
                None
            }
            State::Len => {
                self.length = (self.length << 8) | u16::from(byte);
                self.byte_count += 1;
                if self.byte_count >= 2 {
                    if self.command == super::frame::Command::Response as u8 || self.length == 0 {
                        let frame = self.deliver();
                        self.state = State::Cmd;
                        return Some(frame);
                    }
                    self.byte_count = 0;
                    self.payload.clear();
                    self.state = State::Payload;
                }
                None
            }
            State::Payload => {
                if self.payload.len() < MAX_PAYLOAD_LEN {
                    // push() cannot fail: guarded by the length check above.
                    let _ = self.payload.push(byte);
                }
                self.byte_count += 1;
                if self.byte_count >= self.length {
                    let frame = self.deliver();
                    self.state = State::Cmd;
                    Some(frame)
                } else {
                    None
                }
            }
        }
    }

    fn deliver(&mut self) -> Frame {
        let length = self.length.min(MAX_PAYLOAD_LEN as u16);
        Frame {
            command: self.command,
            id: self.id,
            length,
            payload: core::mem::take(&mut self.payload),
        }
    }
}

impl Default for ParserSM {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Command, FrameCodec};

    fn feed_all(parser: &mut ParserSM, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|&b| parser.feed_byte(b)).collect()
    }

    #[test]
    fn parses_response_frame_with_no_payload() {
        let mut parser = ParserSM::new();
        let frames = feed_all(&mut parser, &[0x00, 0x00, 0x07, 0x00, 0xC8]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, Command::Response as u8);
        assert_eq!(frames[0].id, 7);
        assert_eq!(frames[0].length, 200);
        assert!(frames[0].payload.is_empty());
    }

    #[test]
    fn parses_payload_bearing_frame() {
        let mut parser = ParserSM::new();
        let frames = feed_all(&mut parser, &[20, 0x00, 0x05, 0x00, 0x03, b'v', b'w', 0x00]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, Command::Hardware as u8);
        assert_eq!(frames[0].id, 5);
        assert_eq!(&frames[0].payload[..], b"vw\x00");
    }

    #[test]
    fn zero_length_non_response_frame_delivers_immediately() {
        let mut parser = ParserSM::new();
        let frames = feed_all(&mut parser, &[6, 0x00, 0x2A, 0x00, 0x00]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, 0x2A);
        assert_eq!(frames[0].length, 0);
    }

    #[test]
    fn round_trip_through_codec() {
        let original = Frame::new(Command::Hardware, 42, b"vw\x001\x00");
        let mut buf = [0u8; 16];
        let n = FrameCodec::encode(&original, &mut buf);

        let mut parser = ParserSM::new();
        let frames = feed_all(&mut parser, &buf[..n]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, original.command);
        assert_eq!(frames[0].id, original.id);
        assert_eq!(frames[0].length, original.length);
        assert_eq!(&frames[0].payload[..], &original.payload[..]);
    }

    #[test]
    fn any_byte_chunking_yields_same_frames() {
        let f1 = Frame::new(Command::Hardware, 1, b"aw\x00255\x00");
        let f2 = Frame::response(2, 200);
        let mut buf = [0u8; 64];
        let n1 = FrameCodec::encode(&f1, &mut buf[..32]);
        let mut full = buf[..n1].to_vec();
        let mut buf2 = [0u8; 32];
        let n2 = FrameCodec::encode(&f2, &mut buf2);
        full.extend_from_slice(&buf2[..n2]);

        for chunk_size in 1..=full.len() {
            let mut parser = ParserSM::new();
            let mut frames = Vec::new();
            for chunk in full.chunks(chunk_size) {
                frames.extend(feed_all(&mut parser, chunk));
            }
            assert_eq!(frames.len(), 2, "chunk_size={chunk_size}");
            assert_eq!(frames[0].id, 1);
            assert_eq!(frames[1].id, 2);
            assert_eq!(frames[1].length, 200);
        }
    }

    #[test]
    fn oversized_length_is_clamped_to_max_payload() {
        let mut parser = ParserSM::new();
        // cmd=HARDWARE, id=0, length=600 (> MAX_PAYLOAD_LEN)
        let mut bytes = vec![20, 0x00, 0x00, 0x02, 0x58];
        bytes.extend(std::iter::repeat(b'x').take(600));
        let frames = feed_all(&mut parser, &bytes);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].length as usize, MAX_PAYLOAD_LEN);
        assert_eq!(frames[0].payload.len(), MAX_PAYLOAD_LEN);
    }

    #[test]
    fn reset_drops_partial_frame() {
        let mut parser = ParserSM::new();
        assert!(parser.feed_byte(20).is_none());
        assert!(parser.feed_byte(0x00).is_none());
        parser.reset();
        let frames = feed_all(&mut parser, &[0x00, 0x00, 0x01, 0x00, 0xC8]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, 1);
    }
}
