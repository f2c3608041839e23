//! Typed payload construction and parsing.
//!
//! The wire format is a sequence of ASCII fields separated by single `0x00`
//! bytes (see the format-string table in the specification this crate
//! implements). Rather than a `printf`-style variadic format string, this is
//! exposed as an explicit builder — one `push_*` method per field kind —
//! per this codebase's preference for typed APIs at FFI-shaped boundaries.

use crate::frame::MAX_PAYLOAD_LEN;

/// Builds a NUL-separated payload up to `MAX_PAYLOAD_LEN` bytes.
#[derive(Debug, Default)]
pub struct PayloadBuilder {
    buf: heapless::Vec<u8, MAX_PAYLOAD_LEN>,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self { buf: heapless::Vec::new() }
    }

    fn push_field(&mut self, bytes: &[u8]) {
        if !self.buf.is_empty() {
            let _ = self.buf.push(0);
        }
        for &b in bytes {
            if self.buf.push(b).is_err() {
                break;
            }
        }
    }

    /// `c`, `b`, `B` — single char/byte, formatted as `%c`.
    pub fn push_char(&mut self, value: u8) -> &mut Self {
        self.push_field(&[value]);
        self
    }

    /// `?` — bool, formatted as the literal `true`/`false`.
    pub fn push_bool(&mut self, value: bool) -> &mut Self {
        self.push_field(if value { b"true" } else { b"false" });
        self
    }

    /// `h`, `H`, `i` — int, formatted as `%d`.
    pub fn push_int(&mut self, value: i32) -> &mut Self {
        self.push_field(value.to_string().as_bytes());
        self
    }

    /// `I` — uint, formatted as `%u`.
    pub fn push_uint(&mut self, value: u32) -> &mut Self {
        self.push_field(value.to_string().as_bytes());
        self
    }

    /// `l` — long, formatted as `%ld`.
    pub fn push_long(&mut self, value: i64) -> &mut Self {
        self.push_field(value.to_string().as_bytes());
        self
    }

    /// `L` — ulong, formatted as `%lu`.
    pub fn push_ulong(&mut self, value: u64) -> &mut Self {
        self.push_field(value.to_string().as_bytes());
        self
    }

    /// `q` — i64, formatted as `%lld`.
    pub fn push_i64(&mut self, value: i64) -> &mut Self {
        self.push_field(value.to_string().as_bytes());
        self
    }

    /// `Q` — u64, formatted as `%llu`.
    pub fn push_u64(&mut self, value: u64) -> &mut Self {
        self.push_field(value.to_string().as_bytes());
        self
    }

    /// `f`, `d` — double, formatted as `%.7f`.
    pub fn push_double(&mut self, value: f64) -> &mut Self {
        self.push_field(format!("{value:.7}").as_bytes());
        self
    }

    /// `s`, `p` — string, copied raw.
    pub fn push_str(&mut self, value: &str) -> &mut Self {
        self.push_field(value.as_bytes());
        self
    }

    pub fn finish(self) -> heapless::Vec<u8, MAX_PAYLOAD_LEN> {
        self.buf
    }
}

/// Split a `HARDWARE` payload on `0x00` separators into at most
/// `MAX_ARGS` UTF-8 arguments. Non-UTF-8 fields are skipped rather than
/// causing the whole split to fail, since the protocol does not guarantee
/// UTF-8 beyond the ASCII subset it defines.
///
/// Fields are NUL-*separated*, not NUL-*terminated*: a payload ending in
/// `0x00` (e.g. `"vw\0pin\0"`) must not produce a trailing empty argument,
/// matching the source protocol's length-driven field walk, which stops
/// once it runs out of payload rather than always emitting one more field
/// than there are separators.
pub const MAX_ARGS: usize = 32;

pub fn split_args(payload: &[u8]) -> heapless::Vec<&str, MAX_ARGS> {
    let mut args = heapless::Vec::new();
    if payload.is_empty() {
        return args;
    }
    let trimmed = if payload.last() == Some(&0) { &payload[..payload.len() - 1] } else { payload };
    if trimmed.is_empty() {
        return args;
    }
    for field in trimmed.split(|&b| b == 0) {
        if args.len() >= MAX_ARGS {
            break;
        }
        if let Ok(s) = core::str::from_utf8(field) {
            let _ = args.push(s);
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nul_separated_fields() {
        let payload = PayloadBuilder::new()
            .push_str("vw")
            .push_int(1)
            .push_int(0)
            .finish();
        assert_eq!(&payload[..], b"vw\x001\x000");
    }

    #[test]
    fn bool_uses_literal_words() {
        let payload = PayloadBuilder::new().push_bool(true).push_bool(false).finish();
        assert_eq!(&payload[..], b"true\x00false");
    }

    #[test]
    fn double_formats_with_seven_decimals() {
        let payload = PayloadBuilder::new().push_double(1.5).finish();
        assert_eq!(&payload[..], b"1.5000000");
    }

    #[test]
    fn single_field_has_no_separator() {
        let payload = PayloadBuilder::new().push_str("hello").finish();
        assert_eq!(&payload[..], b"hello");
    }

    #[test]
    fn split_args_recovers_command_and_arguments() {
        let args = split_args(b"vw\x001\x000");
        assert_eq!(&args[..], &["vw", "1", "0"]);
    }

    #[test]
    fn split_args_on_empty_payload_is_empty() {
        assert!(split_args(b"").is_empty());
    }

    #[test]
    fn split_args_caps_at_max_args() {
        let mut payload = Vec::new();
        for i in 0..(MAX_ARGS + 5) {
            if i > 0 {
                payload.push(0);
            }
            payload.extend_from_slice(i.to_string().as_bytes());
        }
        let args = split_args(&payload);
        assert_eq!(args.len(), MAX_ARGS);
    }

    #[test]
    fn split_args_drops_trailing_nul_terminated_empty_field() {
        let args = split_args(b"vw\x00pin\x00");
        assert_eq!(&args[..], &["vw", "pin"]);
    }

    #[test]
    fn split_args_on_single_trailing_nul_is_empty() {
        let args = split_args(b"\x00");
        assert!(args.is_empty());
    }
}
