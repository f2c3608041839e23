//! Blynk wire frame: the fixed 5-byte header plus an up-to-512-byte payload.

/// Maximum payload size carried by a single frame, per the wire protocol.
pub const MAX_PAYLOAD_LEN: usize = 512;

/// Size of the fixed frame header: `cmd(1) + id(2) + length(2)`.
pub const HEADER_SIZE: usize = 5;

/// Command kinds the protocol defines. Only a subset is actively interpreted
/// by the runtime (`Response`, `Hardware`, `Ping`, `Login`); the rest are
/// accepted over the wire and rejected with `IllegalCommand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Response = 0,
    Ping = 6,
    Bridge = 15,
    HardwareSync = 16,
    Internal = 17,
    Property = 19,
    Hardware = 20,
    Group = 21,
    Login = 29,
    Redirect = 41,
    DebugPrint = 55,
    EventLog = 64,
    EventClear = 65,
}

impl Command {
    /// Decode a raw command byte. Unknown bytes are preserved as `Other` so
    /// the parser can still deliver the frame to the dispatcher, which
    /// rejects it with `IllegalCommand` rather than the parser silently
    /// dropping bytes.
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::Response,
            6 => Self::Ping,
            15 => Self::Bridge,
            16 => Self::HardwareSync,
            17 => Self::Internal,
            19 => Self::Property,
            20 => Self::Hardware,
            21 => Self::Group,
            29 => Self::Login,
            41 => Self::Redirect,
            55 => Self::DebugPrint,
            64 => Self::EventLog,
            65 => Self::EventClear,
            _ => return None,
        })
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Status codes returned in `RESPONSE` frames. The runtime only branches on
/// success vs. non-success, but the full enumeration is kept for logging and
/// for callers that want to match on a specific server-reported reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum StatusCode {
    Success = 200,
    QuotaLimitException = 1,
    IllegalCommand = 2,
    NotRegistered = 3,
    AlreadyRegistered = 4,
    NotAuthenticated = 5,
    NotAllowed = 6,
    DeviceNotInNetwork = 7,
    NoActiveDashboard = 8,
    InvalidToken = 9,
    IllegalCommandBody = 11,
    GetGraphDataException = 12,
    NtfInvalidBody = 13,
    NtfNotAuthorized = 14,
    NtfException = 15,
    Timeout = 16,
    NoDataException = 17,
    DeviceWentOffline = 18,
    ServerException = 19,
    NotSupportedVersion = 20,
    EnergyLimit = 21,
    OperationAccept = 23,
    OperationDecline = 24,
}

impl StatusCode {
    pub const fn from_u16(code: u16) -> Option<Self> {
        Some(match code {
            200 => Self::Success,
            1 => Self::QuotaLimitException,
            2 => Self::IllegalCommand,
            3 => Self::NotRegistered,
            4 => Self::AlreadyRegistered,
            5 => Self::NotAuthenticated,
            6 => Self::NotAllowed,
            7 => Self::DeviceNotInNetwork,
            8 => Self::NoActiveDashboard,
            9 => Self::InvalidToken,
            11 => Self::IllegalCommandBody,
            12 => Self::GetGraphDataException,
            13 => Self::NtfInvalidBody,
            14 => Self::NtfNotAuthorized,
            15 => Self::NtfException,
            16 => Self::Timeout,
            17 => Self::NoDataException,
            18 => Self::DeviceWentOffline,
            19 => Self::ServerException,
            20 => Self::NotSupportedVersion,
            21 => Self::EnergyLimit,
            23 => Self::OperationAccept,
            24 => Self::OperationDecline,
            _ => return None,
        })
    }

    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    pub const fn is_success(code: u16) -> bool {
        code == Self::Success as u16
    }
}

/// A single Blynk protocol unit: fixed 5-byte header plus an optional
/// payload. For `command == Response`, `length` carries a status code rather
/// than a payload length.
#[derive(Debug, Clone)]
pub struct Frame {
    pub command: u8,
    pub id: u16,
    pub length: u16,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD_LEN>,
}

impl Frame {
    /// Build a payload-bearing frame, truncating to `MAX_PAYLOAD_LEN`.
    pub fn new(command: Command, id: u16, payload: &[u8]) -> Self {
        let truncated = &payload[..payload.len().min(MAX_PAYLOAD_LEN)];
        let mut buf = heapless::Vec::new();
        let _ = buf.extend_from_slice(truncated);
        Self {
            command: command.as_u8(),
            id,
            length: truncated.len() as u16,
            payload: buf,
        }
    }

    /// Build a `RESPONSE` frame; `length` carries the status code and there
    /// is no payload.
    pub fn response(id: u16, status: u16) -> Self {
        Self {
            command: Command::Response.as_u8(),
            id,
            length: status,
            payload: heapless::Vec::new(),
        }
    }

    pub const fn is_response(&self) -> bool {
        self.command == Command::Response as u8
    }
}

/// Serializes frames into a byte buffer: `[cmd][id_hi][id_lo][len_hi][len_lo][payload...]`.
pub struct FrameCodec;

impl FrameCodec {
    /// Encode `frame` into `out`, returning the number of bytes written.
    /// For `RESPONSE` frames no payload is appended regardless of `length`.
    /// Otherwise up to `min(length, out.len() - HEADER_SIZE)` payload bytes
    /// are appended.
    pub fn encode(frame: &Frame, out: &mut [u8]) -> usize {
        if out.len() < HEADER_SIZE {
            return 0;
        }
        out[0] = frame.command;
        out[1] = (frame.id >> 8) as u8;
        out[2] = frame.id as u8;
        out[3] = (frame.length >> 8) as u8;
        out[4] = frame.length as u8;

        if frame.is_response() {
            return HEADER_SIZE;
        }

        let remaining = out.len() - HEADER_SIZE;
        let n = (frame.length as usize).min(frame.payload.len()).min(remaining);
        out[HEADER_SIZE..HEADER_SIZE + n].copy_from_slice(&frame.payload[..n]);
        HEADER_SIZE + n
    }
}
