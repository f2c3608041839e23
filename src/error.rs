//! Unified error type for the connection runtime.
//!
//! Follows embedded best practice: a single `Error` enum that every subsystem
//! can convert into, keeping the runtime's error handling uniform. All
//! variants are `Copy` so they can be passed through callbacks and the
//! readiness loop without allocation.

use core::fmt;

/// Every fallible operation in this crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Allocation or fixed-capacity slot exhaustion (awaiter table, handler
    /// table, outbound queue).
    Mem,
    /// DNS resolution of the server url failed.
    Gai,
    /// An OS-level I/O error; carries the raw `errno`.
    Errno(i32),
    /// The server returned a non-success status code for a request.
    Status(u16),
    /// The readiness multiplexer itself reported an error.
    System,
    /// The peer closed the connection cleanly.
    Closed,
    /// A deadline elapsed with no matching response.
    Timeout,
    /// Caller attempted to submit while `Stopped`/`Disconnected`.
    NotConnected,
    /// Caller attempted to submit while `Connected` but not yet authenticated.
    NotAuthenticated,
    /// Operation attempted on a device that was never `begin`-initialized.
    NotInitialized,
    /// Caller attempted an operation invalid for the command (e.g. sending
    /// `RESPONSE` through the normal send path).
    InvalidOption,
    /// `run` was called on a device that already has a runtime task.
    Running,
    /// The configured server url could not be parsed as `host:port`; this is
    /// the one condition that stops the runtime task for good rather than
    /// retrying after `reconnect_delay`.
    InvalidUrl,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mem => write!(f, "allocation or fixed-capacity slot exhausted"),
            Self::Gai => write!(f, "DNS resolution of server url failed"),
            Self::Errno(e) => write!(f, "OS I/O error (errno {e})"),
            Self::Status(s) => write!(f, "server returned non-success status {s}"),
            Self::System => write!(f, "readiness multiplexer error"),
            Self::Closed => write!(f, "peer closed the connection"),
            Self::Timeout => write!(f, "deadline elapsed before a response arrived"),
            Self::NotConnected => write!(f, "device is not connected"),
            Self::NotAuthenticated => write!(f, "device is not authenticated"),
            Self::NotInitialized => write!(f, "device was never initialized with begin()"),
            Self::InvalidOption => write!(f, "operation is not valid for this command"),
            Self::Running => write!(f, "runtime task is already running"),
            Self::InvalidUrl => write!(f, "server url could not be parsed as host:port"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Errno(e.raw_os_error().unwrap_or(-1))
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
