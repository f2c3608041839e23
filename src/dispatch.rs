//! Routes a freshly parsed [`Frame`] to either a pending response callback,
//! the in-progress login handshake, or a hardware-command lookup.
//!
//! Runs synchronously on the runtime task — nothing here may block. Hardware
//! dispatch only resolves the command name and argument list; the runtime
//! itself does the `HandlerTable::take_matching` / `restore` dance around
//! the actual callback invocation, since that table lives behind the shared
//! mutex and user code must never run with the lock held. Likewise an
//! auto-generated `RESPONSE` is handed straight back to the caller instead of
//! going through the cross-thread `OutboundQueue`, which the runtime only
//! ever consumes, never produces into.

use crate::frame::{Command, Frame, StatusCode};
use crate::payload::{split_args, MAX_ARGS};
use crate::registry::RequestRegistry;

/// Result of dispatching one complete frame.
pub enum Outcome<'a> {
    /// Nothing further to do.
    None,
    /// Write this frame back immediately.
    AutoResponse(Frame),
    /// A `RESPONSE` with id 0 arrived while a login was in flight; carries
    /// the status code from the wire.
    LoginResult(u16),
    /// A `HARDWARE` frame whose command prefix and arguments the caller
    /// should look up in the handler table.
    Hardware { id: u16, command: &'a str, argv: heapless::Vec<&'a str, MAX_ARGS> },
}

/// Dispatch one complete frame. `expecting_login` is true while the session
/// has not yet been authenticated, in which case an id-0 `RESPONSE` is the
/// login result rather than an ordinary awaiter resolution (id 0 can never
/// be allocated as an ordinary request id, so the two never collide).
pub fn dispatch<'a>(
    frame: &'a Frame,
    registry: &mut RequestRegistry,
    expecting_login: bool,
) -> Outcome<'a> {
    match Command::from_u8(frame.command) {
        Some(Command::Response) => {
            if expecting_login && frame.id == 0 {
                Outcome::LoginResult(frame.length)
            } else {
                registry.resolve(frame.id, frame.length);
                Outcome::None
            }
        }
        Some(Command::Hardware) => {
            let args = split_args(&frame.payload);
            match args.first() {
                Some(&command) => {
                    Outcome::Hardware { id: frame.id, command, argv: args[1..].iter().copied().collect() }
                }
                // A genuinely empty payload carries no command name at all;
                // the source's handle_hardware skips it outright rather
                // than reporting ILLEGAL_COMMAND.
                None => Outcome::None,
            }
        }
        _ => Outcome::AutoResponse(Frame::response(frame.id, StatusCode::IllegalCommand.as_u16())),
    }
}
