//! Connection lifecycle state and the mutex-protected state shared between
//! application threads and the runtime task.

use std::sync::Mutex;

use crate::config::DeviceConfig;
use crate::handlers::HandlerTable;

/// One of the four lifecycle states a device can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Stopped,
    Disconnected,
    Connected,
    Authenticated,
}

/// Why a disconnect occurred, reported to the observer alongside the new
/// `Disconnected` state. Mirrors the subset of [`crate::error::Error`] kinds
/// that can trigger a disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// DNS resolution of the server url failed.
    Gai,
    /// An OS-level I/O error; carries the raw `errno`.
    Errno(i32),
    /// The server returned a non-success status (carries the status code).
    Status(u16),
    /// The readiness multiplexer reported an error.
    System,
    /// The peer closed the connection cleanly.
    Closed,
    /// A deadline elapsed with no response (login or heartbeat).
    Timeout,
    /// The awaiter table was full when a new request needed a correlation id.
    Mem,
}

/// Invoked exactly once per state transition, outside the shared mutex.
/// `reason` is `Some` only for transitions into `Disconnected`.
pub type ObserverCallback = Box<dyn FnMut(ConnectionState, Option<DisconnectReason>) + Send>;

/// State shared between application threads and the runtime task, behind
/// one mutex: `ConnectionState`, `DeviceConfig`, `HandlerTable`, and the
/// observer registration.
pub struct Shared {
    pub config: DeviceConfig,
    pub state: ConnectionState,
    pub handlers: HandlerTable,
    pub observer: Option<ObserverCallback>,
    pub started: bool,
}

impl Shared {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Stopped,
            handlers: HandlerTable::new(),
            observer: None,
            started: false,
        }
    }
}

/// Shared device state plus the producer-side handle to the outbound queue.
/// Cloneable and `Send + Sync` so application code can hold it across
/// threads; the runtime task holds the consumer end separately.
pub struct SharedHandle(pub std::sync::Arc<Mutex<Shared>>);

impl Clone for SharedHandle {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl SharedHandle {
    pub fn new(config: DeviceConfig) -> Self {
        Self(std::sync::Arc::new(Mutex::new(Shared::new(config))))
    }

    /// Transition to `new_state` and fire the observer, if any, outside the
    /// lock. `reason` is forwarded only for `Disconnected` transitions.
    ///
    /// A repeated state label is only suppressed when it carries no reason:
    /// two consecutive `Connected`/`Authenticated` transitions are the same
    /// event and must not be reported twice, but repeated `Disconnected`
    /// transitions from successive failed reconnect attempts each carry a
    /// fresh `reason`/code and must each reach the observer.
    pub fn transition(&self, new_state: ConnectionState, reason: Option<DisconnectReason>) {
        let cb = {
            let mut shared = self.0.lock().unwrap();
            if shared.state == new_state && reason.is_none() {
                return;
            }
            shared.state = new_state;
            shared.observer.take()
        };
        if let Some(mut cb) = cb {
            cb(new_state, reason);
            let mut shared = self.0.lock().unwrap();
            if shared.observer.is_none() {
                shared.observer = Some(cb);
            }
        }
    }
}
