//! Public device API: the one type application code talks to.
//!
//! Construction sets up the outbound queue and the `mio::Poll` the runtime
//! task will wait on; [`Device::run`] blocks the calling thread driving the
//! connection for as long as the process wants it connected. Other methods
//! are safe to call concurrently from any other thread — they either touch
//! the shared mutex briefly or hand a [`crate::queue::Request`] to the
//! outbound queue.

use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mio::{Poll, Token};

use crate::config::DeviceConfig;
use crate::error::{Error, Result};
use crate::frame::{Command, Frame, StatusCode};
use crate::handlers::CommandHandler;
use crate::payload::PayloadBuilder;
use crate::platform::{Clock, StdClock};
use crate::queue::{OutboundQueue, OutboundSender, Request};
use crate::registry::ResponseCallback;
use crate::runtime;
use crate::session::{ConnectionState, ObserverCallback, SharedHandle};

const WAKE_TOKEN: Token = Token(1);

/// One Blynk device connection. Cheap to construct; `run()` is what actually
/// opens a socket.
pub struct Device {
    shared: SharedHandle,
    clock: Arc<dyn Clock>,
    sender: OutboundSender,
    parts: Mutex<Option<(OutboundQueue, Poll)>>,
}

impl Device {
    /// Build a device with the default timing parameters and `auth_token`.
    pub fn begin(auth_token: impl Into<String>) -> Result<Self> {
        Self::with_config(DeviceConfig::new(auth_token))
    }

    /// Build a device from a fully specified configuration.
    pub fn with_config(config: DeviceConfig) -> Result<Self> {
        let poll = Poll::new()?;
        let waker = Arc::new(mio::Waker::new(poll.registry(), WAKE_TOKEN)?);
        let (sender, queue) = OutboundQueue::new(waker);
        Ok(Self {
            shared: SharedHandle::new(config),
            clock: Arc::new(StdClock::new()),
            sender,
            parts: Mutex::new(Some((queue, poll))),
        })
    }

    /// Register the callback fired on every connection-state transition.
    pub fn set_state_observer(&self, observer: ObserverCallback) {
        self.shared.0.lock().unwrap().observer = Some(observer);
    }

    pub fn set_timeout(&self, ms: u32) {
        self.shared.0.lock().unwrap().config.connection_timeout_ms = ms;
    }

    pub fn set_heartbeat_interval(&self, ms: u32) {
        self.shared.0.lock().unwrap().config.heartbeat_interval_ms = ms;
    }

    pub fn set_reconnect_delay(&self, ms: u32) {
        self.shared.0.lock().unwrap().config.reconnect_delay_ms = ms;
    }

    pub fn get_state(&self) -> ConnectionState {
        self.shared.0.lock().unwrap().state
    }

    /// Register a handler for hardware commands whose name matches `name`
    /// (at most 5 bytes). Replaces any existing handler under the same name.
    pub fn register_command_handler(
        &self,
        name: &str,
        handler: CommandHandler,
        user_data: Box<dyn Any + Send>,
    ) -> Result<()> {
        self.shared.0.lock().unwrap().handlers.register(name, handler, user_data)
    }

    pub fn deregister_command_handler(&self, name: &str) {
        self.shared.0.lock().unwrap().handlers.deregister(name);
    }

    /// Enqueue a `HARDWARE` virtual-write frame for `pin`, building its
    /// payload from `value` and any additional fields pushed onto the
    /// supplied [`PayloadBuilder`] closure.
    pub fn virtual_write(&self, pin: u8, build: impl FnOnce(&mut PayloadBuilder)) -> Result<()> {
        let mut builder = PayloadBuilder::new();
        builder.push_str("vw").push_uint(u32::from(pin));
        build(&mut builder);
        self.send(Frame::new(Command::Hardware, 0, &builder.finish()))
    }

    /// Enqueue `frame` with no response correlation. Fails with
    /// `Error::InvalidOption` for `RESPONSE` frames — use
    /// [`Device::send_response`] for those.
    pub fn send(&self, frame: Frame) -> Result<()> {
        self.check_authenticated()?;
        if frame.is_response() {
            return Err(Error::InvalidOption);
        }
        self.sender.submit(Request::new(frame), self.submit_wait())
    }

    /// Enqueue `frame` and invoke `handler` when the matching `RESPONSE`
    /// arrives, or with `StatusCode::Timeout` if none arrives before the
    /// connection timeout.
    pub fn send_with_callback(
        &self,
        frame: Frame,
        handler: ResponseCallback,
        user_data: Box<dyn Any + Send>,
    ) -> Result<()> {
        self.check_authenticated()?;
        if frame.is_response() {
            return Err(Error::InvalidOption);
        }
        let timeout_ms = self.shared.0.lock().unwrap().config.connection_timeout_ms;
        let deadline = self.clock.deadline_after_ms(timeout_ms);
        let req = Request::with_callback(frame, deadline, handler, user_data);
        self.sender.submit(req, self.submit_wait())
    }

    /// Reply to an in-flight `HARDWARE` request with a status code.
    pub fn send_response(&self, id: u16, status: u16) -> Result<()> {
        self.check_authenticated()?;
        let _ = StatusCode::from_u16(status);
        self.sender.submit(Request::new(Frame::response(id, status)), self.submit_wait())
    }

    fn check_authenticated(&self) -> Result<()> {
        match self.shared.0.lock().unwrap().state {
            ConnectionState::Authenticated => Ok(()),
            ConnectionState::Connected => Err(Error::NotAuthenticated),
            _ => Err(Error::NotConnected),
        }
    }

    fn submit_wait(&self) -> Duration {
        Duration::from_millis(u64::from(self.shared.0.lock().unwrap().config.connection_timeout_ms))
    }

    /// Drive the connection on the calling thread: connect, authenticate,
    /// serve, reconnect on disconnect, forever. Returns once the server url
    /// is found to be unparseable; returns `Error::Running` immediately if
    /// already running.
    pub fn run(&self) -> Result<()> {
        let (queue, poll) = {
            let mut shared = self.shared.0.lock().unwrap();
            if shared.started {
                return Err(Error::Running);
            }
            shared.started = true;
            drop(shared);
            self.parts.lock().unwrap().take().ok_or(Error::Running)?
        };
        runtime::run_forever(self.shared.clone(), queue, self.sender.clone(), poll, self.clock.clone());
        Err(Error::InvalidUrl)
    }
}
