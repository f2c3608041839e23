//! The readiness loop and the outer session lifecycle that drives it.
//!
//! Everything in this module runs on one task: the runtime task spawned by
//! [`crate::device::Device::run`]. It owns the socket, the parser, the
//! in-flight request table, and the consumer end of the outbound queue —
//! nothing here is touched by application threads except through the
//! channel and the shared mutex in [`crate::session`].

use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mio::{Events, Interest, Poll, Token};

use crate::config::DeviceConfig;
use crate::dispatch::{self, Outcome};
use crate::frame::{Command, Frame, FrameCodec, StatusCode, HEADER_SIZE, MAX_PAYLOAD_LEN};
use crate::handlers::HandlerParams;
use crate::parser::ParserSM;
use crate::platform::{Clock, Transport};
use crate::platform::transport::TcpTransport;
use crate::queue::{OutboundQueue, OutboundSender, Request};
use crate::registry::{RequestRegistry, ResponseCallback};
use crate::session::{ConnectionState, DisconnectReason, SharedHandle};

const SOCKET: Token = Token(0);
const WRITE_BUF_LEN: usize = HEADER_SIZE + MAX_PAYLOAD_LEN;

/// Why one connection attempt ended.
enum SessionEnd {
    /// Reconnect after `reconnect_delay_ms`.
    Retry,
    /// The server url cannot be parsed at all; stop the outer loop.
    Fatal,
}

/// Drives connect → login → serve → disconnect → retry for the lifetime of
/// the device, until the process exits. Blocks the calling thread; `Device`
/// spawns this onto its own worker. Emits the `Stopped -> Disconnected`
/// transition once at startup before the first connect attempt.
pub fn run_forever(
    shared: SharedHandle,
    mut queue: OutboundQueue,
    internal_sender: OutboundSender,
    mut poll: Poll,
    clock: Arc<dyn Clock>,
) {
    shared.transition(ConnectionState::Disconnected, None);
    loop {
        let config = { shared.0.lock().unwrap().config.clone() };
        match run_session(&shared, &mut queue, &internal_sender, &mut poll, clock.as_ref(), &config) {
            SessionEnd::Fatal => {
                log::error!("blynklink runtime: server url `{}` does not parse, stopping", config.server_url);
                return;
            }
            SessionEnd::Retry => {
                std::thread::sleep(Duration::from_millis(u64::from(config.reconnect_delay_ms)));
            }
        }
    }
}

fn resolve_server(server_url: &str) -> std::result::Result<Option<SocketAddr>, ()> {
    let Some((host, port_str)) = server_url.rsplit_once(':') else {
        return Err(());
    };
    let Ok(port) = port_str.parse::<u16>() else {
        return Err(());
    };
    Ok((host, port).to_socket_addrs().ok().and_then(|mut it| it.next()))
}

fn run_session(
    shared: &SharedHandle,
    queue: &mut OutboundQueue,
    internal_sender: &OutboundSender,
    poll: &mut Poll,
    clock: &dyn Clock,
    config: &DeviceConfig,
) -> SessionEnd {
    let addr = match resolve_server(&config.server_url) {
        Err(()) => return SessionEnd::Fatal,
        Ok(None) => {
            shared.transition(ConnectionState::Disconnected, Some(DisconnectReason::Gai));
            return SessionEnd::Retry;
        }
        Ok(Some(addr)) => addr,
    };

    let mut transport = match TcpTransport::connect(addr) {
        Ok(t) => t,
        Err(e) => {
            shared.transition(ConnectionState::Disconnected, Some(io_reason(&e)));
            return SessionEnd::Retry;
        }
    };

    if let Err(e) = transport.register(poll.registry(), SOCKET, Interest::READABLE.add(Interest::WRITABLE)) {
        shared.transition(ConnectionState::Disconnected, Some(io_reason(&e)));
        return SessionEnd::Retry;
    }

    let connect_timeout = Duration::from_millis(u64::from(config.connection_timeout_ms));
    if let Err(reason) = wait_for_connect(poll, &mut transport, connect_timeout) {
        let _ = transport.deregister(poll.registry());
        shared.transition(ConnectionState::Disconnected, Some(reason));
        return SessionEnd::Retry;
    }

    shared.transition(ConnectionState::Connected, None);
    queue.reset();

    let reason = serve(shared, queue, internal_sender, poll, clock, config, &mut transport);

    let _ = transport.deregister(poll.registry());
    shared.transition(ConnectionState::Disconnected, Some(reason));
    SessionEnd::Retry
}

/// Wait for the nonblocking connect to complete, distinguishing success from
/// a refused/unreachable peer.
fn wait_for_connect(poll: &mut Poll, transport: &mut TcpTransport, timeout: Duration) -> std::result::Result<(), DisconnectReason> {
    let mut events = Events::with_capacity(4);
    poll.poll(&mut events, Some(timeout)).map_err(|_| DisconnectReason::System)?;
    if events.iter().all(|e| e.token() != SOCKET) {
        return Err(DisconnectReason::Timeout);
    }
    match transport.take_error() {
        Ok(None) => Ok(()),
        Ok(Some(e)) => Err(io_reason(&e)),
        Err(e) => Err(io_reason(&e)),
    }
}

fn io_reason(e: &io::Error) -> DisconnectReason {
    DisconnectReason::Errno(e.raw_os_error().unwrap_or(-1))
}

/// The authenticated-and-unauthenticated readiness loop: runs from just
/// after TCP connect until the session ends, one way or another.
fn serve(
    shared: &SharedHandle,
    queue: &mut OutboundQueue,
    internal_sender: &OutboundSender,
    poll: &mut Poll,
    clock: &dyn Clock,
    config: &DeviceConfig,
    transport: &mut TcpTransport,
) -> DisconnectReason {
    let mut parser = ParserSM::new();
    let mut registry = RequestRegistry::new();
    let mut write_buf = [0u8; WRITE_BUF_LEN];
    let mut write_pos = 0usize;
    let mut write_len = 0usize;
    let mut write_interest = true;
    let mut authenticated = false;
    let heartbeat_failed = Arc::new(AtomicBool::new(false));

    let login_deadline = clock.deadline_after_ms(config.connection_timeout_ms);
    let mut heartbeat_deadline = clock.deadline_after_ms(config.heartbeat_interval_ms);

    {
        let auth_token = { shared.0.lock().unwrap().config.auth_token.clone() };
        let login = Frame::new(Command::Login, 0, auth_token.as_bytes());
        write_len = FrameCodec::encode(&login, &mut write_buf);
        write_pos = 0;
    }

    let mut read_buf = [0u8; 1024];
    let mut events = Events::with_capacity(16);

    loop {
        if write_pos >= write_len {
            if let Some(req) = queue.try_pop() {
                let mut frame = req.frame;
                if frame.id == 0 && !frame.is_response() {
                    let now = clock.now();
                    let deadline = req.deadline.unwrap_or(now);
                    let id = registry.allocate_id(deadline, req.handler, req.user_data);
                    if id == 0 {
                        return DisconnectReason::Mem;
                    }
                    frame.id = id;
                }
                write_len = FrameCodec::encode(&frame, &mut write_buf);
                write_pos = 0;
            }
        }
        let want_write = write_pos < write_len;
        if want_write != write_interest {
            let interest = if want_write { Interest::READABLE.add(Interest::WRITABLE) } else { Interest::READABLE };
            if let Err(e) = transport.reregister(poll.registry(), SOCKET, interest) {
                return io_reason(&e);
            }
            write_interest = want_write;
        }

        let now = clock.now();
        let mut wait_ms = heartbeat_deadline.saturating_sub(now);
        if !authenticated {
            wait_ms = wait_ms.min(login_deadline.saturating_sub(now));
        }
        if let Some(d) = registry.closest_deadline(now) {
            wait_ms = wait_ms.min(d);
        }
        if poll.poll(&mut events, Some(Duration::from_millis(wait_ms))).is_err() {
            return DisconnectReason::System;
        }

        let now = clock.now();
        registry.expire(now);
        if heartbeat_failed.load(Ordering::SeqCst) {
            return DisconnectReason::Timeout;
        }
        if !authenticated && now >= login_deadline {
            return DisconnectReason::Timeout;
        }
        if now >= heartbeat_deadline {
            heartbeat_deadline = clock.deadline_after_ms(config.heartbeat_interval_ms);
            let hf = heartbeat_failed.clone();
            let handler: ResponseCallback = Box::new(move |status, _| {
                if !StatusCode::is_success(status) {
                    hf.store(true, Ordering::SeqCst);
                }
            });
            let req = Request::with_callback(
                Frame::new(Command::Ping, 0, b""),
                clock.deadline_after_ms(config.connection_timeout_ms),
                handler,
                Box::new(()),
            );
            if let Err(e) = internal_sender.submit(req, Duration::ZERO) {
                log::warn!("blynklink runtime: heartbeat ping dropped: {e}");
            }
        }

        for event in events.iter() {
            if event.token() != SOCKET {
                continue;
            }
            if event.is_writable() && write_pos < write_len {
                match transport.write(&write_buf[write_pos..write_len]) {
                    Ok(0) => return DisconnectReason::Closed,
                    Ok(n) => write_pos += n,
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                    Err(e) => return io_reason(&e),
                }
            }
            if event.is_readable() {
                loop {
                    match transport.read(&mut read_buf) {
                        Ok(0) => return DisconnectReason::Closed,
                        Ok(n) => {
                            for &byte in &read_buf[..n] {
                                let Some(frame) = parser.feed_byte(byte) else { continue };
                                match dispatch::dispatch(&frame, &mut registry, !authenticated) {
                                    Outcome::None => {}
                                    Outcome::AutoResponse(resp) => {
                                        if let Err(e) = internal_sender.submit(Request::new(resp), Duration::ZERO) {
                                            log::warn!("blynklink runtime: auto-response dropped: {e}");
                                        }
                                    }
                                    Outcome::LoginResult(status) => {
                                        if StatusCode::is_success(status) {
                                            authenticated = true;
                                            shared.transition(ConnectionState::Authenticated, None);
                                        } else {
                                            return DisconnectReason::Status(status);
                                        }
                                    }
                                    Outcome::Hardware { id, command, argv } => {
                                        run_hardware_handler(shared, id, command, &argv, internal_sender);
                                    }
                                }
                            }
                        }
                        Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                        Err(e) => return io_reason(&e),
                    }
                }
            }
        }
    }
}

/// Look up and invoke a hardware-command handler, releasing the shared lock
/// before running user code. Emits `ILLEGAL_COMMAND` when nothing matches.
fn run_hardware_handler(
    shared: &SharedHandle,
    id: u16,
    command: &str,
    argv: &[&str],
    internal_sender: &OutboundSender,
) {
    let taken = { shared.0.lock().unwrap().handlers.take_matching(command) };
    let Some((idx, name, name_len, mut handler, mut user_data)) = taken else {
        let resp = Frame::response(id, StatusCode::IllegalCommand.as_u16());
        if let Err(e) = internal_sender.submit(Request::new(resp), Duration::ZERO) {
            log::warn!("blynklink runtime: illegal-command response dropped: {e}");
        }
        return;
    };

    let params = HandlerParams { id, command, argv };
    handler(&params, user_data.as_mut());

    let mut shared = shared.0.lock().unwrap();
    shared.handlers.restore(idx, name, name_len, handler, user_data);
}
