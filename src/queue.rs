//! Cross-thread outbound submission channel with a wake-up side signal.
//!
//! Any application thread may submit a [`Request`]; the runtime task is the
//! sole consumer. Built over `crossbeam_channel` for the bounded FIFO itself
//! and `mio::Waker` for the wake-up side channel — `mio::Waker` coalesces
//! redundant wakes and is registered in the same `mio::Poll` the runtime
//! already waits on for socket readiness, so a waiting runtime cannot miss a
//! wake that happened before it called `poll()` (see the wake-up design note
//! this crate resolves).

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::registry::{ResponseCallback, Tick};

/// Minimum outbound queue capacity per the specification.
pub const QUEUE_CAPACITY: usize = 5;

/// An outbound record submitted by application code, consumed by the runtime.
pub struct Request {
    pub frame: Frame,
    pub deadline: Option<Tick>,
    pub handler: Option<ResponseCallback>,
    pub user_data: Box<dyn Any + Send>,
}

impl Request {
    pub fn new(frame: Frame) -> Self {
        Self { frame, deadline: None, handler: None, user_data: Box::new(()) }
    }

    pub fn with_callback(
        frame: Frame,
        deadline: Tick,
        handler: ResponseCallback,
        user_data: Box<dyn Any + Send>,
    ) -> Self {
        Self { frame, deadline: Some(deadline), handler: Some(handler), user_data }
    }
}

/// Producer-side handle: cloned across application threads.
#[derive(Clone)]
pub struct OutboundSender {
    sender: crossbeam_channel::Sender<Request>,
    waker: Arc<mio::Waker>,
}

impl OutboundSender {
    /// Enqueue `req`, blocking up to `wait` for room in the queue. On
    /// success, wakes the runtime's readiness loop. Fails with `Error::Mem`
    /// if the queue is still full after `wait`.
    pub fn submit(&self, req: Request, wait: Duration) -> Result<()> {
        match self.sender.send_timeout(req, wait) {
            Ok(()) => {
                if let Err(e) = self.waker.wake() {
                    log::warn!("outbound queue: wake-up signal failed: {e}");
                }
                Ok(())
            }
            Err(_) => Err(Error::Mem),
        }
    }
}

/// Consumer-side handle, owned exclusively by the runtime task.
pub struct OutboundQueue {
    receiver: crossbeam_channel::Receiver<Request>,
}

impl OutboundQueue {
    /// Build a bounded queue of at least [`QUEUE_CAPACITY`] slots, paired
    /// with a waker already registered against the runtime's `mio::Poll`.
    pub fn new(waker: Arc<mio::Waker>) -> (OutboundSender, Self) {
        let (tx, rx) = crossbeam_channel::bounded(QUEUE_CAPACITY);
        (OutboundSender { sender: tx, waker }, Self { receiver: rx })
    }

    /// Non-blocking drain of a single record.
    pub fn try_pop(&self) -> Option<Request> {
        self.receiver.try_recv().ok()
    }

    /// Drop all enqueued records. Called on session teardown.
    pub fn reset(&self) {
        while self.receiver.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Command;
    use mio::Poll;

    fn test_queue() -> (OutboundSender, OutboundQueue, Poll) {
        let poll = Poll::new().unwrap();
        let waker = Arc::new(mio::Waker::new(poll.registry(), mio::Token(99)).unwrap());
        let (tx, rx) = OutboundQueue::new(waker);
        (tx, rx, poll)
    }

    #[test]
    fn submit_then_pop_round_trips() {
        let (tx, rx, _poll) = test_queue();
        let frame = Frame::new(Command::Hardware, 0, b"vw\x001");
        tx.submit(Request::new(frame), Duration::from_millis(10)).unwrap();

        let popped = rx.try_pop().expect("record should be present");
        assert_eq!(popped.frame.command, Command::Hardware as u8);
    }

    #[test]
    fn try_pop_on_empty_queue_is_none() {
        let (_tx, rx, _poll) = test_queue();
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn submit_wakes_the_poll() {
        let (tx, _rx, mut poll) = test_queue();
        let frame = Frame::new(Command::Ping, 0, b"");
        tx.submit(Request::new(frame), Duration::from_millis(10)).unwrap();

        let mut events = mio::Events::with_capacity(4);
        poll.poll(&mut events, Some(Duration::from_millis(100))).unwrap();
        assert!(events.iter().any(|e| e.token() == mio::Token(99)));
    }

    #[test]
    fn full_queue_fails_with_mem_after_wait() {
        let (tx, _rx, _poll) = test_queue();
        for _ in 0..QUEUE_CAPACITY {
            tx.submit(Request::new(Frame::new(Command::Ping, 0, b"")), Duration::from_millis(1))
                .unwrap();
        }
        let result = tx.submit(Request::new(Frame::new(Command::Ping, 0, b"")), Duration::from_millis(1));
        assert_eq!(result, Err(Error::Mem));
    }

    #[test]
    fn reset_drops_all_pending_records() {
        let (tx, rx, _poll) = test_queue();
        tx.submit(Request::new(Frame::new(Command::Ping, 0, b"")), Duration::from_millis(1)).unwrap();
        tx.submit(Request::new(Frame::new(Command::Ping, 0, b"")), Duration::from_millis(1)).unwrap();
        rx.reset();
        assert!(rx.try_pop().is_none());
    }
}
