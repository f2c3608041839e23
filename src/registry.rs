//! In-flight request bookkeeping: allocates correlation ids, tracks deadlines,
//! and resolves or times out awaited responses.

use crate::error::{Error, Result};

/// Maximum number of simultaneously in-flight requests.
pub const MAX_AWAITING: usize = 32;

/// Monotonic time unit, convertible to/from milliseconds by the platform
/// clock. Kept as a thin newtype so the registry and readiness loop never
/// confuse ticks with raw millisecond counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Advance by a raw tick count. Call sites that start from a millisecond
    /// duration should go through `Clock::deadline_after_ms` instead, which
    /// applies the backend's ms-to-tick conversion first.
    pub const fn saturating_add_ticks(self, ticks: u64) -> Self {
        Tick(self.0.saturating_add(ticks))
    }

    /// Host-backend convenience: ticks are milliseconds on `StdClock`, so
    /// call sites holding only a millisecond count and no `Clock` handle
    /// (tests, mostly) can still build a deadline directly.
    pub const fn saturating_add_ms(self, ms: u32) -> Self {
        self.saturating_add_ticks(ms as u64)
    }

    pub const fn saturating_sub(self, other: Tick) -> u64 {
        self.0.saturating_sub(other.0)
    }
}

/// Invoked when a request resolves (server responded) or times out locally.
/// Boxed so callers can close over arbitrary user data; `user_data` is also
/// passed explicitly to mirror the reference API's `(handler, user_data)`
/// pairing rather than relying solely on closure capture.
pub type ResponseCallback = Box<dyn FnMut(u16, &mut dyn std::any::Any) + Send>;

struct Slot {
    id: u16,
    deadline: Tick,
    handler: ResponseCallback,
    user_data: Box<dyn std::any::Any + Send>,
}

/// Fixed-capacity table of in-flight requests awaiting a `RESPONSE` frame.
///
/// An `id` of `0` marks an empty slot — ids `1..=65535` are the valid range.
/// Lookups and expirations are linear scans; at 32 slots this is simpler and
/// faster than a hash map.
pub struct RequestRegistry {
    slots: [Option<Slot>; MAX_AWAITING],
    next_id: u16,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self {
            slots: [const { None }; MAX_AWAITING],
            next_id: 1,
        }
    }

    /// Allocate the next id. If `handler` is `Some`, also installs an
    /// awaiter in the first free slot; returns `0` if the table is full
    /// (caller treats this as a fatal allocation failure and disconnects).
    /// If the 16-bit counter wraps, all awaiters are cleared first (the
    /// simple wrap policy from §4.3).
    pub fn allocate_id(
        &mut self,
        deadline: Tick,
        handler: Option<ResponseCallback>,
        user_data: Box<dyn std::any::Any + Send>,
    ) -> u16 {
        if self.next_id == u16::MAX {
            self.next_id = 0;
            self.clear_all();
        }
        let id = self.next_id;
        self.next_id += 1;

        let Some(handler) = handler else {
            return id;
        };

        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(slot) => {
                *slot = Some(Slot { id, deadline, handler, user_data });
                id
            }
            None => 0,
        }
    }

    /// Resolve the awaiter matching `id` with `status`, clearing its slot.
    /// Unknown ids are silently dropped.
    pub fn resolve(&mut self, id: u16, status: u16) {
        if id == 0 {
            return;
        }
        if let Some(slot) = self.slots.iter_mut().find(|s| matches!(s, Some(s) if s.id == id)) {
            if let Some(mut s) = slot.take() {
                (s.handler)(status, s.user_data.as_mut());
            }
        }
    }

    /// Invoke `Timeout` on every awaiter whose deadline has passed, clearing
    /// each slot. Scans in slot order, so ties resolve lowest-index-first.
    pub fn expire(&mut self, now: Tick) {
        for slot in &mut self.slots {
            let expired = matches!(slot, Some(s) if s.deadline <= now);
            if expired {
                if let Some(mut s) = slot.take() {
                    (s.handler)(crate::frame::StatusCode::Timeout.as_u16(), s.user_data.as_mut());
                }
            }
        }
    }

    /// Ticks until the nearest active deadline, or `None` if no awaiters are
    /// active. Returns `Some(0)` if a deadline has already elapsed.
    pub fn closest_deadline(&self, now: Tick) -> Option<u64> {
        self.slots
            .iter()
            .filter_map(|s| s.as_ref())
            .map(|s| s.deadline.saturating_sub(now))
            .min()
    }

    /// Number of currently active awaiters. Used by tests asserting the
    /// post-disconnect invariant that the table is empty.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Clear every slot without invoking handlers — used on session teardown.
    pub fn clear_all(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a command-name prefix used for handler registration: must be
/// non-empty and fit within the 5-byte prefix.
pub fn validate_handler_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 5 {
        return Err(Error::Mem);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_handler(counter: Arc<AtomicU32>) -> (ResponseCallback, Box<dyn std::any::Any + Send>) {
        let cb: ResponseCallback = Box::new(move |_status, _data| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (cb, Box::new(()))
    }

    #[test]
    fn allocate_without_handler_does_not_consume_slot() {
        let mut reg = RequestRegistry::new();
        let id = reg.allocate_id(Tick(0), None, Box::new(()));
        assert_eq!(id, 1);
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn allocate_with_handler_registers_awaiter() {
        let mut reg = RequestRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let (cb, data) = counting_handler(counter.clone());
        let id = reg.allocate_id(Tick(100), Some(cb), data);
        assert_eq!(id, 1);
        assert_eq!(reg.active_count(), 1);

        reg.resolve(id, 200);
        assert_eq!(reg.active_count(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resolve_unknown_id_is_noop() {
        let mut reg = RequestRegistry::new();
        reg.resolve(999, 200);
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn expire_invokes_timeout_and_clears_slot() {
        let mut reg = RequestRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let (cb, data) = counting_handler(counter.clone());
        reg.allocate_id(Tick(10), Some(cb), data);

        reg.expire(Tick(5));
        assert_eq!(reg.active_count(), 1, "deadline not yet reached");

        reg.expire(Tick(10));
        assert_eq!(reg.active_count(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closest_deadline_reports_minimum() {
        let mut reg = RequestRegistry::new();
        let (cb1, d1) = counting_handler(Arc::new(AtomicU32::new(0)));
        let (cb2, d2) = counting_handler(Arc::new(AtomicU32::new(0)));
        reg.allocate_id(Tick(50), Some(cb1), d1);
        reg.allocate_id(Tick(20), Some(cb2), d2);

        assert_eq!(reg.closest_deadline(Tick(0)), Some(20));
        assert_eq!(reg.closest_deadline(Tick(25)), Some(0));
    }

    #[test]
    fn full_table_returns_zero_on_allocation_failure() {
        let mut reg = RequestRegistry::new();
        for _ in 0..MAX_AWAITING {
            let (cb, data) = counting_handler(Arc::new(AtomicU32::new(0)));
            let id = reg.allocate_id(Tick(1000), Some(cb), data);
            assert_ne!(id, 0);
        }
        let (cb, data) = counting_handler(Arc::new(AtomicU32::new(0)));
        let id = reg.allocate_id(Tick(1000), Some(cb), data);
        assert_eq!(id, 0);
    }

    #[test]
    fn id_wraps_and_clears_all_awaiters() {
        let mut reg = RequestRegistry::new();
        // Prime the table with an awaiter that should be wiped by the wrap.
        let counter = Arc::new(AtomicU32::new(0));
        let (cb, data) = counting_handler(counter.clone());
        reg.allocate_id(Tick(5), Some(cb), data);
        assert_eq!(reg.active_count(), 1);

        reg.next_id = u16::MAX;
        let (cb2, data2) = counting_handler(Arc::new(AtomicU32::new(0)));
        let id = reg.allocate_id(Tick(5), Some(cb2), data2);
        assert_eq!(id, 0, "counter resets to 0 and that id is returned on the wrap call");
        assert_eq!(
            reg.active_count(),
            1,
            "wrap clears the prior awaiter before installing the new one"
        );
        assert_eq!(counter.load(Ordering::SeqCst), 0, "wrap clears without invoking handlers");

        let next = reg.allocate_id(Tick(5), None, Box::new(()));
        assert_eq!(next, 1);
    }

    #[test]
    fn validate_handler_name_enforces_length() {
        assert!(validate_handler_name("vw").is_ok());
        assert!(validate_handler_name("").is_err());
        assert!(validate_handler_name("toolong").is_err());
    }
}
