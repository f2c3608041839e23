//! Host platform backend.
//!
//! The runtime components in the rest of this crate are written against the
//! narrow `Clock`/`Transport` interfaces below rather than against `std`,
//! `mio`, or the network directly — mirroring this codebase's own
//! hexagonal split between domain logic and adapters. This module is the
//! only place that ships a concrete backend; an embedded target would swap
//! in its own.

pub mod clock;
pub mod transport;

pub use clock::{Clock, StdClock};
pub use transport::Transport;
