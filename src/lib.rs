//! Connection runtime for IoT devices speaking the Blynk binary protocol.
//!
//! [`device::Device`] is the entry point: construct one with
//! [`device::Device::begin`] or [`device::Device::with_config`], register
//! command handlers, then call [`device::Device::run`] to drive the
//! connection on the calling thread.

#![deny(unused_must_use)]

pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod handlers;
pub mod parser;
pub mod payload;
pub mod platform;
pub mod queue;
pub mod registry;
pub mod runtime;
pub mod session;

pub use device::Device;
pub use error::{Error, Result};
pub use frame::{Command, Frame, StatusCode};
pub use session::{ConnectionState, DisconnectReason};
