//! Device configuration.
//!
//! Mutable across threads under a single mutex (see [`crate::device`]);
//! the runtime snapshots fields under the mutex and works from the copy,
//! per the read-copy-update convention the rest of this crate uses for
//! shared state.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Server and timing parameters for one device connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// `host:port` of the cloud server.
    pub server_url: String,
    /// Auth token presented during `LOGIN`.
    pub auth_token: String,
    /// Per-request deadline, in milliseconds.
    pub connection_timeout_ms: u32,
    /// Interval between heartbeat `PING`s, in milliseconds.
    pub heartbeat_interval_ms: u32,
    /// Delay between reconnect attempts, in milliseconds.
    pub reconnect_delay_ms: u32,
}

impl DeviceConfig {
    /// Build a config with the default timing parameters and the given
    /// auth token, matching `begin(device, auth_token)` from the public API.
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self { auth_token: auth_token.into(), ..Self::default() }
    }

    /// Load a config from a JSON file. Only the demo binary calls this —
    /// the library core never touches the filesystem itself.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|_| Error::NotInitialized)?;
        serde_json::from_str(&data).map_err(|_| Error::NotInitialized)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            server_url: "blynk.cloud:8080".to_string(),
            auth_token: String::new(),
            connection_timeout_ms: 5000,
            heartbeat_interval_ms: 2000,
            reconnect_delay_ms: 5000,
        }
    }
}
