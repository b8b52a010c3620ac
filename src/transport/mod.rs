//! Command transport seam towards the daemon's port layer.
//!
//! The daemon owns the serial ports and the actual AT/QMI/MBIM plumbing;
//! plugins only ever hand it one command at a time and wait for the single
//! completion. One request per logical port is in flight at any moment.

use std::time::Duration;

use async_trait::async_trait;

use crate::core::Result;

/// Scripted transport for tests and examples.
pub mod mock;

/// Logical AT port of a modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtPort {
    /// Primary AT port.
    Primary,
    /// Secondary AT port, when the modem exposes one.
    Secondary,
}

/// Executes single commands against a modem.
///
/// Implemented by the daemon's port layer. A timeout is reported as a
/// regular command failure; the plugins treat both identically.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Run `command` on `port` and return the raw response text.
    ///
    /// `allow_cache` permits the port layer to answer probe commands
    /// (`AT+FOO=?`) from its response cache instead of hitting the device.
    ///
    /// # Errors
    ///
    /// [`crate::ModemError::Transport`] or [`crate::ModemError::Timeout`]
    /// when the command fails or does not answer in time.
    async fn execute(
        &self,
        port: AtPort,
        command: &str,
        timeout: Duration,
        allow_cache: bool,
    ) -> Result<String>;
}
