use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by plugin operations.
#[derive(Error, Debug)]
pub enum ModemError {
    /// Another mutating operation currently holds the modem's operation
    /// lock. The caller should retry later; nothing is queued.
    #[error("an operation which requires power updates is currently in progress")]
    Busy,

    /// A modem command failed or the port layer refused it.
    #[error("command '{command}' failed: {reason}")]
    Transport {
        /// Command that was being executed.
        command: String,
        /// Failure reported by the port layer.
        reason: String,
    },

    /// A modem command did not answer within its timeout.
    #[error("command '{command}' timed out after {timeout:?}")]
    Timeout {
        /// Command that was being executed.
        command: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The feature is not available on this device or model.
    #[error("{0} is unsupported")]
    Unsupported(String),

    /// A response could not be decoded into the expected value.
    #[error("failed to parse {what} from '{response}': {reason}")]
    Parse {
        /// What was being decoded.
        what: &'static str,
        /// Raw response text.
        response: String,
        /// Why decoding failed.
        reason: String,
    },

    /// A precondition for the operation does not hold.
    #[error("wrong state: {0}")]
    WrongState(String),
}

impl ModemError {
    /// Build a parse error for `what` out of a raw response.
    pub fn parse(what: &'static str, response: &str, reason: impl std::fmt::Display) -> Self {
        ModemError::Parse {
            what,
            response: response.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the caller may simply retry the operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModemError::Busy)
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ModemError>;
