//! Telit-specific service notification handling.
//!
//! Telit MBIM devices report service availability over AT unsolicited
//! lines (`#SRVLOSTENA`, `#5GRRCIND`). Losing service means every active
//! data session is dead no matter what any in-flight operation believes,
//! so the monitoring path force-disconnects all bearers through the
//! daemon's registry. The reporting itself is switched on and off through
//! the set forms of the same commands, layered on the daemon's generic
//! unsolicited-event handling.

/// Reporting enable/disable sequence.
mod events;
/// High-level modem handle.
mod modem;
/// Loss-of-service monitoring and its bearer side effect.
mod monitoring;
/// Unsolicited line decoding.
mod urc;

#[cfg(test)]
mod tests;

pub use modem::TelitModem;
pub use monitoring::ServiceMonitor;
pub use urc::{ServiceEvent, decode_service_urc};
