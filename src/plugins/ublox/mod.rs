//! u-blox modem family plugin.
//!
//! Adapts the u-blox AT dialect (`+URAT`, `+UBANDSEL`, `+UACT`,
//! `+UCGDFLT`, `+UCALLSTAT`, ...) to the common modem abstraction. Which
//! command variant a given device needs, and whether a radio-off or
//! deregistration bracket is required around configuration changes, comes
//! from a per-model capability table loaded once per modem instance.

/// AT command builders and response parsers.
mod commands;
/// Initial EPS bearer settings sequences.
mod eps;
/// Set-current-modes/bands sequence.
mod modes_bands;
/// High-level modem handle and public operations.
mod modem;
/// Stream-driven voice notification dispatch.
mod monitoring;
/// Per-model capability table.
mod support;
/// Type definitions for modes, bands, power and call state.
mod types;
/// Voice unsolicited event sequence and decoders.
mod voice;

#[cfg(test)]
mod tests;

pub use modem::UbloxModem;
pub use monitoring::VoiceMonitor;
pub use support::{SettingsUpdateMethod, SupportConfig};
pub use types::{
    Band, CallDirection, CallInfo, CallState, EpsBearerSettings, IpFamily, ModemMode, PowerState,
    VoiceEvent,
};
pub use voice::decode_voice_urc;
