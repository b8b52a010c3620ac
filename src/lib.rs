//! Vendor plugins for a modem-management daemon.
//!
//! Each plugin adapts one cellular modem family's AT dialect to the common
//! modem abstraction exposed by the surrounding daemon. The daemon itself
//! (device enumeration, D-Bus exposure, port management, wire transports)
//! stays outside this crate and is reached through a small set of
//! collaborator traits. What lives here is the hard part the plugins share:
//!
//! - A step sequencer that drives multi-command modem operations through an
//!   explicit state machine, one transport round trip per state, with
//!   conditional skips, guaranteed cleanup and first-error-wins reporting.
//! - A per-modem operation lock serializing everything that touches radio
//!   power or band/mode configuration.
//! - A cached per-model capability prober used to pick command variants.
//! - Best-effort decoders for unsolicited modem notifications.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use modemd_plugins::ublox::{ModemMode, UbloxModem};
//! use modemd_plugins::transport::mock::MockTransport;
//!
//! # async fn example() -> modemd_plugins::Result<()> {
//! let transport = Arc::new(MockTransport::new());
//! let modem = UbloxModem::new(transport, "TOBY-L2", true);
//!
//! // Serialized against any other radio-state mutation on this modem.
//! modem.set_current_modes(ModemMode::M3G | ModemMode::M4G, None).await?;
//! # Ok(())
//! # }
//! ```

/// Core error types and result aliases.
pub mod core;

/// Generalized step-sequencing engine and the per-modem operation lock.
pub mod sequencer;

/// Command transport seam towards the daemon's port layer.
pub mod transport;

/// Bearer registry seam towards the daemon.
pub mod bearers;

/// Vendor plugin implementations.
mod plugins;

pub use crate::core::{ModemError, Result};

pub use plugins::{FeatureSupport, UnsolicitedEvents, telit, ublox};
