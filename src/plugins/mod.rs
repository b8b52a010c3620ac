//! Vendor plugin implementations.

use async_trait::async_trait;

use crate::core::Result;

/// Telit-specific service notification handling.
pub mod telit;
/// u-blox modem family plugin.
pub mod ublox;

/// Availability of one probed device feature.
///
/// Starts out [`FeatureSupport::Unknown`] and settles once the per-model
/// capability record is loaded; the record is never recomputed for the life
/// of a modem instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureSupport {
    /// Not probed yet.
    #[default]
    Unknown,
    /// The device supports the feature.
    Supported,
    /// The device does not support the feature.
    Unsupported,
}

/// Base unsolicited-event reporting behavior provided by the daemon.
///
/// Plugins layer their vendor-specific reporting on top of this: enabling
/// runs the base behavior first and the override second, disabling runs
/// them in the opposite order. The collaborator is injected at
/// construction time rather than resolved from process-wide statics.
#[async_trait]
pub trait UnsolicitedEvents: Send + Sync {
    /// Turn on generic unsolicited event reporting.
    async fn enable(&self) -> Result<()>;

    /// Turn off generic unsolicited event reporting.
    async fn disable(&self) -> Result<()>;
}
