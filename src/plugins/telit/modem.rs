use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::core::Result;
use crate::plugins::UnsolicitedEvents;
use crate::transport::{AtPort, CommandTransport};

use super::events;

pub(super) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// One attached Telit modem.
///
/// Holds only what the service notification path needs: the command
/// transport for toggling the URC reporting, and the daemon's generic
/// unsolicited-event behavior to compose with.
pub struct TelitModem {
    transport: Arc<dyn CommandTransport>,
    base_events: Option<Arc<dyn UnsolicitedEvents>>,
}

impl TelitModem {
    /// Create a modem handle reachable through `transport`.
    pub fn new(transport: Arc<dyn CommandTransport>) -> Self {
        Self {
            transport,
            base_events: None,
        }
    }

    /// Inject the daemon's generic unsolicited-event behavior.
    ///
    /// When present, enabling service events runs it before the Telit
    /// specific reporting and disabling runs it after, mirroring the
    /// base-then-override call order.
    #[must_use]
    pub fn with_base_unsolicited_events(mut self, base: Arc<dyn UnsolicitedEvents>) -> Self {
        self.base_events = Some(base);
        self
    }

    /// Run `command` on the primary port.
    pub(super) async fn at(&self, command: &str, timeout: Duration) -> Result<String> {
        self.transport
            .execute(AtPort::Primary, command, timeout, false)
            .await
    }

    /// Enable service unsolicited event reporting.
    ///
    /// The daemon's base behavior (when injected) runs first and its errors
    /// propagate; failures of the Telit specific reporting are logged and
    /// swallowed, since the generic reporting still works without it.
    ///
    /// # Errors
    ///
    /// Only errors from the base behavior.
    pub async fn enable_service_unsolicited_events(&self) -> Result<()> {
        if let Some(base) = &self.base_events {
            base.enable().await?;
        }

        if let Err(err) = events::run(self, true).await {
            warn!("couldn't enable Telit-specific service unsolicited events: {err}");
        }
        Ok(())
    }

    /// Disable service unsolicited event reporting.
    ///
    /// The Telit specific reporting is torn down first, then the base
    /// behavior (when injected). Failures on either side are logged and
    /// swallowed; teardown keeps going regardless.
    ///
    /// # Errors
    ///
    /// None currently; kept for parity with the enable path.
    pub async fn disable_service_unsolicited_events(&self) -> Result<()> {
        if let Err(err) = events::run(self, false).await {
            warn!("couldn't disable Telit-specific service unsolicited events: {err}");
        }

        if let Some(base) = &self.base_events {
            if let Err(err) = base.disable().await {
                warn!("couldn't disable base unsolicited events: {err}");
            }
        }
        Ok(())
    }
}
