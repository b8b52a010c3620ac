use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::{ModemError, Result};
use crate::plugins::{FeatureSupport, UnsolicitedEvents};
use crate::sequencer::OperationLock;
use crate::transport::{AtPort, CommandTransport};

use super::commands;
use super::eps;
use super::modes_bands;
use super::support::{self, SupportConfig};
use super::types::{Band, EpsBearerSettings, ModemMode, PowerState};
use super::voice;

pub(super) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
pub(super) const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub(super) const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(10);
pub(super) const CONTEXT_TIMEOUT: Duration = Duration::from_secs(20);
const POWER_TIMEOUT: Duration = Duration::from_secs(30);

/// Default EPS bearer context id on u-blox devices.
const INITIAL_EPS_CID: u32 = 4;

/// One attached u-blox modem.
///
/// Owns the per-modem operation lock and the cached capability record;
/// everything hardware-bound goes through the injected transport. Mutating
/// operations are serialized through the lock; reads are idempotent and may
/// interleave freely with a held lock.
pub struct UbloxModem {
    transport: Arc<dyn CommandTransport>,
    model: String,
    has_secondary_port: bool,
    lock: OperationLock,
    support: OnceLock<SupportConfig>,
    any_allowed: Mutex<Option<ModemMode>>,
    base_events: Option<Arc<dyn UnsolicitedEvents>>,
}

impl UbloxModem {
    /// Create a modem handle for `model` reachable through `transport`.
    pub fn new(
        transport: Arc<dyn CommandTransport>,
        model: impl Into<String>,
        has_secondary_port: bool,
    ) -> Self {
        Self {
            transport,
            model: model.into(),
            has_secondary_port,
            lock: OperationLock::new(),
            support: OnceLock::new(),
            any_allowed: Mutex::new(None),
            base_events: None,
        }
    }

    /// Inject the daemon's generic unsolicited-event behavior.
    ///
    /// When present, enabling voice events runs it before the u-blox
    /// specific reporting and disabling runs it after, mirroring the
    /// base-then-override call order.
    #[must_use]
    pub fn with_base_unsolicited_events(mut self, base: Arc<dyn UnsolicitedEvents>) -> Self {
        self.base_events = Some(base);
        self
    }

    /// Model name this handle was created with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Per-model capability record, loaded on first use.
    ///
    /// An unrecognized model yields the most restrictive record instead of
    /// an error; failing to identify the device must never break probing.
    pub fn support_config(&self) -> SupportConfig {
        *self.support.get_or_init(|| match support::lookup(&self.model) {
            Some(config) => config,
            None => {
                warn!(
                    "loading support configuration failed: unknown model '{}'",
                    self.model
                );
                SupportConfig::restrictive()
            }
        })
    }

    pub(super) fn lock(&self) -> &OperationLock {
        &self.lock
    }

    pub(super) fn has_secondary_port(&self) -> bool {
        self.has_secondary_port
    }

    pub(super) fn udtmfd_support(&self) -> FeatureSupport {
        self.support_config().udtmfd
    }

    /// Run `command` on the primary port.
    pub(super) async fn at(&self, command: &str, timeout: Duration) -> Result<String> {
        self.transport
            .execute(AtPort::Primary, command, timeout, false)
            .await
    }

    /// Run a probe command on the primary port, allowing cached replies.
    pub(super) async fn at_cached(&self, command: &str, timeout: Duration) -> Result<String> {
        self.transport
            .execute(AtPort::Primary, command, timeout, true)
            .await
    }

    /// Run `command` on a specific port.
    pub(super) async fn at_on_port(
        &self,
        port: AtPort,
        command: &str,
        timeout: Duration,
    ) -> Result<String> {
        self.transport.execute(port, command, timeout, false).await
    }

    /// Query the current radio power state. Lock-free read.
    pub async fn load_power_state(&self) -> Result<PowerState> {
        let response = self.at("+CFUN?", DEFAULT_TIMEOUT).await?;
        commands::parse_cfun_power(&response)
    }

    /// Bring the radio to full functionality.
    pub async fn power_up(&self) -> Result<()> {
        self.power_operation("+CFUN=1").await
    }

    /// Put the device into low-power (airplane) mode.
    pub async fn power_down(&self) -> Result<()> {
        self.power_operation("+CFUN=4").await
    }

    /// Power the device off completely.
    pub async fn power_off(&self) -> Result<()> {
        self.power_operation("+CPWROFF").await
    }

    /// Reboot the device.
    pub async fn reset(&self) -> Result<()> {
        self.power_operation("+CFUN=16").await
    }

    /// Single-command power operations still bracket with the operation
    /// lock so they cannot interleave with a running configuration change.
    async fn power_operation(&self, command: &str) -> Result<()> {
        let token = self.lock.acquire()?;
        let result = self.at(command, POWER_TIMEOUT).await;
        self.lock.release(token);
        result.map(drop)
    }

    /// Query the currently allowed/preferred modes. Lock-free read.
    pub async fn load_current_modes(&self) -> Result<(ModemMode, Option<ModemMode>)> {
        let response = self.at("+URAT?", DEFAULT_TIMEOUT).await?;
        commands::parse_urat_read_response(&response)
    }

    /// Query the supported mode combinations. Lock-free read.
    ///
    /// Also decides and caches the combination applied when a caller asks
    /// for [`ModemMode::ANY`].
    pub async fn load_supported_modes(&self) -> Result<Vec<ModemMode>> {
        let response = self.at_cached("+URAT=?", DEFAULT_TIMEOUT).await?;
        let combinations = commands::parse_urat_test_response(&response)?;

        let any = commands::mode_any_from_combinations(&combinations);
        debug!("mode combination applied when any requested: {any:?}");
        *self
            .any_allowed
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(any);

        Ok(combinations)
    }

    fn resolve_any(&self, allowed: ModemMode) -> ModemMode {
        if allowed != ModemMode::ANY {
            return allowed;
        }
        self.any_allowed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unwrap_or(ModemMode::ANY)
    }

    /// Set the allowed (and optionally preferred) network modes.
    ///
    /// Runs the full configuration sequence under the operation lock,
    /// including whatever radio bracket the model requires.
    ///
    /// # Errors
    ///
    /// [`ModemError::Busy`] when another mutating operation is in flight;
    /// [`ModemError::Unsupported`] for combinations the dialect cannot
    /// express; transport errors from the underlying commands.
    pub async fn set_current_modes(
        &self,
        allowed: ModemMode,
        preferred: Option<ModemMode>,
    ) -> Result<()> {
        let allowed = self.resolve_any(allowed);
        let command = commands::build_urat_set_command(allowed, preferred)?;
        modes_bands::run(self, command).await
    }

    /// Set the configured frequency bands.
    ///
    /// Picks `+UACT` or `+UBANDSEL` based on the capability record.
    ///
    /// # Errors
    ///
    /// [`ModemError::Unsupported`] when the model supports neither band
    /// command; otherwise as [`UbloxModem::set_current_modes`].
    pub async fn set_current_bands(&self, bands: &[Band]) -> Result<()> {
        let config = self.support_config();
        let command = if config.uact == FeatureSupport::Supported {
            commands::build_uact_set_command(bands)?
        } else if config.ubandsel == FeatureSupport::Supported {
            commands::build_ubandsel_set_command(bands)?
        } else {
            return Err(ModemError::Unsupported("band configuration".to_string()));
        };
        modes_bands::run(self, command).await
    }

    /// Query the currently configured bands. Lock-free read.
    pub async fn load_current_bands(&self) -> Result<Vec<Band>> {
        let config = self.support_config();

        if config.ubandsel == FeatureSupport::Supported {
            let response = self.at("+UBANDSEL?", DEFAULT_TIMEOUT).await?;
            let supported = support::supported_bands(&self.model).unwrap_or(&[]);
            return commands::parse_ubandsel_response(&response, supported);
        }

        if config.uact == FeatureSupport::Supported {
            let response = self.at("+UACT?", DEFAULT_TIMEOUT).await?;
            return commands::parse_uact_response(&response);
        }

        Err(ModemError::Unsupported("loading current bands".to_string()))
    }

    /// Bands this model can be configured with, from the static dataset.
    ///
    /// # Errors
    ///
    /// [`ModemError::Unsupported`] when the model is not in the dataset.
    pub fn load_supported_bands(&self) -> Result<Vec<Band>> {
        support::supported_bands(&self.model)
            .map(<[Band]>::to_vec)
            .ok_or_else(|| {
                ModemError::Unsupported(format!("band list for model '{}'", self.model))
            })
    }

    /// Configure the initial (attach) EPS bearer.
    ///
    /// # Errors
    ///
    /// [`ModemError::Unsupported`] when the device rejects `+UCGDFLT` or
    /// the requested IP type; [`ModemError::WrongState`] when the SIM is
    /// not powered; [`ModemError::Busy`] when the lock is held.
    pub async fn set_initial_eps_bearer(&self, settings: EpsBearerSettings) -> Result<()> {
        eps::run(self, settings).await
    }

    /// Read back the initial EPS bearer settings. Lock-free read.
    ///
    /// Failures here are not fatal; a device that cannot report its default
    /// context yields empty settings, as the daemon expects.
    pub async fn load_initial_eps_bearer(&self) -> EpsBearerSettings {
        let response = match self.at("+CGDCONT?", CONTEXT_TIMEOUT).await {
            Ok(response) => response,
            Err(err) => {
                debug!("couldn't load context {INITIAL_EPS_CID} status: {err}");
                return EpsBearerSettings::default();
            }
        };

        let contexts = match commands::parse_cgdcont_read_response(&response) {
            Ok(contexts) => contexts,
            Err(err) => {
                debug!("couldn't parse CGDCONT response: {err}");
                return EpsBearerSettings::default();
            }
        };

        match contexts.into_iter().find(|context| context.cid == INITIAL_EPS_CID) {
            Some(context) => EpsBearerSettings {
                apn: context.apn,
                ip_type: context.ip_type,
                ..EpsBearerSettings::default()
            },
            None => {
                debug!("no status reported for context {INITIAL_EPS_CID}");
                EpsBearerSettings::default()
            }
        }
    }

    /// Enable voice unsolicited event reporting.
    ///
    /// The daemon's base behavior (when injected) runs first and its errors
    /// propagate; failures of the u-blox specific reporting are logged and
    /// swallowed, since the generic reporting still works without it.
    ///
    /// # Errors
    ///
    /// Only errors from the base behavior.
    pub async fn enable_voice_unsolicited_events(&self) -> Result<()> {
        if let Some(base) = &self.base_events {
            base.enable().await?;
        }

        if let Err(err) = voice::run(self, true).await {
            warn!("couldn't enable u-blox-specific voice unsolicited events: {err}");
        }
        Ok(())
    }

    /// Disable voice unsolicited event reporting.
    ///
    /// The u-blox specific reporting is torn down first, then the base
    /// behavior (when injected); only base errors propagate.
    ///
    /// # Errors
    ///
    /// Only errors from the base behavior.
    pub async fn disable_voice_unsolicited_events(&self) -> Result<()> {
        if let Err(err) = voice::run(self, false).await {
            warn!("couldn't disable u-blox-specific voice unsolicited events: {err}");
        }

        if let Some(base) = &self.base_events {
            base.disable().await?;
        }
        Ok(())
    }
}
