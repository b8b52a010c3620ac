//! Initial EPS bearer settings sequence.
//!
//! `+UCGDFLT` availability is probed before the operation lock is taken,
//! so an unsupported device or IP type short-circuits without ever
//! acquiring it. Once the lock is held the sequence checks that the SIM is
//! powered, drops RF if needed, writes the default context and restores RF
//! before releasing, keeping the first error across the whole unwind.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::{ModemError, Result};
use crate::sequencer::{self, Flow, OperationToken, Sequence, Step};

use super::commands;
use super::modem::{CONTEXT_TIMEOUT, PROBE_TIMEOUT, UbloxModem};
use super::types::{EpsBearerSettings, IpFamily};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SetInitialEpsStep {
    First,
    ProbeSupport,
    Acquire,
    CheckMode,
    RadioOff,
    Apn,
    RadioOn,
    Release,
    Last,
}

impl Step for SetInitialEpsStep {
    const FIRST: Self = SetInitialEpsStep::First;
    const LAST: Self = SetInitialEpsStep::Last;

    fn next(self) -> Self {
        match self {
            SetInitialEpsStep::First => SetInitialEpsStep::ProbeSupport,
            SetInitialEpsStep::ProbeSupport => SetInitialEpsStep::Acquire,
            SetInitialEpsStep::Acquire => SetInitialEpsStep::CheckMode,
            SetInitialEpsStep::CheckMode => SetInitialEpsStep::RadioOff,
            SetInitialEpsStep::RadioOff => SetInitialEpsStep::Apn,
            SetInitialEpsStep::Apn => SetInitialEpsStep::RadioOn,
            SetInitialEpsStep::RadioOn => SetInitialEpsStep::Release,
            SetInitialEpsStep::Release | SetInitialEpsStep::Last => SetInitialEpsStep::Last,
        }
    }
}

struct SetInitialEpsSequence<'a> {
    modem: &'a UbloxModem,
    settings: EpsBearerSettings,
    /// Raw `+CFUN` mode captured at `CheckMode`; set exactly once.
    initial_cfun_mode: u32,
    token: Option<OperationToken>,
}

impl SetInitialEpsSequence<'_> {
    fn requested_family(&self) -> IpFamily {
        match self.settings.ip_type {
            IpFamily::Any => IpFamily::V4,
            family => family,
        }
    }
}

#[async_trait]
impl Sequence for SetInitialEpsSequence<'_> {
    type Step = SetInitialEpsStep;

    fn name(&self) -> &'static str {
        "set-initial-eps-bearer"
    }

    async fn run_step(&mut self, step: SetInitialEpsStep) -> Result<Flow<SetInitialEpsStep>> {
        match step {
            SetInitialEpsStep::First => Ok(Flow::Advance),

            SetInitialEpsStep::ProbeSupport => {
                let response = match self.modem.at_cached("+UCGDFLT=?", PROBE_TIMEOUT).await {
                    Ok(response) => response,
                    Err(err) => {
                        debug!("+UCGDFLT command is not supported: {err}");
                        return Err(ModemError::Unsupported(
                            "initial EPS bearer settings".to_string(),
                        ));
                    }
                };

                let families = commands::parse_ucgdflt_test_response(&response)?;
                let requested = self.requested_family();
                if !families.contains(&requested) {
                    debug!(
                        "+UCGDFLT command is not supported for bearer type '{}'",
                        requested.pdp_type()
                    );
                    return Err(ModemError::Unsupported(format!(
                        "ip type '{}'",
                        requested.pdp_type()
                    )));
                }
                Ok(Flow::Advance)
            }

            SetInitialEpsStep::Acquire => {
                debug!("acquiring power operation...");
                self.token = Some(self.modem.lock().acquire()?);
                Ok(Flow::Advance)
            }

            SetInitialEpsStep::CheckMode => {
                let response = self.modem.at("+CFUN?", PROBE_TIMEOUT).await?;
                let mode = commands::parse_cfun_query(&response)?;
                debug!("current functionality mode: {mode}");
                if mode != 1 && mode != 4 {
                    return Err(ModemError::WrongState(
                        "cannot setup the default LTE bearer settings: the SIM must be powered"
                            .to_string(),
                    ));
                }
                self.initial_cfun_mode = mode;
                Ok(Flow::Advance)
            }

            SetInitialEpsStep::RadioOff => {
                if self.initial_cfun_mode != 4 {
                    self.modem.at("+CFUN=4", PROBE_TIMEOUT).await?;
                }
                Ok(Flow::Advance)
            }

            SetInitialEpsStep::Apn => {
                let mut settings = self.settings.clone();
                settings.ip_type = self.requested_family();
                debug!(
                    "configuring default context with APN '{}' and PDP type '{}'",
                    settings.apn,
                    settings.ip_type.pdp_type()
                );
                let command = commands::build_ucgdflt_set_command(&settings);
                if let Err(err) = self.modem.at(&command, CONTEXT_TIMEOUT).await {
                    warn!("couldn't set initial default bearer settings: {err}");
                    return Err(err);
                }
                Ok(Flow::Advance)
            }

            SetInitialEpsStep::RadioOn => {
                if self.initial_cfun_mode == 1 {
                    if let Err(err) = self.modem.at("+CFUN=1", PROBE_TIMEOUT).await {
                        warn!("couldn't set RF back on: {err}");
                        return Err(err);
                    }
                }
                Ok(Flow::Advance)
            }

            SetInitialEpsStep::Release => {
                debug!("releasing power operation...");
                let token = self.token.take();
                debug_assert!(token.is_some(), "release step reached without the lock");
                if let Some(token) = token {
                    self.modem.lock().release(token);
                }
                Ok(Flow::Advance)
            }

            SetInitialEpsStep::Last => Ok(Flow::Advance),
        }
    }

    fn cleanup_step(&self, failed: SetInitialEpsStep) -> SetInitialEpsStep {
        match failed {
            // Lock not acquired yet; short-circuit to the report.
            SetInitialEpsStep::First
            | SetInitialEpsStep::ProbeSupport
            | SetInitialEpsStep::Acquire => SetInitialEpsStep::Last,
            // RF untouched so far.
            SetInitialEpsStep::CheckMode | SetInitialEpsStep::RadioOff => {
                SetInitialEpsStep::Release
            }
            // RF was dropped; recover it before returning the error.
            SetInitialEpsStep::Apn => SetInitialEpsStep::RadioOn,
            SetInitialEpsStep::RadioOn => SetInitialEpsStep::Release,
            SetInitialEpsStep::Release | SetInitialEpsStep::Last => SetInitialEpsStep::Last,
        }
    }
}

/// Run the full initial-EPS-bearer configuration sequence.
pub(super) async fn run(modem: &UbloxModem, settings: EpsBearerSettings) -> Result<()> {
    let mut sequence = SetInitialEpsSequence {
        modem,
        settings,
        initial_cfun_mode: 0,
        token: None,
    };
    sequencer::run(&mut sequence).await
}
