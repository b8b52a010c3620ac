//! Set-current-modes/bands sequence.
//!
//! Both operations share one state machine: build the update command up
//! front, take the operation lock, bracket the command with whatever the
//! model's capability record demands (a `+CFUN` power cycle or a `+COPS`
//! deregistration), and converge on the terminal step whatever happens in
//! between. A failure of the mutating command still unwinds the bracket
//! before the lock is released and the first error reported.

use async_trait::async_trait;
use tracing::debug;

use crate::core::Result;
use crate::sequencer::{self, Flow, OperationToken, Sequence, Step};

use super::commands;
use super::modem::{DEFAULT_TIMEOUT, REGISTRATION_TIMEOUT, UbloxModem};
use super::support::SettingsUpdateMethod;
use super::types::PowerState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SetModesBandsStep {
    First,
    Acquire,
    CheckPower,
    BeforeCommand,
    Command,
    AfterCommand,
    Release,
    Last,
}

impl Step for SetModesBandsStep {
    const FIRST: Self = SetModesBandsStep::First;
    const LAST: Self = SetModesBandsStep::Last;

    fn next(self) -> Self {
        match self {
            SetModesBandsStep::First => SetModesBandsStep::Acquire,
            SetModesBandsStep::Acquire => SetModesBandsStep::CheckPower,
            SetModesBandsStep::CheckPower => SetModesBandsStep::BeforeCommand,
            SetModesBandsStep::BeforeCommand => SetModesBandsStep::Command,
            SetModesBandsStep::Command => SetModesBandsStep::AfterCommand,
            SetModesBandsStep::AfterCommand => SetModesBandsStep::Release,
            SetModesBandsStep::Release | SetModesBandsStep::Last => SetModesBandsStep::Last,
        }
    }
}

struct SetModesBandsSequence<'a> {
    modem: &'a UbloxModem,
    /// Update command, built once at sequence start.
    command: String,
    /// Power state captured at `CheckPower`; decides both sides of the
    /// `+CFUN` bracket.
    initial_power: PowerState,
    token: Option<OperationToken>,
}

#[async_trait]
impl Sequence for SetModesBandsSequence<'_> {
    type Step = SetModesBandsStep;

    fn name(&self) -> &'static str {
        "set-modes-bands"
    }

    async fn run_step(&mut self, step: SetModesBandsStep) -> Result<Flow<SetModesBandsStep>> {
        let method = self.modem.support_config().method;

        match step {
            SetModesBandsStep::First => Ok(Flow::Advance),

            SetModesBandsStep::Acquire => {
                debug!("acquiring power operation...");
                self.token = Some(self.modem.lock().acquire()?);
                Ok(Flow::Advance)
            }

            // Only the +CFUN bracket needs the current power state: if the
            // device is already in low-power mode, both bracket halves are
            // skipped later on.
            SetModesBandsStep::CheckPower => {
                if method == SettingsUpdateMethod::Cfun {
                    debug!("checking current power operation...");
                    let response = self.modem.at("+CFUN?", DEFAULT_TIMEOUT).await?;
                    self.initial_power = commands::parse_cfun_power(&response)?;
                }
                Ok(Flow::Advance)
            }

            SetModesBandsStep::BeforeCommand => {
                match method {
                    SettingsUpdateMethod::Cops => {
                        debug!("deregistering from the network for configuration change...");
                        self.modem.at("+COPS=2", REGISTRATION_TIMEOUT).await?;
                    }
                    SettingsUpdateMethod::Cfun if self.initial_power != PowerState::Low => {
                        debug!("powering down for configuration change...");
                        self.modem.at("+CFUN=4", DEFAULT_TIMEOUT).await?;
                    }
                    SettingsUpdateMethod::Cfun | SettingsUpdateMethod::None => {}
                }
                Ok(Flow::Advance)
            }

            SetModesBandsStep::Command => {
                debug!("updating configuration...");
                self.modem.at(&self.command, DEFAULT_TIMEOUT).await?;
                Ok(Flow::Advance)
            }

            SetModesBandsStep::AfterCommand => {
                match method {
                    SettingsUpdateMethod::Cops => {
                        debug!("re-registering in the network after configuration change...");
                        self.modem.at("+COPS=0", REGISTRATION_TIMEOUT).await?;
                    }
                    SettingsUpdateMethod::Cfun if self.initial_power != PowerState::Low => {
                        debug!("recovering power state after configuration change...");
                        self.modem.at("+CFUN=1", DEFAULT_TIMEOUT).await?;
                    }
                    SettingsUpdateMethod::Cfun | SettingsUpdateMethod::None => {}
                }
                Ok(Flow::Advance)
            }

            SetModesBandsStep::Release => {
                debug!("releasing power operation...");
                let token = self.token.take();
                debug_assert!(token.is_some(), "release step reached without the lock");
                if let Some(token) = token {
                    self.modem.lock().release(token);
                }
                Ok(Flow::Advance)
            }

            SetModesBandsStep::Last => Ok(Flow::Advance),
        }
    }

    fn cleanup_step(&self, failed: SetModesBandsStep) -> SetModesBandsStep {
        match failed {
            // Nothing acquired yet; report straight away.
            SetModesBandsStep::First | SetModesBandsStep::Acquire => SetModesBandsStep::Last,
            // Radio untouched so far; only the lock needs undoing.
            SetModesBandsStep::CheckPower | SetModesBandsStep::BeforeCommand => {
                SetModesBandsStep::Release
            }
            // The bracket was entered; restore the radio before releasing.
            SetModesBandsStep::Command => SetModesBandsStep::AfterCommand,
            // Already unwinding; keep rolling forward.
            SetModesBandsStep::AfterCommand => SetModesBandsStep::Release,
            SetModesBandsStep::Release | SetModesBandsStep::Last => SetModesBandsStep::Last,
        }
    }
}

/// Run `command` under the full modes/bands update sequence.
pub(super) async fn run(modem: &UbloxModem, command: String) -> Result<()> {
    let mut sequence = SetModesBandsSequence {
        modem,
        command,
        initial_power: PowerState::Unknown,
        token: None,
    };
    sequencer::run(&mut sequence).await
}
