//! Voice unsolicited events: enable/disable sequence and URC decoding.
//!
//! Reporting is configured per port and per feature, every step gated on a
//! predicate (port present, `+UDTMFD` supported). A step whose command
//! fails logs and moves on; partial voice reporting is better than none,
//! so this sequence always completes successfully.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::core::Result;
use crate::plugins::FeatureSupport;
use crate::sequencer::{self, Flow, Sequence, Step};
use crate::transport::AtPort;

use super::commands::pattern;
use super::modem::{DEFAULT_TIMEOUT, UbloxModem};
use super::types::{CallDirection, CallInfo, CallState, VoiceEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum VoiceEventsStep {
    First,
    UcallstatPrimary,
    UcallstatSecondary,
    UdtmfdPrimary,
    UdtmfdSecondary,
    Last,
}

impl Step for VoiceEventsStep {
    const FIRST: Self = VoiceEventsStep::First;
    const LAST: Self = VoiceEventsStep::Last;

    fn next(self) -> Self {
        match self {
            VoiceEventsStep::First => VoiceEventsStep::UcallstatPrimary,
            VoiceEventsStep::UcallstatPrimary => VoiceEventsStep::UcallstatSecondary,
            VoiceEventsStep::UcallstatSecondary => VoiceEventsStep::UdtmfdPrimary,
            VoiceEventsStep::UdtmfdPrimary => VoiceEventsStep::UdtmfdSecondary,
            VoiceEventsStep::UdtmfdSecondary | VoiceEventsStep::Last => VoiceEventsStep::Last,
        }
    }
}

struct VoiceEventsSequence<'a> {
    modem: &'a UbloxModem,
    enable: bool,
    ucallstat_command: &'static str,
    udtmfd_command: &'static str,
}

impl VoiceEventsSequence<'_> {
    fn action(&self) -> &'static str {
        if self.enable { "enabling" } else { "disabling" }
    }

    async fn ucallstat(&self, port: AtPort) {
        debug!("{} extended call status reporting on {port:?} port...", self.action());
        if let Err(err) = self
            .modem
            .at_on_port(port, self.ucallstat_command, DEFAULT_TIMEOUT)
            .await
        {
            debug!("couldn't configure +UCALLSTAT reporting: {err}");
        }
    }

    async fn udtmfd(&self, port: AtPort) {
        debug!("{} DTMF detection and reporting on {port:?} port...", self.action());
        if let Err(err) = self
            .modem
            .at_on_port(port, self.udtmfd_command, DEFAULT_TIMEOUT)
            .await
        {
            debug!("couldn't configure +UDTMFD reporting: {err}");
        }
    }
}

#[async_trait]
impl Sequence for VoiceEventsSequence<'_> {
    type Step = VoiceEventsStep;

    fn name(&self) -> &'static str {
        "voice-unsolicited-events"
    }

    async fn run_step(&mut self, step: VoiceEventsStep) -> Result<Flow<VoiceEventsStep>> {
        let udtmfd = self.modem.udtmfd_support() == FeatureSupport::Supported;

        match step {
            VoiceEventsStep::First | VoiceEventsStep::Last => {}
            VoiceEventsStep::UcallstatPrimary => self.ucallstat(AtPort::Primary).await,
            VoiceEventsStep::UcallstatSecondary => {
                if self.modem.has_secondary_port() {
                    self.ucallstat(AtPort::Secondary).await;
                }
            }
            VoiceEventsStep::UdtmfdPrimary => {
                if udtmfd {
                    self.udtmfd(AtPort::Primary).await;
                }
            }
            VoiceEventsStep::UdtmfdSecondary => {
                if udtmfd && self.modem.has_secondary_port() {
                    self.udtmfd(AtPort::Secondary).await;
                }
            }
        }
        Ok(Flow::Advance)
    }

    fn cleanup_step(&self, failed: VoiceEventsStep) -> VoiceEventsStep {
        // Steps swallow their own failures; keep rolling forward anyway.
        failed.next()
    }
}

/// Run the voice unsolicited-events configuration sequence.
pub(super) async fn run(modem: &UbloxModem, enable: bool) -> Result<()> {
    let mut sequence = VoiceEventsSequence {
        modem,
        enable,
        ucallstat_command: if enable { "+UCALLSTAT=1" } else { "+UCALLSTAT=0" },
        udtmfd_command: if enable { "+UDTMFD=1,2" } else { "+UDTMFD=0" },
    };
    sequencer::run(&mut sequence).await
}

static UCALLSTAT: LazyLock<Regex> = LazyLock::new(|| pattern(r"\+UCALLSTAT:\s*(\d+)\s*,\s*(\d+)"));
static UDTMFD: LazyLock<Regex> = LazyLock::new(|| pattern(r"\+UUDTMFD:\s*([0-9A-D*#])"));

fn call_state_from_code(code: u32) -> Option<CallState> {
    match code {
        0 => Some(CallState::Active),
        1 => Some(CallState::Held),
        2 => Some(CallState::Dialing),
        3 => Some(CallState::RingingOut),
        4 => Some(CallState::RingingIn),
        5 => Some(CallState::Waiting),
        6 => Some(CallState::Terminated),
        // Reported for alerting on some firmwares; same handling as active.
        7 => Some(CallState::Active),
        _ => None,
    }
}

fn direction_for_state(state: CallState) -> CallDirection {
    match state {
        CallState::Dialing | CallState::RingingOut => CallDirection::Outgoing,
        CallState::RingingIn | CallState::Waiting => CallDirection::Incoming,
        CallState::Active | CallState::Held | CallState::Terminated => CallDirection::Unknown,
    }
}

fn decode_ucallstat(line: &str) -> Option<CallInfo> {
    if !line.contains("+UCALLSTAT:") {
        return None;
    }
    let Some(captures) = UCALLSTAT.captures(line) else {
        warn!("couldn't parse call index from +UCALLSTAT");
        return None;
    };

    let Ok(index) = captures[1].parse::<u32>() else {
        warn!("couldn't parse call index from +UCALLSTAT");
        return None;
    };
    let Some(state) = captures[2].parse::<u32>().ok().and_then(call_state_from_code) else {
        warn!("couldn't parse call state from +UCALLSTAT");
        return None;
    };

    Some(CallInfo {
        index,
        state,
        direction: direction_for_state(state),
    })
}

fn decode_udtmfd(line: &str) -> Option<char> {
    let captures = UDTMFD.captures(line)?;
    let digit = captures[1].chars().next()?;
    debug!("received DTMF: {digit}");
    Some(digit)
}

/// Decode one unsolicited line into a voice event.
///
/// Best effort: lines that match no known pattern, or match one but carry
/// values outside the closed enumerations, produce `None` after a
/// diagnostic. Nothing here ever reaches an in-flight sequence.
pub fn decode_voice_urc(line: &str) -> Option<VoiceEvent> {
    if let Some(info) = decode_ucallstat(line) {
        return Some(VoiceEvent::Call(info));
    }
    decode_udtmfd(line).map(VoiceEvent::Dtmf)
}
