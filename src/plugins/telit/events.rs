//! Service unsolicited-events enable/disable sequence.
//!
//! Each reported notification kind is toggled with one command. A step
//! whose command fails logs and moves on; the device keeps whatever
//! reporting it managed to configure, so this sequence always completes
//! successfully.

use async_trait::async_trait;
use tracing::debug;

use crate::core::Result;
use crate::sequencer::{self, Flow, Sequence, Step};

use super::modem::{DEFAULT_TIMEOUT, TelitModem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ServiceEventsStep {
    First,
    Srvlostena,
    Rrcind,
    Last,
}

impl Step for ServiceEventsStep {
    const FIRST: Self = ServiceEventsStep::First;
    const LAST: Self = ServiceEventsStep::Last;

    fn next(self) -> Self {
        match self {
            ServiceEventsStep::First => ServiceEventsStep::Srvlostena,
            ServiceEventsStep::Srvlostena => ServiceEventsStep::Rrcind,
            ServiceEventsStep::Rrcind | ServiceEventsStep::Last => ServiceEventsStep::Last,
        }
    }
}

struct ServiceEventsSequence<'a> {
    modem: &'a TelitModem,
    enable: bool,
    srvlostena_command: &'static str,
    rrcind_command: &'static str,
}

impl ServiceEventsSequence<'_> {
    fn action(&self) -> &'static str {
        if self.enable { "enabling" } else { "disabling" }
    }

    async fn toggle(&self, what: &str, command: &str) {
        debug!("{} {what} reporting...", self.action());
        if let Err(err) = self.modem.at(command, DEFAULT_TIMEOUT).await {
            debug!("couldn't configure {what} reporting: {err}");
        }
    }
}

#[async_trait]
impl Sequence for ServiceEventsSequence<'_> {
    type Step = ServiceEventsStep;

    fn name(&self) -> &'static str {
        "service-unsolicited-events"
    }

    async fn run_step(&mut self, step: ServiceEventsStep) -> Result<Flow<ServiceEventsStep>> {
        match step {
            ServiceEventsStep::First | ServiceEventsStep::Last => {}
            ServiceEventsStep::Srvlostena => {
                self.toggle("loss-of-service", self.srvlostena_command).await;
            }
            ServiceEventsStep::Rrcind => {
                self.toggle("NR5G RRC state", self.rrcind_command).await;
            }
        }
        Ok(Flow::Advance)
    }

    fn cleanup_step(&self, failed: ServiceEventsStep) -> ServiceEventsStep {
        // Steps swallow their own failures; keep rolling forward anyway.
        failed.next()
    }
}

/// Run the service unsolicited-events configuration sequence.
pub(super) async fn run(modem: &TelitModem, enable: bool) -> Result<()> {
    let mut sequence = ServiceEventsSequence {
        modem,
        enable,
        srvlostena_command: if enable { "#SRVLOSTENA=1" } else { "#SRVLOSTENA=0" },
        rrcind_command: if enable { "#5GRRCIND=1" } else { "#5GRRCIND=0" },
    };
    sequencer::run(&mut sequence).await
}
