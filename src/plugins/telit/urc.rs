use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

fn pattern(source: &str) -> Regex {
    Regex::new(source).unwrap_or_else(|err| panic!("invalid pattern '{source}': {err}"))
}

// Both lines echo the reporting-enabled flag first; the service state is
// the second field.
static SRVLOSTENA: LazyLock<Regex> = LazyLock::new(|| pattern(r"#SRVLOSTENA: 1,\s*0*([0-1])"));
static RRCIND: LazyLock<Regex> = LazyLock::new(|| pattern(r"#5GRRCIND: 1,([0-1])"));

/// Decoded Telit service notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceEvent {
    /// Registration to the serving PLMN was lost.
    ServiceLost,
    /// A serving PLMN was acquired.
    ServiceAcquired,
    /// The NR5G RRC connection went idle.
    RrcIdle,
    /// The NR5G RRC connection was established.
    RrcConnected,
}

/// Decode one unsolicited line into a service event.
///
/// Best effort: unknown lines or out-of-range values yield `None` after a
/// diagnostic and are never surfaced as errors.
pub fn decode_service_urc(line: &str) -> Option<ServiceEvent> {
    if line.contains("#SRVLOSTENA") {
        let state = SRVLOSTENA
            .captures(line)
            .and_then(|captures| captures[1].parse::<u32>().ok());
        return match state {
            Some(0) => Some(ServiceEvent::ServiceLost),
            Some(1) => Some(ServiceEvent::ServiceAcquired),
            _ => {
                warn!("couldn't parse service status from #SRVLOSTENA line");
                None
            }
        };
    }

    if line.contains("#5GRRCIND") {
        let state = RRCIND
            .captures(line)
            .and_then(|captures| captures[1].parse::<u32>().ok());
        return match state {
            Some(0) => Some(ServiceEvent::RrcIdle),
            Some(1) => Some(ServiceEvent::RrcConnected),
            _ => {
                warn!("couldn't parse service status from #5GRRCIND line");
                None
            }
        };
    }

    None
}
