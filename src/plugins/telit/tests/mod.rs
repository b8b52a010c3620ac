#![allow(clippy::unwrap_used)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::bearers::BearerList;
use crate::core::Result;
use crate::plugins::UnsolicitedEvents;
use crate::transport::{AtPort, mock::MockTransport};

use super::modem::TelitModem;
use super::monitoring::ServiceMonitor;
use super::urc::{ServiceEvent, decode_service_urc};

struct RecordingBearers {
    disconnects: AtomicUsize,
    notify: mpsc::UnboundedSender<()>,
}

impl RecordingBearers {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<()>) {
        let (notify, notified) = mpsc::unbounded_channel();
        let bearers = Arc::new(Self {
            disconnects: AtomicUsize::new(0),
            notify,
        });
        (bearers, notified)
    }
}

#[async_trait]
impl BearerList for RecordingBearers {
    async fn disconnect_all(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        let _ = self.notify.send(());
    }
}

#[derive(Default)]
struct RecordingBase {
    enables: AtomicUsize,
    disables: AtomicUsize,
}

#[async_trait]
impl UnsolicitedEvents for RecordingBase {
    async fn enable(&self) -> Result<()> {
        self.enables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disable(&self) -> Result<()> {
        self.disables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn service_lines_decode_to_events() {
    assert_eq!(
        decode_service_urc("#SRVLOSTENA: 1,0"),
        Some(ServiceEvent::ServiceLost)
    );
    assert_eq!(
        decode_service_urc("#SRVLOSTENA: 1,1"),
        Some(ServiceEvent::ServiceAcquired)
    );
    assert_eq!(decode_service_urc("#5GRRCIND: 1,0"), Some(ServiceEvent::RrcIdle));
    assert_eq!(
        decode_service_urc("#5GRRCIND: 1,1"),
        Some(ServiceEvent::RrcConnected)
    );
}

#[test]
fn service_state_field_tolerates_leading_zeros() {
    // The state is the field after the reporting-flag echo, possibly
    // zero-padded.
    assert_eq!(
        decode_service_urc("#SRVLOSTENA: 1, 00"),
        Some(ServiceEvent::ServiceLost)
    );
    assert_eq!(
        decode_service_urc("#SRVLOSTENA: 1,01"),
        Some(ServiceEvent::ServiceAcquired)
    );
}

#[test]
fn unparseable_service_lines_decode_to_nothing() {
    // A lone number is the reporting flag, not a state change.
    assert!(decode_service_urc("#SRVLOSTENA: 0").is_none());
    assert!(decode_service_urc("#SRVLOSTENA: 1,7").is_none());
    assert!(decode_service_urc("#SRVLOSTENA: garbage").is_none());
    assert!(decode_service_urc("#5GRRCIND: garbage").is_none());
    assert!(decode_service_urc("+CREG: 1").is_none());
}

#[tokio::test]
async fn service_loss_disconnects_all_bearers() {
    let (bearers, mut notified) = RecordingBearers::new();
    let lines = stream::iter(vec![
        "+CREG: 1".to_string(),
        "#SRVLOSTENA: 1,0".to_string(),
        "#SRVLOSTENA: 1,1".to_string(),
        "#5GRRCIND: 1,0".to_string(),
        "#5GRRCIND: 1,1".to_string(),
    ]);

    let _monitor = ServiceMonitor::start(lines, bearers.clone());

    // Service lost and RRC idle each force a teardown; the acquisition and
    // connection notifications never touch the bearers.
    timeout(Duration::from_secs(1), notified.recv()).await.unwrap().unwrap();
    timeout(Duration::from_secs(1), notified.recv()).await.unwrap().unwrap();
    assert_eq!(bearers.disconnects.load(Ordering::SeqCst), 2);
    assert!(notified.try_recv().is_err());
}

#[tokio::test]
async fn live_line_feed_keeps_the_monitor_running() {
    let (bearers, mut notified) = RecordingBearers::new();
    let (lines_tx, lines_rx) = mpsc::unbounded_channel();
    let lines = tokio_stream::wrappers::UnboundedReceiverStream::new(lines_rx);

    let monitor = ServiceMonitor::start(lines, bearers.clone());

    lines_tx.send("#SRVLOSTENA: 1,0".to_string()).unwrap();
    timeout(Duration::from_secs(1), notified.recv()).await.unwrap().unwrap();

    lines_tx.send("#SRVLOSTENA: 1,0".to_string()).unwrap();
    timeout(Duration::from_secs(1), notified.recv()).await.unwrap().unwrap();

    assert_eq!(bearers.disconnects.load(Ordering::SeqCst), 2);
    drop(monitor);
}

#[tokio::test]
async fn enable_configures_both_reporting_commands() {
    let transport = Arc::new(MockTransport::new());
    let base = Arc::new(RecordingBase::default());
    let modem =
        TelitModem::new(transport.clone()).with_base_unsolicited_events(base.clone());

    modem.enable_service_unsolicited_events().await.unwrap();

    assert_eq!(base.enables.load(Ordering::SeqCst), 1);
    assert_eq!(
        transport.executed(),
        vec![
            (AtPort::Primary, "#SRVLOSTENA=1".to_string()),
            (AtPort::Primary, "#5GRRCIND=1".to_string()),
        ]
    );
}

#[tokio::test]
async fn disable_runs_own_teardown_before_the_base() {
    let transport = Arc::new(MockTransport::new());
    let base = Arc::new(RecordingBase::default());
    let modem =
        TelitModem::new(transport.clone()).with_base_unsolicited_events(base.clone());

    modem.disable_service_unsolicited_events().await.unwrap();

    assert_eq!(base.disables.load(Ordering::SeqCst), 1);
    assert_eq!(
        transport.executed_commands(),
        vec!["#SRVLOSTENA=0", "#5GRRCIND=0"]
    );
}

#[tokio::test]
async fn reporting_command_failures_are_swallowed() {
    let transport = Arc::new(MockTransport::new());
    let modem = TelitModem::new(transport.clone());
    transport.reply(
        "#SRVLOSTENA=1",
        Err(crate::ModemError::Transport {
            command: "#SRVLOSTENA=1".to_string(),
            reason: "scripted failure".to_string(),
        }),
    );

    modem.enable_service_unsolicited_events().await.unwrap();

    // The RRC step still ran after the loss-of-service one failed.
    assert_eq!(
        transport.executed_commands(),
        vec!["#SRVLOSTENA=1", "#5GRRCIND=1"]
    );
}
