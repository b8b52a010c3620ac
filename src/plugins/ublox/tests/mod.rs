#![allow(clippy::unwrap_used)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, pin_mut};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::core::{ModemError, Result};
use crate::plugins::{FeatureSupport, UnsolicitedEvents};
use crate::transport::{AtPort, mock::MockTransport};

use super::commands;
use super::modem::UbloxModem;
use super::monitoring::VoiceMonitor;
use super::support::SettingsUpdateMethod;
use super::types::{
    Band, CallDirection, CallState, EpsBearerSettings, IpFamily, ModemMode, PowerState, VoiceEvent,
};
use super::voice::decode_voice_urc;

fn modem(model: &str) -> (Arc<MockTransport>, UbloxModem) {
    let transport = Arc::new(MockTransport::new());
    let modem = UbloxModem::new(transport.clone(), model, false);
    (transport, modem)
}

fn transport_error(command: &str) -> ModemError {
    ModemError::Transport {
        command: command.to_string(),
        reason: "scripted failure".to_string(),
    }
}

#[test]
fn urat_set_command_covers_combinations() {
    let command = commands::build_urat_set_command(ModemMode::M3G | ModemMode::M4G, None).unwrap();
    assert_eq!(command, "+URAT=6");

    let command =
        commands::build_urat_set_command(ModemMode::ANY, Some(ModemMode::M4G)).unwrap();
    assert_eq!(command, "+URAT=4,3");

    assert!(matches!(
        commands::build_urat_set_command(ModemMode::empty(), None),
        Err(ModemError::Unsupported(_))
    ));
    assert!(matches!(
        commands::build_urat_set_command(ModemMode::M3G, Some(ModemMode::M4G)),
        Err(ModemError::Unsupported(_))
    ));
}

#[test]
fn urat_set_and_read_are_symmetric() {
    let allowed = ModemMode::M2G | ModemMode::M3G | ModemMode::M4G;
    let preferred = Some(ModemMode::M3G);

    let command = commands::build_urat_set_command(allowed, preferred).unwrap();
    let echoed = format!("+URAT: {}", command.trim_start_matches("+URAT="));

    assert_eq!(
        commands::parse_urat_read_response(&echoed).unwrap(),
        (allowed, preferred)
    );
}

#[test]
fn urat_test_response_expands_ranges() {
    let combinations = commands::parse_urat_test_response("+URAT: (0-6)").unwrap();
    assert_eq!(combinations.len(), 7);

    let any = commands::mode_any_from_combinations(&combinations);
    assert_eq!(any, ModemMode::M2G | ModemMode::M3G | ModemMode::M4G);

    assert!(commands::parse_urat_test_response("+URAT: ()").is_err());
}

#[test]
fn ubandsel_set_and_read_are_symmetric() {
    let bands = [Band::Egsm, Band::G850];
    let command = commands::build_ubandsel_set_command(&bands).unwrap();
    assert_eq!(command, "+UBANDSEL=850,900");

    let echoed = format!("+UBANDSEL: {}", command.trim_start_matches("+UBANDSEL="));
    let parsed = commands::parse_ubandsel_response(&echoed, &bands).unwrap();
    assert_eq!(parsed, vec![Band::G850, Band::Egsm]);
}

#[test]
fn uact_set_and_read_are_symmetric() {
    let bands = [Band::Utran1, Band::Eutran20];
    let command = commands::build_uact_set_command(&bands).unwrap();
    assert_eq!(command, "+UACT=,,,1,120");

    let parsed = commands::parse_uact_response("+UACT: ,,,1,120").unwrap();
    assert_eq!(parsed, vec![Band::Utran1, Band::Eutran20]);
}

#[test]
fn cfun_response_maps_to_power_state() {
    assert_eq!(commands::parse_cfun_power("+CFUN: 1").unwrap(), PowerState::On);
    assert_eq!(commands::parse_cfun_power("+CFUN: 4").unwrap(), PowerState::Low);
    assert_eq!(commands::parse_cfun_power("+CFUN: 19").unwrap(), PowerState::Low);
    assert_eq!(commands::parse_cfun_power("+CFUN: 0").unwrap(), PowerState::Off);
    assert!(commands::parse_cfun_power("ERROR").is_err());
    assert!(commands::parse_cfun_power("+CFUN: 6").is_err());
}

#[test]
fn ucgdflt_test_response_lists_pdp_types() {
    let families =
        commands::parse_ucgdflt_test_response("+UCGDFLT: (0-1),(\"IP\",\"IPV6\",\"IPV4V6\")")
            .unwrap();
    assert_eq!(families, vec![IpFamily::V4, IpFamily::V6, IpFamily::V4V6]);

    assert!(commands::parse_ucgdflt_test_response("+UCGDFLT: (0-1)").is_err());
}

#[test]
fn cgdcont_response_lists_contexts() {
    let contexts = commands::parse_cgdcont_read_response(
        "+CGDCONT: 1,\"IP\",\"apn1\",\"\",0,0\r\n+CGDCONT: 4,\"IPV4V6\",\"internet\",\"\",0,0",
    )
    .unwrap();
    assert_eq!(contexts.len(), 2);
    assert_eq!(contexts[1].cid, 4);
    assert_eq!(contexts[1].ip_type, IpFamily::V4V6);
    assert_eq!(contexts[1].apn, "internet");
}

#[test]
fn unknown_model_gets_restrictive_support_config() {
    let (_transport, modem) = modem("TOTALLY-UNKNOWN");

    let config = modem.support_config();
    assert_eq!(config.method, SettingsUpdateMethod::None);
    assert_eq!(config.uact, FeatureSupport::Unsupported);
    assert_eq!(config.ubandsel, FeatureSupport::Unsupported);

    // Loaded at most once; a duplicate call observes the same record.
    assert_eq!(modem.support_config(), config);
}

#[tokio::test]
async fn set_modes_with_cfun_method_brackets_with_power_cycle() {
    let (transport, modem) = modem("TOBY-L201");
    transport.reply_ok("+CFUN?", "+CFUN: 1");

    modem
        .set_current_modes(ModemMode::M3G | ModemMode::M4G, None)
        .await
        .unwrap();

    assert_eq!(
        transport.executed_commands(),
        vec!["+CFUN?", "+CFUN=4", "+URAT=6", "+CFUN=1"]
    );
    assert!(!modem.lock().is_held());
}

#[tokio::test]
async fn set_modes_skips_power_bracket_when_already_low() {
    let (transport, modem) = modem("TOBY-L201");
    transport.reply_ok("+CFUN?", "+CFUN: 4");

    modem
        .set_current_modes(ModemMode::M3G | ModemMode::M4G, None)
        .await
        .unwrap();

    assert_eq!(transport.executed_commands(), vec!["+CFUN?", "+URAT=6"]);
}

#[tokio::test]
async fn set_modes_with_cops_method_brackets_with_registration() {
    let (transport, modem) = modem("SARA-U270");

    modem.set_current_modes(ModemMode::M2G | ModemMode::M3G, None).await.unwrap();

    assert_eq!(
        transport.executed_commands(),
        vec!["+COPS=2", "+URAT=1", "+COPS=0"]
    );
}

#[tokio::test]
async fn failed_update_command_still_restores_power() {
    let (transport, modem) = modem("TOBY-L201");
    transport.reply_ok("+CFUN?", "+CFUN: 1");
    transport.reply("+URAT=6", Err(transport_error("+URAT=6")));

    let error = modem
        .set_current_modes(ModemMode::M3G | ModemMode::M4G, None)
        .await
        .unwrap_err();

    assert!(error.to_string().contains("+URAT=6"));
    // The radio was powered down, so the restore step must still run.
    assert_eq!(
        transport.executed_commands(),
        vec!["+CFUN?", "+CFUN=4", "+URAT=6", "+CFUN=1"]
    );
    assert!(!modem.lock().is_held());
}

#[tokio::test]
async fn failed_restore_keeps_the_original_error() {
    let (transport, modem) = modem("TOBY-L201");
    transport.reply_ok("+CFUN?", "+CFUN: 1");
    transport.reply("+URAT=6", Err(transport_error("+URAT=6")));
    transport.reply("+CFUN=1", Err(transport_error("+CFUN=1")));

    let error = modem
        .set_current_modes(ModemMode::M3G | ModemMode::M4G, None)
        .await
        .unwrap_err();

    assert!(error.to_string().contains("+URAT=6"));
    assert!(!modem.lock().is_held());
}

#[tokio::test]
async fn concurrent_mutating_sequence_fails_fast_with_busy() {
    let (transport, modem) = modem("TOBY-L201");
    let holder = modem.lock().acquire().unwrap();

    let error = modem
        .set_current_modes(ModemMode::M3G | ModemMode::M4G, None)
        .await
        .unwrap_err();

    assert!(matches!(error, ModemError::Busy));
    assert!(error.is_retryable());
    assert!(transport.executed_commands().is_empty());

    // The holder's sequence is unaffected and can still release.
    modem.lock().release(holder);
    transport.reply_ok("+CFUN?", "+CFUN: 4");
    modem
        .set_current_modes(ModemMode::M3G | ModemMode::M4G, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn set_bands_picks_command_by_capability() {
    let (sara_transport, sara) = modem("SARA-U270");
    sara.set_current_bands(&[Band::G850, Band::Egsm]).await.unwrap();
    assert_eq!(
        sara_transport.executed_commands(),
        vec!["+COPS=2", "+UBANDSEL=850,900", "+COPS=0"]
    );

    let (toby_transport, toby) = modem("TOBY-L4106");
    toby_transport.reply_ok("+CFUN?", "+CFUN: 4");
    toby.set_current_bands(&[Band::Eutran20]).await.unwrap();
    assert_eq!(toby_transport.executed_commands(), vec!["+CFUN?", "+UACT=,,,120"]);
}

#[tokio::test]
async fn set_bands_on_unknown_model_is_unsupported() {
    let (transport, modem) = modem("TOTALLY-UNKNOWN");

    let error = modem.set_current_bands(&[Band::Egsm]).await.unwrap_err();

    assert!(matches!(error, ModemError::Unsupported(_)));
    assert!(transport.executed_commands().is_empty());
    assert!(!modem.lock().is_held());
}

#[tokio::test]
async fn load_current_bands_reads_without_the_lock() {
    let (transport, modem) = modem("TOBY-L201");
    transport.reply_ok("+UBANDSEL?", "+UBANDSEL: 800,900");

    // A held lock must not block idempotent reads.
    let holder = modem.lock().acquire().unwrap();
    let bands = modem.load_current_bands().await.unwrap();
    modem.lock().release(holder);

    assert_eq!(bands, vec![Band::Eutran20, Band::Egsm]);
}

#[tokio::test]
async fn load_supported_modes_decides_any_combination() {
    let (transport, modem) = modem("SARA-U270");
    transport.reply_ok("+URAT=?", "+URAT: (0,1,2)");

    let combinations = modem.load_supported_modes().await.unwrap();
    assert_eq!(
        combinations,
        vec![ModemMode::M2G, ModemMode::M2G | ModemMode::M3G, ModemMode::M3G]
    );

    // ANY now resolves to the richest supported combination.
    modem.set_current_modes(ModemMode::ANY, None).await.unwrap();
    assert_eq!(
        transport.executed_commands(),
        vec!["+URAT=?", "+COPS=2", "+URAT=1", "+COPS=0"]
    );
}

#[tokio::test]
async fn power_operations_hold_the_lock_for_their_single_command() {
    let (transport, modem) = modem("TOBY-L201");

    modem.power_down().await.unwrap();
    modem.reset().await.unwrap();

    assert_eq!(transport.executed_commands(), vec!["+CFUN=4", "+CFUN=16"]);
    assert!(!modem.lock().is_held());
}

fn eps_settings(apn: &str, ip_type: IpFamily) -> EpsBearerSettings {
    EpsBearerSettings {
        apn: apn.to_string(),
        ip_type,
        ..EpsBearerSettings::default()
    }
}

const UCGDFLT_PROBE: &str = "+UCGDFLT: (0-1),(\"IP\",\"IPV6\",\"IPV4V6\")";

#[tokio::test]
async fn set_initial_eps_bearer_brackets_with_rf_cycle() {
    let (transport, modem) = modem("TOBY-L201");
    transport.reply_ok("+UCGDFLT=?", UCGDFLT_PROBE);
    transport.reply_ok("+CFUN?", "+CFUN: 1");

    modem
        .set_initial_eps_bearer(eps_settings("internet", IpFamily::Any))
        .await
        .unwrap();

    // Any resolves to plain IPv4 on the wire.
    let apn_command = commands::build_ucgdflt_set_command(&eps_settings("internet", IpFamily::V4));
    assert_eq!(
        transport.executed_commands(),
        vec!["+UCGDFLT=?", "+CFUN?", "+CFUN=4", apn_command.as_str(), "+CFUN=1"]
    );
    assert!(!modem.lock().is_held());
}

#[tokio::test]
async fn set_initial_eps_bearer_requires_powered_sim() {
    let (transport, modem) = modem("TOBY-L201");
    transport.reply_ok("+UCGDFLT=?", UCGDFLT_PROBE);
    transport.reply_ok("+CFUN?", "+CFUN: 0");

    let error = modem
        .set_initial_eps_bearer(eps_settings("internet", IpFamily::V4))
        .await
        .unwrap_err();

    assert!(matches!(error, ModemError::WrongState(_)));
    // No mutating command was issued and the lock was returned.
    assert_eq!(transport.executed_commands(), vec!["+UCGDFLT=?", "+CFUN?"]);
    assert!(!modem.lock().is_held());
}

#[tokio::test]
async fn unsupported_ip_type_short_circuits_before_the_lock() {
    let (transport, modem) = modem("TOBY-L201");
    transport.reply_ok("+UCGDFLT=?", "+UCGDFLT: (0-1),(\"IP\")");
    let holder = modem.lock().acquire().unwrap();

    let error = modem
        .set_initial_eps_bearer(eps_settings("internet", IpFamily::V6))
        .await
        .unwrap_err();

    // Detected before acquisition, so the held lock was never contended.
    assert!(matches!(error, ModemError::Unsupported(_)));
    assert_eq!(transport.executed_commands(), vec!["+UCGDFLT=?"]);
    modem.lock().release(holder);
}

#[tokio::test]
async fn failed_apn_command_still_recovers_rf() {
    let (transport, modem) = modem("TOBY-L201");
    transport.reply_ok("+UCGDFLT=?", UCGDFLT_PROBE);
    transport.reply_ok("+CFUN?", "+CFUN: 1");

    let apn_command = commands::build_ucgdflt_set_command(&eps_settings("internet", IpFamily::V4));
    transport.reply(&apn_command, Err(transport_error("+UCGDFLT")));
    transport.reply("+CFUN=1", Err(transport_error("+CFUN=1")));

    let error = modem
        .set_initial_eps_bearer(eps_settings("internet", IpFamily::V4))
        .await
        .unwrap_err();

    // The RF recovery failure is logged; the APN failure is what comes back.
    assert!(error.to_string().contains("+UCGDFLT"));
    assert_eq!(
        transport.executed_commands(),
        vec!["+UCGDFLT=?", "+CFUN?", "+CFUN=4", apn_command.as_str(), "+CFUN=1"]
    );
    assert!(!modem.lock().is_held());
}

#[tokio::test]
async fn load_initial_eps_bearer_reads_context_four() {
    let (transport, modem) = modem("TOBY-L201");
    transport.reply_ok(
        "+CGDCONT?",
        "+CGDCONT: 1,\"IP\",\"other\",\"\",0,0\r\n+CGDCONT: 4,\"IPV4V6\",\"internet\",\"\",0,0",
    );

    let settings = modem.load_initial_eps_bearer().await;
    assert_eq!(settings.apn, "internet");
    assert_eq!(settings.ip_type, IpFamily::V4V6);
}

#[tokio::test]
async fn load_initial_eps_bearer_failure_yields_defaults() {
    let (transport, modem) = modem("TOBY-L201");
    transport.reply("+CGDCONT?", Err(transport_error("+CGDCONT?")));

    assert_eq!(modem.load_initial_eps_bearer().await, EpsBearerSettings::default());
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

#[tokio::test]
async fn voice_enable_configures_all_ports_and_features() {
    let transport = Arc::new(MockTransport::new());
    let base = Arc::new(RecordingBase::default());
    let modem = UbloxModem::new(transport.clone(), "TOBY-L201", true)
        .with_base_unsolicited_events(base.clone());

    modem.enable_voice_unsolicited_events().await.unwrap();

    assert_eq!(base.enables.load(Ordering::SeqCst), 1);
    assert_eq!(
        transport.executed(),
        vec![
            (AtPort::Primary, "+UCALLSTAT=1".to_string()),
            (AtPort::Secondary, "+UCALLSTAT=1".to_string()),
            (AtPort::Primary, "+UDTMFD=1,2".to_string()),
            (AtPort::Secondary, "+UDTMFD=1,2".to_string()),
        ]
    );
}

#[tokio::test]
async fn voice_disable_skips_absent_port_and_unsupported_feature() {
    let (transport, modem) = modem("SARA-G350");

    modem.disable_voice_unsolicited_events().await.unwrap();

    assert_eq!(
        transport.executed(),
        vec![(AtPort::Primary, "+UCALLSTAT=0".to_string())]
    );
}

#[tokio::test]
async fn voice_command_failures_are_swallowed() {
    let (transport, modem) = modem("TOBY-L201");
    transport.reply("+UCALLSTAT=1", Err(transport_error("+UCALLSTAT=1")));

    modem.enable_voice_unsolicited_events().await.unwrap();

    // The DTMF step still ran after the call-status one failed.
    assert_eq!(transport.executed_commands(), vec!["+UCALLSTAT=1", "+UDTMFD=1,2"]);
}

#[test]
fn ucallstat_line_decodes_call_info() {
    let event = decode_voice_urc("+UCALLSTAT: 2,3").unwrap();
    assert_eq!(
        event,
        VoiceEvent::Call(super::types::CallInfo {
            index: 2,
            state: CallState::RingingOut,
            direction: CallDirection::Outgoing,
        })
    );

    let VoiceEvent::Call(info) = decode_voice_urc("+UCALLSTAT: 1,4").unwrap() else {
        panic!("expected a call event");
    };
    assert_eq!(info.state, CallState::RingingIn);
    assert_eq!(info.direction, CallDirection::Incoming);
}

#[test]
fn unparseable_voice_lines_decode_to_nothing() {
    assert!(decode_voice_urc("+UCALLSTAT: garbage").is_none());
    assert!(decode_voice_urc("+UCALLSTAT: 1,42").is_none());
    assert!(decode_voice_urc("+CREG: 1").is_none());
}

#[test]
fn udtmfd_line_decodes_digit() {
    assert_eq!(decode_voice_urc("+UUDTMFD: 5"), Some(VoiceEvent::Dtmf('5')));
    assert_eq!(decode_voice_urc("+UUDTMFD: #"), Some(VoiceEvent::Dtmf('#')));
}

#[tokio::test]
async fn voice_monitor_fans_decoded_events_out() {
    let (lines_tx, lines_rx) = mpsc::unbounded_channel();
    let monitor =
        VoiceMonitor::start(tokio_stream::wrappers::UnboundedReceiverStream::new(lines_rx));

    let events = monitor.events();
    pin_mut!(events);

    lines_tx.send("+UCALLSTAT: 2,3".to_string()).unwrap();
    lines_tx.send("not a voice line".to_string()).unwrap();
    lines_tx.send("+UUDTMFD: 5".to_string()).unwrap();

    // Undecodable lines are dropped; only the two events come through.
    let event = timeout(Duration::from_secs(1), events.next()).await.unwrap().unwrap();
    assert!(matches!(event, VoiceEvent::Call(info) if info.index == 2));
    let event = timeout(Duration::from_secs(1), events.next()).await.unwrap().unwrap();
    assert_eq!(event, VoiceEvent::Dtmf('5'));
}
