//! Builders and parsers for the u-blox AT dialect.
//!
//! Builders turn structured parameters into the exact command text the
//! sequences execute; parsers turn raw response text back into structured
//! values. Both sides are pure and symmetric where the device defines a
//! matching read command.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::core::{ModemError, Result};

use super::types::{Band, EpsBearerSettings, IpFamily, ModemMode, PowerState};

pub(super) fn pattern(source: &str) -> Regex {
    Regex::new(source).unwrap_or_else(|err| panic!("invalid pattern '{source}': {err}"))
}

fn quoted(text: &str) -> String {
    format!("\"{text}\"")
}

/// `+URAT` access technology selector values.
fn urat_code(mode: ModemMode) -> Option<u8> {
    match mode {
        m if m == ModemMode::M2G => Some(0),
        m if m == ModemMode::M2G | ModemMode::M3G => Some(1),
        m if m == ModemMode::M3G => Some(2),
        m if m == ModemMode::M4G => Some(3),
        m if m == ModemMode::M2G | ModemMode::M3G | ModemMode::M4G => Some(4),
        m if m == ModemMode::M2G | ModemMode::M4G => Some(5),
        m if m == ModemMode::M3G | ModemMode::M4G => Some(6),
        _ => None,
    }
}

fn mode_from_urat_code(code: u8) -> Option<ModemMode> {
    match code {
        0 => Some(ModemMode::M2G),
        1 => Some(ModemMode::M2G | ModemMode::M3G),
        2 => Some(ModemMode::M3G),
        3 => Some(ModemMode::M4G),
        4 => Some(ModemMode::M2G | ModemMode::M3G | ModemMode::M4G),
        5 => Some(ModemMode::M2G | ModemMode::M4G),
        6 => Some(ModemMode::M3G | ModemMode::M4G),
        _ => None,
    }
}

/// `+URAT` preferred technology values; only single technologies qualify.
fn urat_preferred_code(mode: ModemMode) -> Option<u8> {
    match mode {
        m if m == ModemMode::M2G => Some(0),
        m if m == ModemMode::M3G => Some(2),
        m if m == ModemMode::M4G => Some(3),
        _ => None,
    }
}

fn mode_from_urat_preferred_code(code: u8) -> Option<ModemMode> {
    match code {
        0 => Some(ModemMode::M2G),
        2 => Some(ModemMode::M3G),
        3 => Some(ModemMode::M4G),
        _ => None,
    }
}

/// Build the `+URAT` set command for an allowed/preferred combination.
///
/// # Errors
///
/// [`ModemError::Unsupported`] when the combination has no `+URAT`
/// encoding, or the preferred technology is not a single member of the
/// allowed set.
pub(super) fn build_urat_set_command(
    allowed: ModemMode,
    preferred: Option<ModemMode>,
) -> Result<String> {
    let code = urat_code(allowed).ok_or_else(|| {
        ModemError::Unsupported(format!("mode combination {allowed:?}"))
    })?;

    let Some(preferred) = preferred else {
        return Ok(format!("+URAT={code}"));
    };

    if !allowed.contains(preferred) {
        return Err(ModemError::Unsupported(format!(
            "preferred mode {preferred:?} outside allowed combination {allowed:?}"
        )));
    }
    let preferred_code = urat_preferred_code(preferred).ok_or_else(|| {
        ModemError::Unsupported(format!("preferred mode {preferred:?}"))
    })?;

    Ok(format!("+URAT={code},{preferred_code}"))
}

static URAT_READ: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\+URAT:\s*(\d+)(?:\s*,\s*(\d+))?"));

/// Parse a `+URAT?` response into (allowed, preferred).
pub(super) fn parse_urat_read_response(
    response: &str,
) -> Result<(ModemMode, Option<ModemMode>)> {
    let captures = URAT_READ
        .captures(response)
        .ok_or_else(|| ModemError::parse("current modes", response, "no +URAT value"))?;

    let allowed = captures[1]
        .parse::<u8>()
        .ok()
        .and_then(mode_from_urat_code)
        .ok_or_else(|| ModemError::parse("current modes", response, "unknown selector"))?;

    let preferred = match captures.get(2) {
        None => None,
        Some(raw) => Some(
            raw.as_str()
                .parse::<u8>()
                .ok()
                .and_then(mode_from_urat_preferred_code)
                .ok_or_else(|| {
                    ModemError::parse("current modes", response, "unknown preferred value")
                })?,
        ),
    };

    Ok((allowed, preferred))
}

static URAT_TEST: LazyLock<Regex> = LazyLock::new(|| pattern(r"\+URAT:\s*\(([^)]*)\)"));

/// Parse a `+URAT=?` response into the supported mode combinations.
pub(super) fn parse_urat_test_response(response: &str) -> Result<Vec<ModemMode>> {
    let captures = URAT_TEST
        .captures(response)
        .ok_or_else(|| ModemError::parse("supported modes", response, "no +URAT group"))?;

    let mut combinations = Vec::new();
    for token in captures[1].split(',') {
        let token = token.trim();
        let (first, last) = match token.split_once('-') {
            Some((low, high)) => (low.trim(), high.trim()),
            None => (token, token),
        };
        let (Ok(first), Ok(last)) = (first.parse::<u8>(), last.parse::<u8>()) else {
            return Err(ModemError::parse("supported modes", response, "bad selector token"));
        };
        for code in first..=last {
            match mode_from_urat_code(code) {
                Some(combination) => combinations.push(combination),
                None => debug!("ignoring unknown URAT selector {code}"),
            }
        }
    }

    if combinations.is_empty() {
        return Err(ModemError::parse(
            "supported modes",
            response,
            "no known selectors",
        ));
    }
    Ok(combinations)
}

/// Combination applied when the caller asks for "any": the richest one.
pub(super) fn mode_any_from_combinations(combinations: &[ModemMode]) -> ModemMode {
    combinations
        .iter()
        .copied()
        .max_by_key(|combination| combination.bits().count_ones())
        .unwrap_or(ModemMode::ANY)
}

/// Build the `+UBANDSEL` set command for a band list.
///
/// # Errors
///
/// [`ModemError::Unsupported`] when the band list is empty.
pub(super) fn build_ubandsel_set_command(bands: &[Band]) -> Result<String> {
    if bands.is_empty() {
        return Err(ModemError::Unsupported("empty band configuration".to_string()));
    }

    let mut frequencies: Vec<u16> = bands.iter().map(|band| band.ubandsel_frequency()).collect();
    frequencies.sort_unstable();
    frequencies.dedup();

    let list: Vec<String> = frequencies.iter().map(u16::to_string).collect();
    Ok(format!("+UBANDSEL={}", list.join(",")))
}

static UBANDSEL_READ: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\+UBANDSEL:\s*([0-9][0-9,\s]*)"));

/// Canonical band for a `+UBANDSEL` frequency when the model list is no help.
fn fallback_band_for_frequency(frequency: u16) -> Option<Band> {
    match frequency {
        800 => Some(Band::Eutran20),
        850 => Some(Band::G850),
        900 => Some(Band::Egsm),
        1800 => Some(Band::Dcs),
        1900 => Some(Band::Pcs),
        2100 => Some(Band::Utran1),
        2600 => Some(Band::Eutran7),
        _ => None,
    }
}

/// Parse a `+UBANDSEL?` response.
///
/// Frequencies are ambiguous across technologies (900 MHz is E-GSM, UTRAN
/// band 8 or E-UTRAN band 8), so the model's supported band list picks the
/// interpretation.
pub(super) fn parse_ubandsel_response(response: &str, supported: &[Band]) -> Result<Vec<Band>> {
    let captures = UBANDSEL_READ
        .captures(response)
        .ok_or_else(|| ModemError::parse("current bands", response, "no +UBANDSEL value"))?;

    let mut bands = Vec::new();
    for token in captures[1].split(',') {
        let Ok(frequency) = token.trim().parse::<u16>() else {
            return Err(ModemError::parse("current bands", response, "bad frequency token"));
        };
        let band = supported
            .iter()
            .copied()
            .find(|band| band.ubandsel_frequency() == frequency)
            .or_else(|| fallback_band_for_frequency(frequency));
        match band {
            Some(band) => bands.push(band),
            None => debug!("ignoring unknown band frequency {frequency}"),
        }
    }

    if bands.is_empty() {
        return Err(ModemError::parse("current bands", response, "no known bands"));
    }
    Ok(bands)
}

/// Build the `+UACT` set command for a band list.
///
/// # Errors
///
/// [`ModemError::Unsupported`] when the band list is empty.
pub(super) fn build_uact_set_command(bands: &[Band]) -> Result<String> {
    if bands.is_empty() {
        return Err(ModemError::Unsupported("empty band configuration".to_string()));
    }

    let mut numbers: Vec<u16> = bands.iter().map(|band| band.uact_number()).collect();
    numbers.sort_unstable();
    numbers.dedup();

    let list: Vec<String> = numbers.iter().map(u16::to_string).collect();
    Ok(format!("+UACT=,,,{}", list.join(",")))
}

static UACT_READ: LazyLock<Regex> = LazyLock::new(|| pattern(r"\+UACT:\s*[,\s]*([0-9][0-9,\s]*)"));

/// Parse a `+UACT?` response.
pub(super) fn parse_uact_response(response: &str) -> Result<Vec<Band>> {
    let captures = UACT_READ
        .captures(response)
        .ok_or_else(|| ModemError::parse("current bands", response, "no +UACT value"))?;

    let mut bands = Vec::new();
    for token in captures[1].split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let Ok(number) = token.parse::<u16>() else {
            return Err(ModemError::parse("current bands", response, "bad band token"));
        };
        match Band::from_uact_number(number) {
            Some(band) => bands.push(band),
            None => debug!("ignoring unknown UACT band number {number}"),
        }
    }

    if bands.is_empty() {
        return Err(ModemError::parse("current bands", response, "no known bands"));
    }
    Ok(bands)
}

static CFUN_READ: LazyLock<Regex> = LazyLock::new(|| pattern(r"\+CFUN:\s*(\d+)"));

/// Parse the raw functionality mode out of a `+CFUN?` response.
pub(super) fn parse_cfun_query(response: &str) -> Result<u32> {
    let captures = CFUN_READ
        .captures(response)
        .ok_or_else(|| ModemError::parse("functionality mode", response, "no +CFUN value"))?;
    captures[1]
        .parse::<u32>()
        .map_err(|err| ModemError::parse("functionality mode", response, err))
}

/// Parse a `+CFUN?` response into a power state.
pub(super) fn parse_cfun_power(response: &str) -> Result<PowerState> {
    match parse_cfun_query(response)? {
        0 => Ok(PowerState::Off),
        1 => Ok(PowerState::On),
        // 19 is the u-blox minimum functionality that keeps the SIM powered.
        4 | 19 => Ok(PowerState::Low),
        mode => Err(ModemError::parse(
            "power state",
            response,
            format!("unexpected functionality mode {mode}"),
        )),
    }
}

/// Build the `+UCGDFLT` set command for the initial EPS bearer.
pub(super) fn build_ucgdflt_set_command(settings: &EpsBearerSettings) -> String {
    format!(
        "+UCGDFLT=1,{},{},0,0,0,0,0,0,0,0,0,1,0,0,1,0,0,0,0,0,{},{}",
        quoted(settings.ip_type.pdp_type()),
        quoted(&settings.apn),
        quoted(&settings.user),
        quoted(&settings.password),
    )
}

static QUOTED_TOKEN: LazyLock<Regex> = LazyLock::new(|| pattern(r#""([^"]*)""#));

/// Parse a `+UCGDFLT=?` response into the PDP types the device accepts.
pub(super) fn parse_ucgdflt_test_response(response: &str) -> Result<Vec<IpFamily>> {
    let mut families = Vec::new();
    for captures in QUOTED_TOKEN.captures_iter(response) {
        match IpFamily::from_pdp_type(&captures[1]) {
            Some(family) if !families.contains(&family) => families.push(family),
            Some(_) => {}
            None => debug!("ignoring unknown PDP type '{}'", &captures[1]),
        }
    }

    if families.is_empty() {
        return Err(ModemError::parse(
            "supported PDP types",
            response,
            "no known PDP types",
        ));
    }
    Ok(families)
}

/// One `+CGDCONT?` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct PdpContext {
    pub(super) cid: u32,
    pub(super) ip_type: IpFamily,
    pub(super) apn: String,
}

static CGDCONT_READ: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"\+CGDCONT:\s*(\d+)\s*,\s*"([^"]*)"\s*,\s*"([^"]*)""#));

/// Parse a `+CGDCONT?` response into its PDP context list.
pub(super) fn parse_cgdcont_read_response(response: &str) -> Result<Vec<PdpContext>> {
    let mut contexts = Vec::new();
    for captures in CGDCONT_READ.captures_iter(response) {
        let Ok(cid) = captures[1].parse::<u32>() else {
            continue;
        };
        let Some(ip_type) = IpFamily::from_pdp_type(&captures[2]) else {
            debug!("ignoring context {cid} with unknown PDP type '{}'", &captures[2]);
            continue;
        };
        contexts.push(PdpContext {
            cid,
            ip_type,
            apn: captures[3].to_string(),
        });
    }

    if contexts.is_empty() {
        return Err(ModemError::parse("PDP contexts", response, "no contexts listed"));
    }
    Ok(contexts)
}
