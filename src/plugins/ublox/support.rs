use tracing::debug;

use crate::plugins::FeatureSupport;

use super::types::Band;

/// What a device needs around a band/mode configuration change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsUpdateMethod {
    /// Nothing special; the update command can run as-is.
    #[default]
    None,
    /// The radio must be in low-power mode while updating (`+CFUN` bracket).
    Cfun,
    /// The device must be deregistered from the network while updating
    /// (`+COPS` bracket).
    Cops,
}

/// Per-model capability record, loaded at most once per modem instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportConfig {
    /// Bracket required around configuration updates.
    pub method: SettingsUpdateMethod,
    /// `+UACT` based band configuration.
    pub uact: FeatureSupport,
    /// `+UBANDSEL` based band configuration.
    pub ubandsel: FeatureSupport,
    /// `+UDTMFD` DTMF detection and reporting.
    pub udtmfd: FeatureSupport,
}

impl SupportConfig {
    /// Most restrictive configuration; assumed when the model is unknown.
    pub fn restrictive() -> Self {
        SupportConfig {
            method: SettingsUpdateMethod::None,
            uact: FeatureSupport::Unsupported,
            ubandsel: FeatureSupport::Unsupported,
            udtmfd: FeatureSupport::Unsupported,
        }
    }
}

struct ModelRecord {
    /// Model name prefix as reported by `+CGMM`.
    prefix: &'static str,
    config: SupportConfig,
    bands: &'static [Band],
}

static MODELS: &[ModelRecord] = &[
    ModelRecord {
        prefix: "TOBY-L2",
        config: SupportConfig {
            method: SettingsUpdateMethod::Cfun,
            uact: FeatureSupport::Unsupported,
            ubandsel: FeatureSupport::Supported,
            udtmfd: FeatureSupport::Supported,
        },
        bands: &[
            Band::Egsm,
            Band::Dcs,
            Band::Utran1,
            Band::Utran8,
            Band::Eutran1,
            Band::Eutran3,
            Band::Eutran7,
            Band::Eutran8,
            Band::Eutran20,
        ],
    },
    ModelRecord {
        prefix: "TOBY-L4",
        config: SupportConfig {
            method: SettingsUpdateMethod::Cfun,
            uact: FeatureSupport::Supported,
            ubandsel: FeatureSupport::Unsupported,
            udtmfd: FeatureSupport::Supported,
        },
        bands: &[
            Band::Utran1,
            Band::Utran8,
            Band::Eutran1,
            Band::Eutran3,
            Band::Eutran7,
            Band::Eutran20,
        ],
    },
    ModelRecord {
        prefix: "LARA-R2",
        config: SupportConfig {
            method: SettingsUpdateMethod::Cfun,
            uact: FeatureSupport::Unsupported,
            ubandsel: FeatureSupport::Supported,
            udtmfd: FeatureSupport::Supported,
        },
        bands: &[Band::Eutran1, Band::Eutran3, Band::Eutran7, Band::Eutran8, Band::Eutran20],
    },
    ModelRecord {
        prefix: "LISA-U2",
        config: SupportConfig {
            method: SettingsUpdateMethod::Cops,
            uact: FeatureSupport::Unsupported,
            ubandsel: FeatureSupport::Supported,
            udtmfd: FeatureSupport::Supported,
        },
        bands: &[Band::Egsm, Band::Dcs, Band::Utran1, Band::Utran2, Band::Utran5, Band::Utran8],
    },
    ModelRecord {
        prefix: "SARA-U2",
        config: SupportConfig {
            method: SettingsUpdateMethod::Cops,
            uact: FeatureSupport::Unsupported,
            ubandsel: FeatureSupport::Supported,
            udtmfd: FeatureSupport::Supported,
        },
        bands: &[
            Band::G850,
            Band::Egsm,
            Band::Dcs,
            Band::Pcs,
            Band::Utran1,
            Band::Utran2,
            Band::Utran5,
            Band::Utran8,
        ],
    },
    ModelRecord {
        prefix: "SARA-G3",
        config: SupportConfig {
            method: SettingsUpdateMethod::None,
            uact: FeatureSupport::Unsupported,
            ubandsel: FeatureSupport::Supported,
            udtmfd: FeatureSupport::Unsupported,
        },
        bands: &[Band::G850, Band::Egsm, Band::Dcs, Band::Pcs],
    },
];

fn find(model: &str) -> Option<&'static ModelRecord> {
    MODELS
        .iter()
        .find(|record| model.to_ascii_uppercase().starts_with(record.prefix))
}

/// Look up the capability record for `model`.
pub(super) fn lookup(model: &str) -> Option<SupportConfig> {
    let record = find(model)?;
    debug!("support configuration found for '{model}'");
    Some(record.config)
}

/// Bands the given model can be configured with, when known.
pub(super) fn supported_bands(model: &str) -> Option<&'static [Band]> {
    find(model).map(|record| record.bands)
}
