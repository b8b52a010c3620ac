use bitflags::bitflags;

bitflags! {
    /// Radio access technologies a modem may be told to use.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModemMode: u8 {
        /// GSM/GPRS/EDGE.
        const M2G = 1 << 0;
        /// UMTS/HSPA.
        const M3G = 1 << 1;
        /// LTE.
        const M4G = 1 << 2;
    }
}

impl ModemMode {
    /// "Whatever the device supports"; replaced by the preloaded best
    /// combination before the command is built.
    pub const ANY: ModemMode = ModemMode::all();
}

/// Radio power state as reported by `+CFUN?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    /// Not queried yet, or unrecognized.
    #[default]
    Unknown,
    /// Radio completely off.
    Off,
    /// Low-power / airplane mode.
    Low,
    /// Full functionality.
    On,
}

/// Frequency bands configurable on u-blox devices.
///
/// `+UBANDSEL` addresses bands by their MHz frequency, `+UACT` by 3GPP
/// band number (GSM bands keep the frequency, LTE bands are offset by
/// 100); both mappings live on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    /// GSM 850.
    G850,
    /// GSM 900 (E-GSM).
    Egsm,
    /// GSM 1800 (DCS).
    Dcs,
    /// GSM 1900 (PCS).
    Pcs,
    /// UTRAN band 1 (2100 MHz).
    Utran1,
    /// UTRAN band 2 (1900 MHz).
    Utran2,
    /// UTRAN band 5 (850 MHz).
    Utran5,
    /// UTRAN band 8 (900 MHz).
    Utran8,
    /// E-UTRAN band 1 (2100 MHz).
    Eutran1,
    /// E-UTRAN band 3 (1800 MHz).
    Eutran3,
    /// E-UTRAN band 7 (2600 MHz).
    Eutran7,
    /// E-UTRAN band 8 (900 MHz).
    Eutran8,
    /// E-UTRAN band 20 (800 MHz).
    Eutran20,
}

impl Band {
    /// Frequency used by `+UBANDSEL` for this band.
    pub fn ubandsel_frequency(self) -> u16 {
        match self {
            Band::G850 | Band::Utran5 => 850,
            Band::Egsm | Band::Utran8 | Band::Eutran8 => 900,
            Band::Dcs | Band::Eutran3 => 1800,
            Band::Pcs | Band::Utran2 => 1900,
            Band::Utran1 | Band::Eutran1 => 2100,
            Band::Eutran7 => 2600,
            Band::Eutran20 => 800,
        }
    }

    /// Band number used by `+UACT` for this band.
    pub fn uact_number(self) -> u16 {
        match self {
            Band::G850 => 850,
            Band::Egsm => 900,
            Band::Dcs => 1800,
            Band::Pcs => 1900,
            Band::Utran1 => 1,
            Band::Utran2 => 2,
            Band::Utran5 => 5,
            Band::Utran8 => 8,
            Band::Eutran1 => 101,
            Band::Eutran3 => 103,
            Band::Eutran7 => 107,
            Band::Eutran8 => 108,
            Band::Eutran20 => 120,
        }
    }

    /// Reverse of [`Band::uact_number`].
    pub fn from_uact_number(number: u16) -> Option<Band> {
        match number {
            850 => Some(Band::G850),
            900 => Some(Band::Egsm),
            1800 => Some(Band::Dcs),
            1900 => Some(Band::Pcs),
            1 => Some(Band::Utran1),
            2 => Some(Band::Utran2),
            5 => Some(Band::Utran5),
            8 => Some(Band::Utran8),
            101 => Some(Band::Eutran1),
            103 => Some(Band::Eutran3),
            107 => Some(Band::Eutran7),
            108 => Some(Band::Eutran8),
            120 => Some(Band::Eutran20),
            _ => None,
        }
    }
}

/// IP stack requested for a default bearer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpFamily {
    /// No preference; IPv4 is picked when the device must choose.
    #[default]
    Any,
    /// IPv4 only.
    V4,
    /// IPv6 only.
    V6,
    /// Dual stack.
    V4V6,
}

impl IpFamily {
    /// PDP type string used on the wire.
    pub fn pdp_type(self) -> &'static str {
        match self {
            IpFamily::Any | IpFamily::V4 => "IP",
            IpFamily::V6 => "IPV6",
            IpFamily::V4V6 => "IPV4V6",
        }
    }

    /// Parse a PDP type string.
    pub fn from_pdp_type(pdp_type: &str) -> Option<IpFamily> {
        match pdp_type {
            "IP" => Some(IpFamily::V4),
            "IPV6" => Some(IpFamily::V6),
            "IPV4V6" => Some(IpFamily::V4V6),
            _ => None,
        }
    }
}

/// Settings of the initial (attach) EPS bearer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EpsBearerSettings {
    /// Access point name; empty when the network decides.
    pub apn: String,
    /// Authentication user name, if any.
    pub user: String,
    /// Authentication password, if any.
    pub password: String,
    /// Requested IP stack.
    pub ip_type: IpFamily,
}

/// State of one voice call as reported by `+UCALLSTAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Call established.
    Active,
    /// Call on hold.
    Held,
    /// Outgoing call being set up.
    Dialing,
    /// Outgoing call alerting the remote side.
    RingingOut,
    /// Incoming call ringing locally.
    RingingIn,
    /// Incoming call waiting behind an active one.
    Waiting,
    /// Call ended.
    Terminated,
}

/// Direction of a call, inferred from its state where possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallDirection {
    /// Could not be inferred.
    #[default]
    Unknown,
    /// Mobile-terminated.
    Incoming,
    /// Mobile-originated.
    Outgoing,
}

/// One decoded `+UCALLSTAT` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallInfo {
    /// Call index assigned by the device.
    pub index: u32,
    /// Reported call state.
    pub state: CallState,
    /// Inferred call direction.
    pub direction: CallDirection,
}

/// Decoded voice notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEvent {
    /// A call changed state.
    Call(CallInfo),
    /// A DTMF digit was detected during a call.
    Dtmf(char),
}
