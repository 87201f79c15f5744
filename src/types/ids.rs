//! Opaque identifiers and small enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// SIM slot index.
pub type SlotId = u32;

/// Handle the remote service issues when a callback registers.
///
/// Only transports construct these (from the raw value the service sent);
/// everyone else treats them as correlation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Client(u64);

impl Client {
    /// Wrap a raw value received from the service.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value, for putting back on the wire.
    #[inline]
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// Handle the remote service returns when it accepts a request.
///
/// Compared only for equality. Values are never reused within one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(u32);

impl Token {
    /// Wrap a raw value received from the service.
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw value, for putting back on the wire.
    #[inline]
    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token#{}", self.0)
    }
}

/// Outcome code carried by responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// The request succeeded.
    #[default]
    Success,
    /// The request failed on the service side.
    Failure,
}

impl Status {
    /// Whether this is `Success`.
    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Success)
    }
}

/// Optional service capabilities, checked with `is_feature_supported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// Back-to-back supplementary service requests.
    BackToBackSupplementaryServiceReq,
    /// Temporary SIM personalization unlock.
    PersoUnlockTemp,
    /// C_IWLAN configuration query.
    GetCiwlanConfig,
    /// Cellular roaming preference.
    CellularRoaming,
    /// C_IWLAN mode user preference.
    CiwlanModePreference,
    /// NITZ enhancement.
    NitzEnhancement,
    /// Temporary DDS switch via radio config.
    SmartTempDdsViaRadioConfig,
}

impl Feature {
    /// Numeric identifier the service uses for this feature.
    pub fn id(&self) -> u32 {
        match self {
            Feature::BackToBackSupplementaryServiceReq => 1,
            Feature::PersoUnlockTemp => 2,
            Feature::GetCiwlanConfig => 3,
            Feature::CellularRoaming => 4,
            Feature::CiwlanModePreference => 5,
            Feature::NitzEnhancement => 6,
            Feature::SmartTempDdsViaRadioConfig => 101,
        }
    }

    /// Look a feature up by its numeric identifier.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(Feature::BackToBackSupplementaryServiceReq),
            2 => Some(Feature::PersoUnlockTemp),
            3 => Some(Feature::GetCiwlanConfig),
            4 => Some(Feature::CellularRoaming),
            5 => Some(Feature::CiwlanModePreference),
            6 => Some(Feature::NitzEnhancement),
            101 => Some(Feature::SmartTempDdsViaRadioConfig),
            _ => None,
        }
    }
}
