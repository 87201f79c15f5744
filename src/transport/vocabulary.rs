//! What the session can ask of the service.
//!
//! [`Request`] covers the asynchronous operations: the service accepts one,
//! hands back a [`Token`](crate::types::Token), and answers later with an
//! event carrying that token. [`DirectCall`] covers everything the service
//! answers in place.

use serde::{Deserialize, Serialize};

use crate::error::{ExtPhoneError, Result};
use crate::types::data::{
    AccessMode, CellularRoamingPreference, CiwlanConfig, ImsiEncryptionInfo, MsimPreference,
    NetworkScanRequest, NrConfig, QtiImeiInfo, QtiPersoUnlockStatus, QtiSetNetworkSelectionMode,
    QtiSimType,
};
use crate::types::{EventSet, Feature, SlotId};

/// Which callback channel a registration opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationKind {
    /// Every event kind.
    All,
    /// Only the listed kinds.
    Events(EventSet),
    /// The radio-config channel. The service decides which events it
    /// carries; locally it is treated like `All`.
    RadioConfig,
}

impl RegistrationKind {
    /// Event kinds this registration wants broadcast to it.
    pub fn interest(&self) -> EventSet {
        match self {
            RegistrationKind::All | RegistrationKind::RadioConfig => EventSet::all(),
            RegistrationKind::Events(set) => *set,
        }
    }
}

/// Registration request sent to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Package identity of the registering component.
    pub package: String,
    /// Channel and interest.
    pub kind: RegistrationKind,
}

/// Token-returning operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Request {
    EnableEndc { slot: SlotId, enable: bool },
    QueryNrIconType { slot: SlotId },
    QueryEndcStatus { slot: SlotId },
    SetNrConfig { slot: SlotId, config: NrConfig },
    QueryNrConfig { slot: SlotId },
    Enable5g { slot: SlotId },
    Disable5g { slot: SlotId },
    Enable5gOnly { slot: SlotId },
    Query5gStatus { slot: SlotId },
    QueryNrBearerAllocation { slot: SlotId },
    QueryNrDcParam { slot: SlotId },
    QueryNrSignalStrength { slot: SlotId },
    QueryUpperLayerIndInfo { slot: SlotId },
    Query5gConfigInfo { slot: SlotId },
    QueryNrIcon { slot: SlotId },
    SetNetworkSelectionModeAutomatic { slot: SlotId, access_mode: AccessMode },
    SetNetworkSelectionModeManual { slot: SlotId, mode: QtiSetNetworkSelectionMode },
    GetNetworkSelectionMode { slot: SlotId },
    StartNetworkScan { slot: SlotId, request: NetworkScanRequest },
    StopNetworkScan { slot: SlotId },
    SendCdmaSms {
        slot: SlotId,
        #[serde(with = "serde_bytes")]
        pdu: Vec<u8>,
        expect_more: bool,
    },
    QueryCallForwardStatus {
        slot: SlotId,
        reason: i32,
        service_class: i32,
        number: String,
        expect_more: bool,
    },
    GetFacilityLockForApp {
        slot: SlotId,
        facility: String,
        password: String,
        service_class: i32,
        app_id: String,
        expect_more: bool,
    },
    GetQtiRadioCapability { slot: SlotId },
    SetCarrierInfoForImsiEncryption { slot: SlotId, info: ImsiEncryptionInfo },
    SetMsimPreference { preference: MsimPreference },
    SetSimType { sim_types: Vec<QtiSimType> },
    SetSmartDdsSwitchToggle { enabled: bool },
    GetDdsSwitchCapability { slot: SlotId },
    SendUserPreferenceForDataDuringVoiceCall { slot: SlotId, allowed: bool },
    GetDdsSwitchConfigCapability,
    SendUserPreferenceConfigForDataDuringVoiceCall { allowed_on_slot: Vec<bool> },
    GetQosParameters { slot: SlotId, cid: i32 },
    GetSecureModeStatus,
    SetDualDataUserPreference { enable: bool },
    SetCiwlanModeUserPreference { slot: SlotId, config: CiwlanConfig },
    SetCellularRoamingPreference { slot: SlotId, preference: CellularRoamingPreference },
}

/// Operations the service answers in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum DirectCall {
    IsFeatureSupported(Feature),
    GetPropertyValueInt { name: String, default: i32 },
    GetPropertyValueBool { name: String, default: bool },
    GetPropertyValueString { name: String, default: String },
    IsPrimaryCarrierSlotId(SlotId),
    GetCurrentPrimaryCardSlotId,
    GetPrimaryCarrierSlotId,
    SetPrimaryCardOnSlot(SlotId),
    PerformIncrementalScan(SlotId),
    AbortIncrementalScan(SlotId),
    IsSmsPromptEnabled,
    SetSmsPromptEnabled(bool),
    SupplyIccDepersonalization { slot: SlotId, netpin: String, perso_type: String },
    GetImeiInfo,
    IsSmartDdsSwitchFeatureAvailable,
    SetAirplaneMode(bool),
    GetAirplaneMode,
    CheckSimPinLockStatus { sub_id: i32 },
    ToggleSimPinLock { sub_id: i32, enabled: bool, pin: String },
    VerifySimPin { sub_id: i32, pin: String },
    VerifySimPukChangePin { sub_id: i32, puk: String, new_pin: String },
    IsEpdgOverCellularDataSupported(SlotId),
    GetSupportedSimTypes,
    GetCurrentSimType,
    GetCiwlanConfig(SlotId),
    GetDualDataCapability,
    IsCiwlanAvailable(SlotId),
    GetCiwlanModeUserPreference(SlotId),
    GetSimPersoUnlockStatus(SlotId),
    GetCellularRoamingPreference(SlotId),
}

/// Answer to a [`DirectCall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum DirectReply {
    Unit,
    Bool(bool),
    Int(i32),
    Str(String),
    ImeiInfo(Vec<QtiImeiInfo>),
    SimTypes(Vec<QtiSimType>),
    CiwlanConfig(Option<CiwlanConfig>),
    PersoUnlockStatus(Option<QtiPersoUnlockStatus>),
    RoamingPreference(Option<CellularRoamingPreference>),
}

fn mismatch(expected: &str, got: &DirectReply) -> ExtPhoneError {
    ExtPhoneError::Protocol(format!("expected {expected} reply, got {got:?}"))
}

impl DirectReply {
    /// Accept only `Unit`.
    pub fn into_unit(self) -> Result<()> {
        match self {
            DirectReply::Unit => Ok(()),
            other => Err(mismatch("unit", &other)),
        }
    }

    pub fn into_bool(self) -> Result<bool> {
        match self {
            DirectReply::Bool(v) => Ok(v),
            other => Err(mismatch("bool", &other)),
        }
    }

    pub fn into_int(self) -> Result<i32> {
        match self {
            DirectReply::Int(v) => Ok(v),
            other => Err(mismatch("int", &other)),
        }
    }

    pub fn into_string(self) -> Result<String> {
        match self {
            DirectReply::Str(v) => Ok(v),
            other => Err(mismatch("string", &other)),
        }
    }

    pub fn into_imei_info(self) -> Result<Vec<QtiImeiInfo>> {
        match self {
            DirectReply::ImeiInfo(v) => Ok(v),
            other => Err(mismatch("IMEI info", &other)),
        }
    }

    pub fn into_sim_types(self) -> Result<Vec<QtiSimType>> {
        match self {
            DirectReply::SimTypes(v) => Ok(v),
            other => Err(mismatch("SIM types", &other)),
        }
    }

    pub fn into_ciwlan_config(self) -> Result<Option<CiwlanConfig>> {
        match self {
            DirectReply::CiwlanConfig(v) => Ok(v),
            other => Err(mismatch("C_IWLAN config", &other)),
        }
    }

    pub fn into_perso_unlock_status(self) -> Result<Option<QtiPersoUnlockStatus>> {
        match self {
            DirectReply::PersoUnlockStatus(v) => Ok(v),
            other => Err(mismatch("perso unlock status", &other)),
        }
    }

    pub fn into_roaming_preference(self) -> Result<Option<CellularRoamingPreference>> {
        match self {
            DirectReply::RoamingPreference(v) => Ok(v),
            other => Err(mismatch("roaming preference", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventKind;

    #[test]
    fn test_registration_interest() {
        assert_eq!(RegistrationKind::All.interest(), EventSet::all());
        let only = EventSet::from_iter([EventKind::NrIconChange]);
        assert_eq!(RegistrationKind::Events(only).interest(), only);
    }

    #[test]
    fn test_reply_mismatch_is_protocol_error() {
        let err = DirectReply::Int(3).into_bool().unwrap_err();
        assert!(matches!(err, ExtPhoneError::Protocol(_)));
        assert_eq!(DirectReply::Bool(true).into_bool().unwrap(), true);
        assert_eq!(DirectReply::CiwlanConfig(None).into_ciwlan_config().unwrap(), None);
    }
}
