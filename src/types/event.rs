//! Inbound event vocabulary.
//!
//! Every response or notification the service can emit has one [`EventKind`]
//! and one [`EventPayload`] variant of the same name. Registrations filter on
//! kinds through an [`EventSet`].

use serde::{Deserialize, Serialize};

use super::data::{
    BearerAllocationStatus, CiwlanConfig, DcParam, DualDataRecommendation, NetworkScanResult,
    NetworkSelectionMode, NrConfig, NrIcon, NrIconType, QosParametersResult, QtiCallForwardInfo,
    QtiImeiInfo, QtiPersoUnlockStatus, QtiSimType, SignalStrength, SmsResult, UpperLayerIndInfo,
};
use super::{Client, SlotId, Status, Token};

/// Kind of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventKind {
    NrIconType,
    EnableEndc,
    EndcStatus,
    SetNrConfig,
    NrConfigStatus,
    SendCdmaSms,
    FiveGStatus,
    NrBearerAllocation,
    QtiRadioCapability,
    QosParameters,
    NrDcParam,
    UpperLayerIndInfo,
    FiveGConfigInfo,
    NrSignalStrength,
    SetCarrierInfoForImsiEncryption,
    CallForwardStatus,
    FacilityLockForApp,
    SmartDdsSwitchToggle,
    ImeiTypeChanged,
    SendUserPreferenceForDataDuringVoiceCall,
    DdsSwitchCapabilityChange,
    DdsSwitchCriteriaChange,
    DdsSwitchRecommendation,
    DataDeactivateDelayTime,
    EpdgOverCellularDataSupported,
    SecureModeStatus,
    SecureModeStatusChange,
    StartNetworkScan,
    StopNetworkScan,
    SetNetworkSelectionModeManual,
    SetNetworkSelectionModeAutomatic,
    NetworkSelectionMode,
    NetworkScanResult,
    SetMsimPreference,
    QosParametersChanged,
    SetSimType,
    SimTypeChanged,
    DualDataCapabilityChanged,
    SetDualDataUserPreference,
    DualDataRecommendation,
    SimPersoUnlockStatusChange,
    DdsSwitchConfigCapabilityChanged,
    DdsSwitchConfigCriteriaChanged,
    DdsSwitchConfigRecommendation,
    SendUserPreferenceConfigForDataDuringVoiceCall,
    SetCellularRoamingPreference,
    CiwlanAvailable,
    CiwlanConfigChange,
    SetCiwlanModeUserPreference,
    NrIconChange,
    NrIconResponse,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 51] = [
        EventKind::NrIconType,
        EventKind::EnableEndc,
        EventKind::EndcStatus,
        EventKind::SetNrConfig,
        EventKind::NrConfigStatus,
        EventKind::SendCdmaSms,
        EventKind::FiveGStatus,
        EventKind::NrBearerAllocation,
        EventKind::QtiRadioCapability,
        EventKind::QosParameters,
        EventKind::NrDcParam,
        EventKind::UpperLayerIndInfo,
        EventKind::FiveGConfigInfo,
        EventKind::NrSignalStrength,
        EventKind::SetCarrierInfoForImsiEncryption,
        EventKind::CallForwardStatus,
        EventKind::FacilityLockForApp,
        EventKind::SmartDdsSwitchToggle,
        EventKind::ImeiTypeChanged,
        EventKind::SendUserPreferenceForDataDuringVoiceCall,
        EventKind::DdsSwitchCapabilityChange,
        EventKind::DdsSwitchCriteriaChange,
        EventKind::DdsSwitchRecommendation,
        EventKind::DataDeactivateDelayTime,
        EventKind::EpdgOverCellularDataSupported,
        EventKind::SecureModeStatus,
        EventKind::SecureModeStatusChange,
        EventKind::StartNetworkScan,
        EventKind::StopNetworkScan,
        EventKind::SetNetworkSelectionModeManual,
        EventKind::SetNetworkSelectionModeAutomatic,
        EventKind::NetworkSelectionMode,
        EventKind::NetworkScanResult,
        EventKind::SetMsimPreference,
        EventKind::QosParametersChanged,
        EventKind::SetSimType,
        EventKind::SimTypeChanged,
        EventKind::DualDataCapabilityChanged,
        EventKind::SetDualDataUserPreference,
        EventKind::DualDataRecommendation,
        EventKind::SimPersoUnlockStatusChange,
        EventKind::DdsSwitchConfigCapabilityChanged,
        EventKind::DdsSwitchConfigCriteriaChanged,
        EventKind::DdsSwitchConfigRecommendation,
        EventKind::SendUserPreferenceConfigForDataDuringVoiceCall,
        EventKind::SetCellularRoamingPreference,
        EventKind::CiwlanAvailable,
        EventKind::CiwlanConfigChange,
        EventKind::SetCiwlanModeUserPreference,
        EventKind::NrIconChange,
        EventKind::NrIconResponse,
    ];

    /// Bit position inside an [`EventSet`].
    #[inline]
    fn bit(self) -> u64 {
        1u64 << (self as u8)
    }
}

/// Set of event kinds a registration wants delivered.
///
/// Backed by a 64-bit mask; there are fewer than 64 kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "Vec<EventKind>", from = "Vec<EventKind>")]
pub struct EventSet(u64);

impl EventSet {
    /// No kinds.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every kind (full callback surface).
    pub fn all() -> Self {
        EventKind::ALL.iter().copied().collect()
    }

    /// Add a kind.
    pub fn insert(&mut self, kind: EventKind) {
        self.0 |= kind.bit();
    }

    /// Builder-style insert.
    pub fn with(mut self, kind: EventKind) -> Self {
        self.insert(kind);
        self
    }

    /// Membership test.
    #[inline]
    pub fn contains(&self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// No kinds selected.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of kinds selected.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Selected kinds, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = EventKind> + '_ {
        EventKind::ALL.iter().copied().filter(|k| self.contains(*k))
    }
}

impl FromIterator<EventKind> for EventSet {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        let mut set = EventSet::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl From<Vec<EventKind>> for EventSet {
    fn from(kinds: Vec<EventKind>) -> Self {
        kinds.into_iter().collect()
    }
}

impl From<EventSet> for Vec<EventKind> {
    fn from(set: EventSet) -> Self {
        set.iter().collect()
    }
}

/// Typed payload of an inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    NrIconType(NrIconType),
    EnableEndc,
    EndcStatus(bool),
    SetNrConfig,
    NrConfigStatus(NrConfig),
    SendCdmaSms(SmsResult),
    FiveGStatus(bool),
    NrBearerAllocation(BearerAllocationStatus),
    QtiRadioCapability(i32),
    QosParameters(QosParametersResult),
    NrDcParam(DcParam),
    UpperLayerIndInfo(UpperLayerIndInfo),
    FiveGConfigInfo(NrConfig),
    NrSignalStrength(SignalStrength),
    SetCarrierInfoForImsiEncryption,
    CallForwardStatus(Vec<QtiCallForwardInfo>),
    FacilityLockForApp(Vec<i32>),
    SmartDdsSwitchToggle(bool),
    ImeiTypeChanged(Vec<QtiImeiInfo>),
    SendUserPreferenceForDataDuringVoiceCall,
    DdsSwitchCapabilityChange(bool),
    DdsSwitchCriteriaChange(bool),
    DdsSwitchRecommendation(SlotId),
    DataDeactivateDelayTime(u64),
    EpdgOverCellularDataSupported(bool),
    SecureModeStatus(bool),
    SecureModeStatusChange(bool),
    StartNetworkScan(i32),
    StopNetworkScan(i32),
    SetNetworkSelectionModeManual(i32),
    SetNetworkSelectionModeAutomatic(i32),
    NetworkSelectionMode(NetworkSelectionMode),
    NetworkScanResult(NetworkScanResult),
    SetMsimPreference,
    QosParametersChanged { cid: i32, result: QosParametersResult },
    SetSimType,
    SimTypeChanged(Vec<QtiSimType>),
    DualDataCapabilityChanged(bool),
    SetDualDataUserPreference,
    DualDataRecommendation(DualDataRecommendation),
    SimPersoUnlockStatusChange(QtiPersoUnlockStatus),
    DdsSwitchConfigCapabilityChanged(bool),
    DdsSwitchConfigCriteriaChanged(bool),
    DdsSwitchConfigRecommendation(SlotId),
    SendUserPreferenceConfigForDataDuringVoiceCall,
    SetCellularRoamingPreference,
    CiwlanAvailable(bool),
    CiwlanConfigChange(CiwlanConfig),
    SetCiwlanModeUserPreference,
    NrIconChange(NrIcon),
    NrIconResponse(NrIcon),
}

impl EventPayload {
    /// The kind this payload belongs to.
    pub fn kind(&self) -> EventKind {
        use EventPayload as P;
        match self {
            P::NrIconType(_) => EventKind::NrIconType,
            P::EnableEndc => EventKind::EnableEndc,
            P::EndcStatus(_) => EventKind::EndcStatus,
            P::SetNrConfig => EventKind::SetNrConfig,
            P::NrConfigStatus(_) => EventKind::NrConfigStatus,
            P::SendCdmaSms(_) => EventKind::SendCdmaSms,
            P::FiveGStatus(_) => EventKind::FiveGStatus,
            P::NrBearerAllocation(_) => EventKind::NrBearerAllocation,
            P::QtiRadioCapability(_) => EventKind::QtiRadioCapability,
            P::QosParameters(_) => EventKind::QosParameters,
            P::NrDcParam(_) => EventKind::NrDcParam,
            P::UpperLayerIndInfo(_) => EventKind::UpperLayerIndInfo,
            P::FiveGConfigInfo(_) => EventKind::FiveGConfigInfo,
            P::NrSignalStrength(_) => EventKind::NrSignalStrength,
            P::SetCarrierInfoForImsiEncryption => EventKind::SetCarrierInfoForImsiEncryption,
            P::CallForwardStatus(_) => EventKind::CallForwardStatus,
            P::FacilityLockForApp(_) => EventKind::FacilityLockForApp,
            P::SmartDdsSwitchToggle(_) => EventKind::SmartDdsSwitchToggle,
            P::ImeiTypeChanged(_) => EventKind::ImeiTypeChanged,
            P::SendUserPreferenceForDataDuringVoiceCall => {
                EventKind::SendUserPreferenceForDataDuringVoiceCall
            }
            P::DdsSwitchCapabilityChange(_) => EventKind::DdsSwitchCapabilityChange,
            P::DdsSwitchCriteriaChange(_) => EventKind::DdsSwitchCriteriaChange,
            P::DdsSwitchRecommendation(_) => EventKind::DdsSwitchRecommendation,
            P::DataDeactivateDelayTime(_) => EventKind::DataDeactivateDelayTime,
            P::EpdgOverCellularDataSupported(_) => EventKind::EpdgOverCellularDataSupported,
            P::SecureModeStatus(_) => EventKind::SecureModeStatus,
            P::SecureModeStatusChange(_) => EventKind::SecureModeStatusChange,
            P::StartNetworkScan(_) => EventKind::StartNetworkScan,
            P::StopNetworkScan(_) => EventKind::StopNetworkScan,
            P::SetNetworkSelectionModeManual(_) => EventKind::SetNetworkSelectionModeManual,
            P::SetNetworkSelectionModeAutomatic(_) => EventKind::SetNetworkSelectionModeAutomatic,
            P::NetworkSelectionMode(_) => EventKind::NetworkSelectionMode,
            P::NetworkScanResult(_) => EventKind::NetworkScanResult,
            P::SetMsimPreference => EventKind::SetMsimPreference,
            P::QosParametersChanged { .. } => EventKind::QosParametersChanged,
            P::SetSimType => EventKind::SetSimType,
            P::SimTypeChanged(_) => EventKind::SimTypeChanged,
            P::DualDataCapabilityChanged(_) => EventKind::DualDataCapabilityChanged,
            P::SetDualDataUserPreference => EventKind::SetDualDataUserPreference,
            P::DualDataRecommendation(_) => EventKind::DualDataRecommendation,
            P::SimPersoUnlockStatusChange(_) => EventKind::SimPersoUnlockStatusChange,
            P::DdsSwitchConfigCapabilityChanged(_) => EventKind::DdsSwitchConfigCapabilityChanged,
            P::DdsSwitchConfigCriteriaChanged(_) => EventKind::DdsSwitchConfigCriteriaChanged,
            P::DdsSwitchConfigRecommendation(_) => EventKind::DdsSwitchConfigRecommendation,
            P::SendUserPreferenceConfigForDataDuringVoiceCall => {
                EventKind::SendUserPreferenceConfigForDataDuringVoiceCall
            }
            P::SetCellularRoamingPreference => EventKind::SetCellularRoamingPreference,
            P::CiwlanAvailable(_) => EventKind::CiwlanAvailable,
            P::CiwlanConfigChange(_) => EventKind::CiwlanConfigChange,
            P::SetCiwlanModeUserPreference => EventKind::SetCiwlanModeUserPreference,
            P::NrIconChange(_) => EventKind::NrIconChange,
            P::NrIconResponse(_) => EventKind::NrIconResponse,
        }
    }
}

/// Envelope the transport hands to the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Slot the event concerns, if slot-scoped.
    pub slot: Option<SlotId>,
    /// Target registration; `None` means broadcast.
    pub client: Option<Client>,
    /// Token of the request this answers, if any.
    pub token: Option<Token>,
    /// Outcome code.
    pub status: Status,
    /// Typed payload.
    pub payload: EventPayload,
}

impl InboundEvent {
    /// Broadcast notification with no token.
    pub fn broadcast(slot: Option<SlotId>, payload: EventPayload) -> Self {
        Self {
            slot,
            client: None,
            token: None,
            status: Status::Success,
            payload,
        }
    }

    /// Response addressed to one client.
    pub fn response(
        client: Client,
        token: Option<Token>,
        slot: Option<SlotId>,
        status: Status,
        payload: EventPayload,
    ) -> Self {
        Self {
            slot,
            client: Some(client),
            token,
            status,
            payload,
        }
    }

    /// Kind of the payload.
    #[inline]
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// No target client.
    #[inline]
    pub fn is_broadcast(&self) -> bool {
        self.client.is_none()
    }

    /// The slot/token/status triple handed to callbacks.
    pub fn meta(&self) -> EventMeta {
        EventMeta {
            slot: self.slot,
            token: self.token,
            status: self.status,
        }
    }
}

/// Envelope fields every callback method receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMeta {
    /// Slot the event concerns.
    pub slot: Option<SlotId>,
    /// Token of the originating request.
    pub token: Option<Token>,
    /// Outcome code.
    pub status: Status,
}
