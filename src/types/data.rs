//! Plain records carried in requests and events.
//!
//! These are immutable data with no behavior beyond a few validity helpers.

use serde::{Deserialize, Serialize};

use super::SlotId;

/// NR icon type reported by `query_nr_icon_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NrIconType {
    /// No NR icon.
    None,
    /// Basic 5G icon.
    Basic,
    /// Ultra-wideband 5G icon.
    Uwb,
}

/// NR icon with receive-chain count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NrIcon {
    /// Icon type.
    pub icon_type: NrIconType,
    /// Number of receive chains.
    pub rx_count: i32,
}

/// NR deployment configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NrConfig {
    /// Both non-standalone and standalone.
    NsaSa,
    /// Non-standalone only.
    Nsa,
    /// Standalone only.
    Sa,
}

/// Result of a CDMA SMS send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsResult {
    /// Message reference assigned by the network.
    pub message_ref: i32,
    /// Acknowledgement PDU, hex encoded.
    pub ack_pdu: String,
    /// Network error code, 0 on success.
    pub error_code: i32,
}

/// NR bearer allocation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BearerAllocationStatus {
    /// No NR bearer.
    NotAllocated,
    /// Sub-6 bearer allocated.
    Allocated,
    /// mmWave bearer allocated.
    MmwaveAllocated,
}

/// QoS parameters of a data call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QosParametersResult {
    /// 5G QoS identifier.
    pub five_qi: i32,
    /// Guaranteed downlink bitrate in kbps.
    pub downlink_kbps: u32,
    /// Guaranteed uplink bitrate in kbps.
    pub uplink_kbps: u32,
}

/// EN-DC parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcParam {
    /// EN-DC available in the serving cell.
    pub endc_available: bool,
    /// DCNR restricted.
    pub restrict_dcnr: bool,
}

/// Upper layer indication info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpperLayerIndInfo {
    /// PLMN info list available.
    pub plmn_info_list_available: bool,
    /// Upper layer indication available.
    pub upper_layer_ind_info_available: bool,
}

/// NR signal strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStrength {
    /// Reference signal received power, dBm.
    pub rsrp: i32,
    /// Signal to noise ratio, dB.
    pub snr: i32,
}

/// One call forwarding rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QtiCallForwardInfo {
    /// Active (1) or inactive (0).
    pub status: i32,
    /// Forwarding reason.
    pub reason: i32,
    /// Service class bitmask.
    pub service_class: i32,
    /// Type of address.
    pub toa: i32,
    /// Forwarding number.
    pub number: String,
    /// No-reply timer in seconds.
    pub time_seconds: i32,
}

/// Which IMEI of a slot this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImeiType {
    /// Primary IMEI.
    Primary,
    /// Secondary IMEI.
    Secondary,
}

/// IMEI assignment for a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QtiImeiInfo {
    /// Slot the IMEI belongs to.
    pub slot: SlotId,
    /// The IMEI digits.
    pub imei: String,
    /// Primary or secondary.
    pub imei_type: ImeiType,
}

/// Network access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    /// Public land mobile network.
    Plmn,
    /// Standalone non-public network.
    Snpn,
}

/// Current network selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSelectionMode {
    /// Access mode in use.
    pub access_mode: AccessMode,
    /// Manual (true) or automatic (false) selection.
    pub is_manual: bool,
}

/// Parameters for a manual network selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QtiSetNetworkSelectionMode {
    /// MCC+MNC of the operator.
    pub operator_numeric: String,
    /// Radio access network.
    pub ran: i32,
    /// Access mode.
    pub access_mode: AccessMode,
}

/// Radio access technology and bands to scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioAccessSpecifier {
    /// Radio access network.
    pub ran: i32,
    /// Bands to scan.
    pub bands: Vec<i32>,
    /// Channels to scan.
    pub channels: Vec<i32>,
}

/// Network scan parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkScanRequest {
    /// One-shot (0) or periodic (1).
    pub scan_type: i32,
    /// What to scan.
    pub specifiers: Vec<RadioAccessSpecifier>,
    /// Seconds between periodic scans.
    pub periodicity_secs: u32,
    /// Overall scan budget in seconds.
    pub max_search_time_secs: u32,
    /// Report partial results as they arrive.
    pub incremental_results: bool,
    /// PLMNs to restrict the scan to.
    pub plmns: Vec<String>,
}

/// One cell found by a network scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellInfo {
    /// Radio access technology.
    pub rat: i32,
    /// MCC+MNC.
    pub operator_numeric: String,
    /// Whether the device is registered on it.
    pub registered: bool,
    /// Signal level, dBm.
    pub signal_dbm: i32,
}

/// Partial or final network scan result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkScanResult {
    /// Partial (1) or complete (2).
    pub scan_status: i32,
    /// Error code, 0 on success.
    pub error: i32,
    /// Cells found.
    pub cells: Vec<CellInfo>,
}

/// Carrier key used for IMSI encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImsiEncryptionInfo {
    /// Mobile country code.
    pub mcc: String,
    /// Mobile network code.
    pub mnc: String,
    /// Key type (EPDG or WLAN).
    pub key_type: i32,
    /// Key identifier.
    pub key_identifier: String,
    /// Public key bytes.
    #[serde(with = "serde_bytes")]
    pub public_key: Vec<u8>,
    /// Expiration, milliseconds since the epoch.
    pub expiration_ms: i64,
}

/// Multi-SIM concurrency preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsimPreference {
    /// Dual SIM dual standby.
    Dsds,
    /// Dual SIM dual active.
    Dsda,
}

/// SIM form factor of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QtiSimType {
    /// Removable physical SIM.
    Physical,
    /// Integrated UICC.
    Iuicc,
    /// Embedded SIM.
    Esim,
}

/// Modem recommendation for dual data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualDataRecommendation {
    /// Which subscription the recommendation targets.
    pub target: i32,
    /// Allow or disallow.
    pub action: i32,
}

/// SIM personalization unlock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QtiPersoUnlockStatus {
    /// Unknown state.
    Unknown,
    /// Temporarily unlocked.
    Temporary,
    /// Permanently unlocked.
    Permanent,
}

/// Roaming switch value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoamingMode {
    /// Not set.
    Invalid,
    /// Roaming disabled.
    Disabled,
    /// Roaming enabled.
    Enabled,
}

/// Roaming preference split by domestic and international roaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellularRoamingPreference {
    /// International roaming preference.
    pub international: RoamingMode,
    /// Domestic roaming preference.
    pub domestic: RoamingMode,
}

impl CellularRoamingPreference {
    /// Both halves are set.
    pub fn is_valid(&self) -> bool {
        self.international != RoamingMode::Invalid && self.domestic != RoamingMode::Invalid
    }
}

/// C_IWLAN mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CiwlanMode {
    /// Not set.
    Invalid,
    /// C_IWLAN only.
    Only,
    /// C_IWLAN preferred.
    Preferred,
}

/// C_IWLAN mode for home and roaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiwlanConfig {
    /// Mode on the home network.
    pub home: CiwlanMode,
    /// Mode while roaming.
    pub roaming: CiwlanMode,
}

impl CiwlanConfig {
    /// Both halves are set.
    pub fn is_valid(&self) -> bool {
        self.home != CiwlanMode::Invalid && self.roaming != CiwlanMode::Invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roaming_preference_validity() {
        let pref = CellularRoamingPreference {
            international: RoamingMode::Enabled,
            domestic: RoamingMode::Disabled,
        };
        assert!(pref.is_valid());

        let partial = CellularRoamingPreference {
            international: RoamingMode::Invalid,
            domestic: RoamingMode::Enabled,
        };
        assert!(!partial.is_valid());
    }

    #[test]
    fn test_ciwlan_validity() {
        let config = CiwlanConfig {
            home: CiwlanMode::Only,
            roaming: CiwlanMode::Invalid,
        };
        assert!(!config.is_valid());
    }
}
