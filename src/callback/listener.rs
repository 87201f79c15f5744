//! Application-side callback surface.
//!
//! Implement only the methods you care about; every other event lands in
//! [`ExtPhoneCallback::unhandled`], which logs at trace level.
//!
//! ```
//! use extphone_client::callback::ExtPhoneCallback;
//! use extphone_client::types::EventMeta;
//! use extphone_client::types::data::NrIcon;
//!
//! struct IconWatcher;
//!
//! impl ExtPhoneCallback for IconWatcher {
//!     fn on_nr_icon_change(&self, meta: &EventMeta, icon: NrIcon) {
//!         println!("slot {:?}: {:?}", meta.slot, icon.icon_type);
//!     }
//! }
//! ```

use crate::types::data::{
    BearerAllocationStatus, CiwlanConfig, DcParam, DualDataRecommendation, NetworkScanResult,
    NetworkSelectionMode, NrConfig, NrIcon, NrIconType, QosParametersResult, QtiCallForwardInfo,
    QtiImeiInfo, QtiPersoUnlockStatus, QtiSimType, SignalStrength, SmsResult, UpperLayerIndInfo,
};
use crate::types::{EventKind, EventMeta, EventPayload, InboundEvent, SlotId};

/// Receiver of inbound events for one registration.
///
/// Methods run on the registration's delivery task, one at a time and in
/// arrival order. They must not block for long: later events for the same
/// registration wait behind them.
pub trait ExtPhoneCallback: Send + Sync + 'static {
    /// Fallback for every method left at its default.
    fn unhandled(&self, kind: EventKind) {
        tracing::trace!(?kind, "event without a handler");
    }

    /// Answer to `query_nr_icon_type`.
    fn on_nr_icon_type(&self, meta: &EventMeta, icon_type: NrIconType) {
        let _ = (meta, icon_type);
        self.unhandled(EventKind::NrIconType);
    }

    /// Answer to `enable_endc`.
    fn on_enable_endc(&self, meta: &EventMeta) {
        let _ = meta;
        self.unhandled(EventKind::EnableEndc);
    }

    /// Answer to `query_endc_status`.
    fn on_endc_status(&self, meta: &EventMeta, enabled: bool) {
        let _ = (meta, enabled);
        self.unhandled(EventKind::EndcStatus);
    }

    /// Answer to `set_nr_config`.
    fn on_set_nr_config(&self, meta: &EventMeta) {
        let _ = meta;
        self.unhandled(EventKind::SetNrConfig);
    }

    /// Answer to `query_nr_config`.
    fn on_nr_config_status(&self, meta: &EventMeta, config: NrConfig) {
        let _ = (meta, config);
        self.unhandled(EventKind::NrConfigStatus);
    }

    /// Answer to `send_cdma_sms`.
    fn on_send_cdma_sms(&self, meta: &EventMeta, result: &SmsResult) {
        let _ = (meta, result);
        self.unhandled(EventKind::SendCdmaSms);
    }

    /// Answer to `query_5g_status`, `enable_5g`, `disable_5g` and `enable_5g_only`.
    fn on_five_g_status(&self, meta: &EventMeta, enabled: bool) {
        let _ = (meta, enabled);
        self.unhandled(EventKind::FiveGStatus);
    }

    /// Answer to `query_nr_bearer_allocation`.
    fn on_nr_bearer_allocation(&self, meta: &EventMeta, status: BearerAllocationStatus) {
        let _ = (meta, status);
        self.unhandled(EventKind::NrBearerAllocation);
    }

    /// Answer to `get_qti_radio_capability`.
    fn on_qti_radio_capability(&self, meta: &EventMeta, radio_access_family: i32) {
        let _ = (meta, radio_access_family);
        self.unhandled(EventKind::QtiRadioCapability);
    }

    /// Answer to `get_qos_parameters`.
    fn on_qos_parameters(&self, meta: &EventMeta, result: &QosParametersResult) {
        let _ = (meta, result);
        self.unhandled(EventKind::QosParameters);
    }

    fn on_nr_dc_param(&self, meta: &EventMeta, param: DcParam) {
        let _ = (meta, param);
        self.unhandled(EventKind::NrDcParam);
    }

    fn on_upper_layer_ind_info(&self, meta: &EventMeta, info: UpperLayerIndInfo) {
        let _ = (meta, info);
        self.unhandled(EventKind::UpperLayerIndInfo);
    }

    fn on_five_g_config_info(&self, meta: &EventMeta, config: NrConfig) {
        let _ = (meta, config);
        self.unhandled(EventKind::FiveGConfigInfo);
    }

    fn on_nr_signal_strength(&self, meta: &EventMeta, strength: SignalStrength) {
        let _ = (meta, strength);
        self.unhandled(EventKind::NrSignalStrength);
    }

    fn on_set_carrier_info_for_imsi_encryption(&self, meta: &EventMeta) {
        let _ = meta;
        self.unhandled(EventKind::SetCarrierInfoForImsiEncryption);
    }

    /// Answer to `query_call_forward_status`.
    fn on_call_forward_status(&self, meta: &EventMeta, rules: &[QtiCallForwardInfo]) {
        let _ = (meta, rules);
        self.unhandled(EventKind::CallForwardStatus);
    }

    /// Answer to `get_facility_lock_for_app`.
    fn on_facility_lock_for_app(&self, meta: &EventMeta, response: &[i32]) {
        let _ = (meta, response);
        self.unhandled(EventKind::FacilityLockForApp);
    }

    fn on_smart_dds_switch_toggle(&self, meta: &EventMeta, enabled: bool) {
        let _ = (meta, enabled);
        self.unhandled(EventKind::SmartDdsSwitchToggle);
    }

    /// Broadcast when IMEI assignment changes.
    fn on_imei_type_changed(&self, meta: &EventMeta, info: &[QtiImeiInfo]) {
        let _ = (meta, info);
        self.unhandled(EventKind::ImeiTypeChanged);
    }

    fn on_send_user_preference_for_data_during_voice_call(&self, meta: &EventMeta) {
        let _ = meta;
        self.unhandled(EventKind::SendUserPreferenceForDataDuringVoiceCall);
    }

    fn on_dds_switch_capability_change(&self, meta: &EventMeta, supported: bool) {
        let _ = (meta, supported);
        self.unhandled(EventKind::DdsSwitchCapabilityChange);
    }

    fn on_dds_switch_criteria_change(&self, meta: &EventMeta, telephony_dds_switch: bool) {
        let _ = (meta, telephony_dds_switch);
        self.unhandled(EventKind::DdsSwitchCriteriaChange);
    }

    fn on_dds_switch_recommendation(&self, meta: &EventMeta, recommended_slot: SlotId) {
        let _ = (meta, recommended_slot);
        self.unhandled(EventKind::DdsSwitchRecommendation);
    }

    fn on_data_deactivate_delay_time(&self, meta: &EventMeta, delay_ms: u64) {
        let _ = (meta, delay_ms);
        self.unhandled(EventKind::DataDeactivateDelayTime);
    }

    fn on_epdg_over_cellular_data_supported(&self, meta: &EventMeta, supported: bool) {
        let _ = (meta, supported);
        self.unhandled(EventKind::EpdgOverCellularDataSupported);
    }

    /// Answer to `get_secure_mode_status`.
    fn on_secure_mode_status(&self, meta: &EventMeta, enabled: bool) {
        let _ = (meta, enabled);
        self.unhandled(EventKind::SecureModeStatus);
    }

    fn on_secure_mode_status_change(&self, meta: &EventMeta, enabled: bool) {
        let _ = (meta, enabled);
        self.unhandled(EventKind::SecureModeStatusChange);
    }

    fn on_start_network_scan(&self, meta: &EventMeta, error: i32) {
        let _ = (meta, error);
        self.unhandled(EventKind::StartNetworkScan);
    }

    fn on_stop_network_scan(&self, meta: &EventMeta, error: i32) {
        let _ = (meta, error);
        self.unhandled(EventKind::StopNetworkScan);
    }

    fn on_set_network_selection_mode_manual(&self, meta: &EventMeta, error: i32) {
        let _ = (meta, error);
        self.unhandled(EventKind::SetNetworkSelectionModeManual);
    }

    fn on_set_network_selection_mode_automatic(&self, meta: &EventMeta, error: i32) {
        let _ = (meta, error);
        self.unhandled(EventKind::SetNetworkSelectionModeAutomatic);
    }

    /// Answer to `get_network_selection_mode`.
    fn on_network_selection_mode(&self, meta: &EventMeta, mode: NetworkSelectionMode) {
        let _ = (meta, mode);
        self.unhandled(EventKind::NetworkSelectionMode);
    }

    /// Partial or final scan results; may arrive many times per token.
    fn on_network_scan_result(&self, meta: &EventMeta, result: &NetworkScanResult) {
        let _ = (meta, result);
        self.unhandled(EventKind::NetworkScanResult);
    }

    fn on_set_msim_preference(&self, meta: &EventMeta) {
        let _ = meta;
        self.unhandled(EventKind::SetMsimPreference);
    }

    /// Broadcast when the QoS of data call `cid` changes.
    fn on_qos_parameters_changed(&self, meta: &EventMeta, cid: i32, result: &QosParametersResult) {
        let _ = (meta, cid, result);
        self.unhandled(EventKind::QosParametersChanged);
    }

    fn on_set_sim_type(&self, meta: &EventMeta) {
        let _ = meta;
        self.unhandled(EventKind::SetSimType);
    }

    fn on_sim_type_changed(&self, meta: &EventMeta, sim_types: &[QtiSimType]) {
        let _ = (meta, sim_types);
        self.unhandled(EventKind::SimTypeChanged);
    }

    fn on_dual_data_capability_changed(&self, meta: &EventMeta, supported: bool) {
        let _ = (meta, supported);
        self.unhandled(EventKind::DualDataCapabilityChanged);
    }

    fn on_set_dual_data_user_preference(&self, meta: &EventMeta) {
        let _ = meta;
        self.unhandled(EventKind::SetDualDataUserPreference);
    }

    fn on_dual_data_recommendation(
        &self,
        meta: &EventMeta,
        recommendation: DualDataRecommendation,
    ) {
        let _ = (meta, recommendation);
        self.unhandled(EventKind::DualDataRecommendation);
    }

    fn on_sim_perso_unlock_status_change(&self, meta: &EventMeta, status: QtiPersoUnlockStatus) {
        let _ = (meta, status);
        self.unhandled(EventKind::SimPersoUnlockStatusChange);
    }

    fn on_dds_switch_config_capability_changed(&self, meta: &EventMeta, supported: bool) {
        let _ = (meta, supported);
        self.unhandled(EventKind::DdsSwitchConfigCapabilityChanged);
    }

    fn on_dds_switch_config_criteria_changed(&self, meta: &EventMeta, telephony_dds_switch: bool) {
        let _ = (meta, telephony_dds_switch);
        self.unhandled(EventKind::DdsSwitchConfigCriteriaChanged);
    }

    fn on_dds_switch_config_recommendation(&self, meta: &EventMeta, recommended_slot: SlotId) {
        let _ = (meta, recommended_slot);
        self.unhandled(EventKind::DdsSwitchConfigRecommendation);
    }

    fn on_send_user_preference_config_for_data_during_voice_call(&self, meta: &EventMeta) {
        let _ = meta;
        self.unhandled(EventKind::SendUserPreferenceConfigForDataDuringVoiceCall);
    }

    fn on_set_cellular_roaming_preference(&self, meta: &EventMeta) {
        let _ = meta;
        self.unhandled(EventKind::SetCellularRoamingPreference);
    }

    fn on_ciwlan_available(&self, meta: &EventMeta, available: bool) {
        let _ = (meta, available);
        self.unhandled(EventKind::CiwlanAvailable);
    }

    fn on_ciwlan_config_change(&self, meta: &EventMeta, config: CiwlanConfig) {
        let _ = (meta, config);
        self.unhandled(EventKind::CiwlanConfigChange);
    }

    fn on_set_ciwlan_mode_user_preference(&self, meta: &EventMeta) {
        let _ = meta;
        self.unhandled(EventKind::SetCiwlanModeUserPreference);
    }

    /// Broadcast when the displayed NR icon changes.
    fn on_nr_icon_change(&self, meta: &EventMeta, icon: NrIcon) {
        let _ = (meta, icon);
        self.unhandled(EventKind::NrIconChange);
    }

    /// Answer to `query_nr_icon`.
    fn on_nr_icon_response(&self, meta: &EventMeta, icon: NrIcon) {
        let _ = (meta, icon);
        self.unhandled(EventKind::NrIconResponse);
    }
}

/// Invoke the method matching `event`'s payload.
pub(crate) fn dispatch(callback: &dyn ExtPhoneCallback, event: &InboundEvent) {
    use EventPayload as P;

    let meta = &event.meta();
    match &event.payload {
        P::NrIconType(v) => callback.on_nr_icon_type(meta, *v),
        P::EnableEndc => callback.on_enable_endc(meta),
        P::EndcStatus(v) => callback.on_endc_status(meta, *v),
        P::SetNrConfig => callback.on_set_nr_config(meta),
        P::NrConfigStatus(v) => callback.on_nr_config_status(meta, *v),
        P::SendCdmaSms(v) => callback.on_send_cdma_sms(meta, v),
        P::FiveGStatus(v) => callback.on_five_g_status(meta, *v),
        P::NrBearerAllocation(v) => callback.on_nr_bearer_allocation(meta, *v),
        P::QtiRadioCapability(v) => callback.on_qti_radio_capability(meta, *v),
        P::QosParameters(v) => callback.on_qos_parameters(meta, v),
        P::NrDcParam(v) => callback.on_nr_dc_param(meta, *v),
        P::UpperLayerIndInfo(v) => callback.on_upper_layer_ind_info(meta, *v),
        P::FiveGConfigInfo(v) => callback.on_five_g_config_info(meta, *v),
        P::NrSignalStrength(v) => callback.on_nr_signal_strength(meta, *v),
        P::SetCarrierInfoForImsiEncryption => {
            callback.on_set_carrier_info_for_imsi_encryption(meta)
        }
        P::CallForwardStatus(v) => callback.on_call_forward_status(meta, v),
        P::FacilityLockForApp(v) => callback.on_facility_lock_for_app(meta, v),
        P::SmartDdsSwitchToggle(v) => callback.on_smart_dds_switch_toggle(meta, *v),
        P::ImeiTypeChanged(v) => callback.on_imei_type_changed(meta, v),
        P::SendUserPreferenceForDataDuringVoiceCall => {
            callback.on_send_user_preference_for_data_during_voice_call(meta)
        }
        P::DdsSwitchCapabilityChange(v) => callback.on_dds_switch_capability_change(meta, *v),
        P::DdsSwitchCriteriaChange(v) => callback.on_dds_switch_criteria_change(meta, *v),
        P::DdsSwitchRecommendation(v) => callback.on_dds_switch_recommendation(meta, *v),
        P::DataDeactivateDelayTime(v) => callback.on_data_deactivate_delay_time(meta, *v),
        P::EpdgOverCellularDataSupported(v) => {
            callback.on_epdg_over_cellular_data_supported(meta, *v)
        }
        P::SecureModeStatus(v) => callback.on_secure_mode_status(meta, *v),
        P::SecureModeStatusChange(v) => callback.on_secure_mode_status_change(meta, *v),
        P::StartNetworkScan(v) => callback.on_start_network_scan(meta, *v),
        P::StopNetworkScan(v) => callback.on_stop_network_scan(meta, *v),
        P::SetNetworkSelectionModeManual(v) => {
            callback.on_set_network_selection_mode_manual(meta, *v)
        }
        P::SetNetworkSelectionModeAutomatic(v) => {
            callback.on_set_network_selection_mode_automatic(meta, *v)
        }
        P::NetworkSelectionMode(v) => callback.on_network_selection_mode(meta, *v),
        P::NetworkScanResult(v) => callback.on_network_scan_result(meta, v),
        P::SetMsimPreference => callback.on_set_msim_preference(meta),
        P::QosParametersChanged { cid, result } => {
            callback.on_qos_parameters_changed(meta, *cid, result)
        }
        P::SetSimType => callback.on_set_sim_type(meta),
        P::SimTypeChanged(v) => callback.on_sim_type_changed(meta, v),
        P::DualDataCapabilityChanged(v) => callback.on_dual_data_capability_changed(meta, *v),
        P::SetDualDataUserPreference => callback.on_set_dual_data_user_preference(meta),
        P::DualDataRecommendation(v) => callback.on_dual_data_recommendation(meta, *v),
        P::SimPersoUnlockStatusChange(v) => callback.on_sim_perso_unlock_status_change(meta, *v),
        P::DdsSwitchConfigCapabilityChanged(v) => {
            callback.on_dds_switch_config_capability_changed(meta, *v)
        }
        P::DdsSwitchConfigCriteriaChanged(v) => {
            callback.on_dds_switch_config_criteria_changed(meta, *v)
        }
        P::DdsSwitchConfigRecommendation(v) => {
            callback.on_dds_switch_config_recommendation(meta, *v)
        }
        P::SendUserPreferenceConfigForDataDuringVoiceCall => {
            callback.on_send_user_preference_config_for_data_during_voice_call(meta)
        }
        P::SetCellularRoamingPreference => callback.on_set_cellular_roaming_preference(meta),
        P::CiwlanAvailable(v) => callback.on_ciwlan_available(meta, *v),
        P::CiwlanConfigChange(v) => callback.on_ciwlan_config_change(meta, *v),
        P::SetCiwlanModeUserPreference => callback.on_set_ciwlan_mode_user_preference(meta),
        P::NrIconChange(v) => callback.on_nr_icon_change(meta, *v),
        P::NrIconResponse(v) => callback.on_nr_icon_response(meta, *v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Client, Status, Token};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        icons: Mutex<Vec<(Option<SlotId>, NrIcon)>>,
        qos: Mutex<Vec<i32>>,
        unhandled: Mutex<Vec<EventKind>>,
    }

    impl ExtPhoneCallback for Recorder {
        fn unhandled(&self, kind: EventKind) {
            self.unhandled.lock().push(kind);
        }

        fn on_nr_icon_response(&self, meta: &EventMeta, icon: NrIcon) {
            self.icons.lock().push((meta.slot, icon));
        }

        fn on_qos_parameters_changed(
            &self,
            _meta: &EventMeta,
            cid: i32,
            _result: &QosParametersResult,
        ) {
            self.qos.lock().push(cid);
        }
    }

    #[test]
    fn test_dispatch_reaches_override() {
        let recorder = Recorder::default();
        let icon = NrIcon {
            icon_type: NrIconType::Basic,
            rx_count: 2,
        };
        let event = InboundEvent::response(
            Client::from_raw(1),
            Some(Token::from_raw(4)),
            Some(1),
            Status::Success,
            EventPayload::NrIconResponse(icon),
        );

        dispatch(&recorder, &event);

        assert_eq!(*recorder.icons.lock(), vec![(Some(1), icon)]);
        assert!(recorder.unhandled.lock().is_empty());
    }

    #[test]
    fn test_struct_variant_dispatch() {
        let recorder = Recorder::default();
        let event = InboundEvent::broadcast(
            Some(0),
            EventPayload::QosParametersChanged {
                cid: 7,
                result: QosParametersResult {
                    five_qi: 9,
                    downlink_kbps: 1000,
                    uplink_kbps: 500,
                },
            },
        );
        dispatch(&recorder, &event);
        assert_eq!(*recorder.qos.lock(), vec![7]);
    }

    #[test]
    fn test_default_methods_report_kind() {
        let recorder = Recorder::default();
        dispatch(&recorder, &InboundEvent::broadcast(Some(0), EventPayload::CiwlanAvailable(true)));
        dispatch(&recorder, &InboundEvent::broadcast(None, EventPayload::SetSimType));
        assert_eq!(
            *recorder.unhandled.lock(),
            vec![EventKind::CiwlanAvailable, EventKind::SetSimType]
        );
    }
}
