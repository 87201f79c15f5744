//! Every operation the service offers, behind one connection guard.
//!
//! Outcomes follow one policy:
//!
//! | operation shape | not connected | remote call failed |
//! |---|---|---|
//! | token request | `Ok(None)` | `Err(TransportFailure)` |
//! | read with a natural default | default | default |
//! | structured read | `Ok(None)` | `Err(TransportFailure)` |
//! | verdict (`Result<bool>`) | `Ok(false)` | `Err(TransportFailure)` |
//! | command | `Ok(())` | `Err(TransportFailure)` |
//!
//! Each degradation is logged at `warn` with the operation name. A request
//! issued with a [`Client`] that is not registered on the current
//! connection is treated as not connected.

use std::sync::Arc;

use crate::callback::ClientRegistry;
use crate::connection::ConnectionManager;
use crate::error::{ExtPhoneError, Result};
use crate::token::TokenTable;
use crate::transport::{DirectCall, DirectReply, Request};
use crate::types::data::{
    AccessMode, CellularRoamingPreference, CiwlanConfig, ImsiEncryptionInfo, MsimPreference,
    NetworkScanRequest, NrConfig, QtiImeiInfo, QtiPersoUnlockStatus, QtiSetNetworkSelectionMode,
    QtiSimType,
};
use crate::types::{Client, Feature, SlotId, Token};

/// Returned by integer reads when the service cannot be asked.
pub const INVALID: i32 = -1;

/// Issues requests and direct calls on behalf of registered clients.
pub struct RequestDispatcher {
    connection: Arc<ConnectionManager>,
    registry: Arc<ClientRegistry>,
    tokens: Arc<TokenTable>,
}

impl RequestDispatcher {
    pub(crate) fn new(
        connection: Arc<ConnectionManager>,
        registry: Arc<ClientRegistry>,
        tokens: Arc<TokenTable>,
    ) -> Self {
        Self {
            connection,
            registry,
            tokens,
        }
    }

    async fn submit(
        &self,
        op: &'static str,
        client: Client,
        request: Request,
    ) -> Result<Option<Token>> {
        let Some(live) = self.connection.live() else {
            tracing::warn!(op, "service not connected");
            return Ok(None);
        };
        if !self.registry.contains(client) {
            tracing::warn!(op, %client, "client not registered on this connection");
            return Ok(None);
        }

        let token = match live.service.request(client, request).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(op, %client, error = %e, "request failed");
                return Err(e.into_transport_failure());
            }
        };

        let tracked = self
            .connection
            .if_current(live.epoch, || self.tokens.track(token, client));
        if tracked.is_none() {
            tracing::debug!(op, %token, "connection dropped before the token was recorded");
            return Ok(None);
        }
        tracing::debug!(op, %client, %token, "request accepted");
        Ok(Some(token))
    }

    async fn direct(&self, op: &'static str, call: DirectCall) -> Result<Option<DirectReply>> {
        let Some(live) = self.connection.live() else {
            tracing::warn!(op, "service not connected");
            return Ok(None);
        };
        match live.service.call(call).await {
            Ok(reply) => Ok(Some(reply)),
            Err(e) => {
                tracing::warn!(op, error = %e, "call failed");
                Err(e.into_transport_failure())
            }
        }
    }

    async fn read_or<T>(
        &self,
        op: &'static str,
        call: DirectCall,
        default: T,
        extract: impl FnOnce(DirectReply) -> Result<T>,
    ) -> T {
        // both degradations were already logged by `read`
        self.read(op, call, extract)
            .await
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    async fn read<T>(
        &self,
        op: &'static str,
        call: DirectCall,
        extract: impl FnOnce(DirectReply) -> Result<T>,
    ) -> Result<Option<T>> {
        match self.direct(op, call).await? {
            Some(reply) => match extract(reply) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    tracing::warn!(op, error = %e, "unexpected reply");
                    Err(e.into_transport_failure())
                }
            },
            None => Ok(None),
        }
    }

    async fn verdict(&self, op: &'static str, call: DirectCall) -> Result<bool> {
        Ok(self.read(op, call, DirectReply::into_bool).await?.unwrap_or(false))
    }

    async fn command(&self, op: &'static str, call: DirectCall) -> Result<()> {
        self.read(op, call, DirectReply::into_unit).await.map(|_| ())
    }

    // Feature gate and vendor properties

    pub async fn is_feature_supported(&self, feature: Feature) -> bool {
        self.read_or(
            "is_feature_supported",
            DirectCall::IsFeatureSupported(feature),
            false,
            DirectReply::into_bool,
        )
        .await
    }

    /// Integer vendor property; [`INVALID`] when the service cannot be asked.
    pub async fn get_property_value_int(&self, name: &str, default: i32) -> i32 {
        let call = DirectCall::GetPropertyValueInt {
            name: name.to_string(),
            default,
        };
        self.read_or("get_property_value_int", call, INVALID, DirectReply::into_int)
            .await
    }

    pub async fn get_property_value_bool(&self, name: &str, default: bool) -> bool {
        let call = DirectCall::GetPropertyValueBool {
            name: name.to_string(),
            default,
        };
        self.read_or("get_property_value_bool", call, default, DirectReply::into_bool)
            .await
    }

    pub async fn get_property_value_string(&self, name: &str, default: &str) -> String {
        let call = DirectCall::GetPropertyValueString {
            name: name.to_string(),
            default: default.to_string(),
        };
        self.read_or(
            "get_property_value_string",
            call,
            default.to_string(),
            DirectReply::into_string,
        )
        .await
    }

    // NR / 5G

    pub async fn enable_endc(
        &self,
        slot: SlotId,
        enable: bool,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit("enable_endc", client, Request::EnableEndc { slot, enable }).await
    }

    pub async fn query_nr_icon_type(&self, slot: SlotId, client: Client) -> Result<Option<Token>> {
        self.submit("query_nr_icon_type", client, Request::QueryNrIconType { slot }).await
    }

    pub async fn query_endc_status(&self, slot: SlotId, client: Client) -> Result<Option<Token>> {
        self.submit("query_endc_status", client, Request::QueryEndcStatus { slot }).await
    }

    pub async fn set_nr_config(
        &self,
        slot: SlotId,
        config: NrConfig,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit("set_nr_config", client, Request::SetNrConfig { slot, config }).await
    }

    pub async fn query_nr_config(&self, slot: SlotId, client: Client) -> Result<Option<Token>> {
        self.submit("query_nr_config", client, Request::QueryNrConfig { slot }).await
    }

    pub async fn enable_5g(&self, slot: SlotId, client: Client) -> Result<Option<Token>> {
        self.submit("enable_5g", client, Request::Enable5g { slot }).await
    }

    pub async fn disable_5g(&self, slot: SlotId, client: Client) -> Result<Option<Token>> {
        self.submit("disable_5g", client, Request::Disable5g { slot }).await
    }

    pub async fn enable_5g_only(&self, slot: SlotId, client: Client) -> Result<Option<Token>> {
        self.submit("enable_5g_only", client, Request::Enable5gOnly { slot }).await
    }

    pub async fn query_5g_status(&self, slot: SlotId, client: Client) -> Result<Option<Token>> {
        self.submit("query_5g_status", client, Request::Query5gStatus { slot }).await
    }

    pub async fn query_nr_bearer_allocation(
        &self,
        slot: SlotId,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit("query_nr_bearer_allocation", client, Request::QueryNrBearerAllocation { slot })
            .await
    }

    pub async fn query_nr_dc_param(&self, slot: SlotId, client: Client) -> Result<Option<Token>> {
        self.submit("query_nr_dc_param", client, Request::QueryNrDcParam { slot }).await
    }

    pub async fn query_nr_signal_strength(
        &self,
        slot: SlotId,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit("query_nr_signal_strength", client, Request::QueryNrSignalStrength { slot })
            .await
    }

    pub async fn query_upper_layer_ind_info(
        &self,
        slot: SlotId,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit("query_upper_layer_ind_info", client, Request::QueryUpperLayerIndInfo { slot })
            .await
    }

    pub async fn query_5g_config_info(
        &self,
        slot: SlotId,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit("query_5g_config_info", client, Request::Query5gConfigInfo { slot }).await
    }

    pub async fn query_nr_icon(&self, slot: SlotId, client: Client) -> Result<Option<Token>> {
        self.submit("query_nr_icon", client, Request::QueryNrIcon { slot }).await
    }

    // Network selection

    pub async fn set_network_selection_mode_automatic(
        &self,
        slot: SlotId,
        access_mode: AccessMode,
        client: Client,
    ) -> Result<Option<Token>> {
        let request = Request::SetNetworkSelectionModeAutomatic { slot, access_mode };
        self.submit("set_network_selection_mode_automatic", client, request).await
    }

    pub async fn set_network_selection_mode_manual(
        &self,
        slot: SlotId,
        mode: QtiSetNetworkSelectionMode,
        client: Client,
    ) -> Result<Option<Token>> {
        if mode.operator_numeric.is_empty() {
            return Err(ExtPhoneError::InvalidArgument(
                "manual selection needs an operator".into(),
            ));
        }
        let request = Request::SetNetworkSelectionModeManual { slot, mode };
        self.submit("set_network_selection_mode_manual", client, request).await
    }

    pub async fn get_network_selection_mode(
        &self,
        slot: SlotId,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit("get_network_selection_mode", client, Request::GetNetworkSelectionMode { slot })
            .await
    }

    /// Results arrive as `NetworkScanResult` events carrying the returned token.
    pub async fn start_network_scan(
        &self,
        slot: SlotId,
        request: NetworkScanRequest,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit("start_network_scan", client, Request::StartNetworkScan { slot, request })
            .await
    }

    pub async fn stop_network_scan(&self, slot: SlotId, client: Client) -> Result<Option<Token>> {
        self.submit("stop_network_scan", client, Request::StopNetworkScan { slot }).await
    }

    /// `true` if the scan request reached the modem.
    pub async fn perform_incremental_scan(&self, slot: SlotId) -> bool {
        self.read_or(
            "perform_incremental_scan",
            DirectCall::PerformIncrementalScan(slot),
            false,
            DirectReply::into_bool,
        )
        .await
    }

    pub async fn abort_incremental_scan(&self, slot: SlotId) -> bool {
        self.read_or(
            "abort_incremental_scan",
            DirectCall::AbortIncrementalScan(slot),
            false,
            DirectReply::into_bool,
        )
        .await
    }

    // Messaging and supplementary services

    pub async fn send_cdma_sms(
        &self,
        slot: SlotId,
        pdu: Vec<u8>,
        expect_more: bool,
        client: Client,
    ) -> Result<Option<Token>> {
        if pdu.is_empty() {
            return Err(ExtPhoneError::InvalidArgument("empty SMS PDU".into()));
        }
        let request = Request::SendCdmaSms {
            slot,
            pdu,
            expect_more,
        };
        self.submit("send_cdma_sms", client, request).await
    }

    pub async fn query_call_forward_status(
        &self,
        slot: SlotId,
        reason: i32,
        service_class: i32,
        number: &str,
        expect_more: bool,
        client: Client,
    ) -> Result<Option<Token>> {
        let request = Request::QueryCallForwardStatus {
            slot,
            reason,
            service_class,
            number: number.to_string(),
            expect_more,
        };
        self.submit("query_call_forward_status", client, request).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn get_facility_lock_for_app(
        &self,
        slot: SlotId,
        facility: &str,
        password: &str,
        service_class: i32,
        app_id: &str,
        expect_more: bool,
        client: Client,
    ) -> Result<Option<Token>> {
        let request = Request::GetFacilityLockForApp {
            slot,
            facility: facility.to_string(),
            password: password.to_string(),
            service_class,
            app_id: app_id.to_string(),
            expect_more,
        };
        self.submit("get_facility_lock_for_app", client, request).await
    }

    pub async fn is_sms_prompt_enabled(&self) -> bool {
        self.read_or(
            "is_sms_prompt_enabled",
            DirectCall::IsSmsPromptEnabled,
            false,
            DirectReply::into_bool,
        )
        .await
    }

    pub async fn set_sms_prompt_enabled(&self, enabled: bool) -> Result<()> {
        self.command("set_sms_prompt_enabled", DirectCall::SetSmsPromptEnabled(enabled))
            .await
    }

    // Radio and SIM

    pub async fn get_qti_radio_capability(
        &self,
        slot: SlotId,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit("get_qti_radio_capability", client, Request::GetQtiRadioCapability { slot })
            .await
    }

    pub async fn set_carrier_info_for_imsi_encryption(
        &self,
        slot: SlotId,
        info: ImsiEncryptionInfo,
        client: Client,
    ) -> Result<Option<Token>> {
        let request = Request::SetCarrierInfoForImsiEncryption { slot, info };
        self.submit("set_carrier_info_for_imsi_encryption", client, request).await
    }

    /// The outcome arrives later; this only reports whether the request was sent.
    pub async fn supply_icc_depersonalization(
        &self,
        slot: SlotId,
        netpin: &str,
        perso_type: &str,
    ) -> Result<()> {
        let call = DirectCall::SupplyIccDepersonalization {
            slot,
            netpin: netpin.to_string(),
            perso_type: perso_type.to_string(),
        };
        self.command("supply_icc_depersonalization", call).await
    }

    pub async fn get_sim_perso_unlock_status(
        &self,
        slot: SlotId,
    ) -> Result<Option<QtiPersoUnlockStatus>> {
        let status = self
            .read(
                "get_sim_perso_unlock_status",
                DirectCall::GetSimPersoUnlockStatus(slot),
                DirectReply::into_perso_unlock_status,
            )
            .await?;
        Ok(status.flatten())
    }

    pub async fn set_msim_preference(
        &self,
        preference: MsimPreference,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit("set_msim_preference", client, Request::SetMsimPreference { preference })
            .await
    }

    pub async fn get_supported_sim_types(&self) -> Result<Option<Vec<QtiSimType>>> {
        self.read(
            "get_supported_sim_types",
            DirectCall::GetSupportedSimTypes,
            DirectReply::into_sim_types,
        )
        .await
    }

    pub async fn get_current_sim_type(&self) -> Result<Option<Vec<QtiSimType>>> {
        self.read(
            "get_current_sim_type",
            DirectCall::GetCurrentSimType,
            DirectReply::into_sim_types,
        )
        .await
    }

    /// One entry per slot.
    pub async fn set_sim_type(
        &self,
        sim_types: Vec<QtiSimType>,
        client: Client,
    ) -> Result<Option<Token>> {
        if sim_types.is_empty() {
            return Err(ExtPhoneError::InvalidArgument("no SIM types given".into()));
        }
        self.submit("set_sim_type", client, Request::SetSimType { sim_types }).await
    }

    pub async fn get_imei_info(&self) -> Result<Option<Vec<QtiImeiInfo>>> {
        self.read("get_imei_info", DirectCall::GetImeiInfo, DirectReply::into_imei_info)
            .await
    }

    pub async fn check_sim_pin_lock_status(&self, sub_id: i32) -> Result<bool> {
        self.verdict("check_sim_pin_lock_status", DirectCall::CheckSimPinLockStatus { sub_id })
            .await
    }

    pub async fn toggle_sim_pin_lock(&self, sub_id: i32, enabled: bool, pin: &str) -> Result<bool> {
        let call = DirectCall::ToggleSimPinLock {
            sub_id,
            enabled,
            pin: pin.to_string(),
        };
        self.verdict("toggle_sim_pin_lock", call).await
    }

    pub async fn verify_sim_pin(&self, sub_id: i32, pin: &str) -> Result<bool> {
        let call = DirectCall::VerifySimPin {
            sub_id,
            pin: pin.to_string(),
        };
        self.verdict("verify_sim_pin", call).await
    }

    pub async fn verify_sim_puk_change_pin(
        &self,
        sub_id: i32,
        puk: &str,
        new_pin: &str,
    ) -> Result<bool> {
        let call = DirectCall::VerifySimPukChangePin {
            sub_id,
            puk: puk.to_string(),
            new_pin: new_pin.to_string(),
        };
        self.verdict("verify_sim_puk_change_pin", call).await
    }

    pub async fn set_airplane_mode(&self, on: bool) -> Result<bool> {
        self.verdict("set_airplane_mode", DirectCall::SetAirplaneMode(on)).await
    }

    pub async fn get_airplane_mode(&self) -> Result<bool> {
        self.verdict("get_airplane_mode", DirectCall::GetAirplaneMode).await
    }

    // Primary card

    pub async fn is_primary_carrier_slot_id(&self, slot: SlotId) -> bool {
        self.read_or(
            "is_primary_carrier_slot_id",
            DirectCall::IsPrimaryCarrierSlotId(slot),
            false,
            DirectReply::into_bool,
        )
        .await
    }

    pub async fn get_current_primary_card_slot_id(&self) -> i32 {
        self.read_or(
            "get_current_primary_card_slot_id",
            DirectCall::GetCurrentPrimaryCardSlotId,
            INVALID,
            DirectReply::into_int,
        )
        .await
    }

    /// Slot holding the primary carrier SIM, or [`INVALID`] if none does.
    pub async fn get_primary_carrier_slot_id(&self) -> i32 {
        self.read_or(
            "get_primary_carrier_slot_id",
            DirectCall::GetPrimaryCarrierSlotId,
            INVALID,
            DirectReply::into_int,
        )
        .await
    }

    pub async fn set_primary_card_on_slot(&self, slot: SlotId) -> Result<()> {
        self.command("set_primary_card_on_slot", DirectCall::SetPrimaryCardOnSlot(slot))
            .await
    }

    // Data and DDS

    pub async fn is_smart_dds_switch_feature_available(&self) -> bool {
        self.read_or(
            "is_smart_dds_switch_feature_available",
            DirectCall::IsSmartDdsSwitchFeatureAvailable,
            false,
            DirectReply::into_bool,
        )
        .await
    }

    pub async fn set_smart_dds_switch_toggle(
        &self,
        enabled: bool,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit(
            "set_smart_dds_switch_toggle",
            client,
            Request::SetSmartDdsSwitchToggle { enabled },
        )
        .await
    }

    pub async fn get_dds_switch_capability(
        &self,
        slot: SlotId,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit("get_dds_switch_capability", client, Request::GetDdsSwitchCapability { slot })
            .await
    }

    pub async fn send_user_preference_for_data_during_voice_call(
        &self,
        slot: SlotId,
        allowed: bool,
        client: Client,
    ) -> Result<Option<Token>> {
        let request = Request::SendUserPreferenceForDataDuringVoiceCall { slot, allowed };
        self.submit("send_user_preference_for_data_during_voice_call", client, request)
            .await
    }

    pub async fn get_dds_switch_config_capability(&self, client: Client) -> Result<Option<Token>> {
        self.submit(
            "get_dds_switch_config_capability",
            client,
            Request::GetDdsSwitchConfigCapability,
        )
        .await
    }

    /// `allowed_on_slot[i]` is the preference for slot `i`.
    pub async fn send_user_preference_config_for_data_during_voice_call(
        &self,
        allowed_on_slot: Vec<bool>,
        client: Client,
    ) -> Result<Option<Token>> {
        if allowed_on_slot.is_empty() {
            return Err(ExtPhoneError::InvalidArgument("no slots given".into()));
        }
        let request = Request::SendUserPreferenceConfigForDataDuringVoiceCall { allowed_on_slot };
        self.submit("send_user_preference_config_for_data_during_voice_call", client, request)
            .await
    }

    pub async fn get_qos_parameters(
        &self,
        slot: SlotId,
        cid: i32,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit("get_qos_parameters", client, Request::GetQosParameters { slot, cid })
            .await
    }

    pub async fn get_secure_mode_status(&self, client: Client) -> Result<Option<Token>> {
        self.submit("get_secure_mode_status", client, Request::GetSecureModeStatus).await
    }

    pub async fn get_dual_data_capability(&self) -> bool {
        self.read_or(
            "get_dual_data_capability",
            DirectCall::GetDualDataCapability,
            false,
            DirectReply::into_bool,
        )
        .await
    }

    pub async fn set_dual_data_user_preference(
        &self,
        enable: bool,
        client: Client,
    ) -> Result<Option<Token>> {
        self.submit(
            "set_dual_data_user_preference",
            client,
            Request::SetDualDataUserPreference { enable },
        )
        .await
    }

    // C_IWLAN and roaming

    pub async fn is_epdg_over_cellular_data_supported(&self, slot: SlotId) -> bool {
        self.read_or(
            "is_epdg_over_cellular_data_supported",
            DirectCall::IsEpdgOverCellularDataSupported(slot),
            false,
            DirectReply::into_bool,
        )
        .await
    }

    pub async fn get_ciwlan_config(&self, slot: SlotId) -> Result<Option<CiwlanConfig>> {
        let config = self
            .read(
                "get_ciwlan_config",
                DirectCall::GetCiwlanConfig(slot),
                DirectReply::into_ciwlan_config,
            )
            .await?;
        Ok(config.flatten())
    }

    pub async fn is_ciwlan_available(&self, slot: SlotId) -> bool {
        self.read_or(
            "is_ciwlan_available",
            DirectCall::IsCiwlanAvailable(slot),
            false,
            DirectReply::into_bool,
        )
        .await
    }

    pub async fn set_ciwlan_mode_user_preference(
        &self,
        slot: SlotId,
        config: CiwlanConfig,
        client: Client,
    ) -> Result<Option<Token>> {
        let request = Request::SetCiwlanModeUserPreference { slot, config };
        self.submit("set_ciwlan_mode_user_preference", client, request).await
    }

    pub async fn get_ciwlan_mode_user_preference(
        &self,
        slot: SlotId,
    ) -> Result<Option<CiwlanConfig>> {
        let config = self
            .read(
                "get_ciwlan_mode_user_preference",
                DirectCall::GetCiwlanModeUserPreference(slot),
                DirectReply::into_ciwlan_config,
            )
            .await?;
        Ok(config.flatten())
    }

    pub async fn get_cellular_roaming_preference(
        &self,
        slot: SlotId,
    ) -> Result<Option<CellularRoamingPreference>> {
        let preference = self
            .read(
                "get_cellular_roaming_preference",
                DirectCall::GetCellularRoamingPreference(slot),
                DirectReply::into_roaming_preference,
            )
            .await?;
        Ok(preference.flatten())
    }

    pub async fn set_cellular_roaming_preference(
        &self,
        slot: SlotId,
        preference: CellularRoamingPreference,
        client: Client,
    ) -> Result<Option<Token>> {
        let request = Request::SetCellularRoamingPreference { slot, preference };
        self.submit("set_cellular_roaming_preference", client, request).await
    }
}
