/*!
 * SAP Primitives
 * Parameters of the CSCHED/SCHED requests and indications exchanged with the MAC
 */

use crate::core::{Cqi, DlDci, HarqProcessId, Lcid, RlcPdu, Rnti, SfnSf, UlDci};
use crate::flow::LogicalChannelConfig;
use crate::harq::HarqFailure;
use serde::{Deserialize, Serialize};

// =============================================================================
// CSCHED (configuration)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CschedCellConfigReq {
    /// DL bandwidth in RBs
    pub dl_bandwidth: u16,
    /// UL bandwidth in RBs
    pub ul_bandwidth: u16,
    #[serde(default = "default_num_ccs")]
    pub num_ccs: u8,
}

fn default_num_ccs() -> u8 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CschedUeConfigReq {
    pub rnti: Rnti,
    #[serde(default)]
    pub reconfigure: bool,
    /// 0..=7; modes 2 and 3 use two spatial layers
    #[serde(default)]
    pub transmission_mode: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CschedLcConfigReq {
    pub rnti: Rnti,
    #[serde(default)]
    pub reconfigure: bool,
    pub logical_channels: Vec<LogicalChannelConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CschedLcReleaseReq {
    pub rnti: Rnti,
    pub lcids: Vec<Lcid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CschedUeReleaseReq {
    pub rnti: Rnti,
}

/// Outcome carried by every CSCHED confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CnfResult {
    Success,
    Failure,
}

impl CnfResult {
    pub fn of<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CschedCellConfigCnf {
    pub result: CnfResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CschedUeConfigCnf {
    pub rnti: Rnti,
    pub result: CnfResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CschedLcConfigCnf {
    pub rnti: Rnti,
    pub lcids: Vec<Lcid>,
    pub result: CnfResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CschedLcReleaseCnf {
    pub rnti: Rnti,
    pub lcids: Vec<Lcid>,
    pub result: CnfResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CschedUeReleaseCnf {
    pub rnti: Rnti,
    pub result: CnfResult,
}

/// Sent when a reconfiguration changed the transmission mode of a UE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CschedUeConfigUpdateInd {
    pub rnti: Rnti,
    pub transmission_mode: u8,
}

// =============================================================================
// SCHED (per TTI)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedDlRlcBufferReq {
    pub rnti: Rnti,
    pub lcid: Lcid,
    pub tx_queue_size: u32,
    #[serde(default)]
    pub tx_queue_hol_delay: u16,
    #[serde(default)]
    pub retx_queue_size: u32,
    #[serde(default)]
    pub retx_queue_hol_delay: u16,
    #[serde(default)]
    pub status_pdu_size: u32,
}

/// HARQ feedback value of one TB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarqFeedback {
    Ack,
    Nack,
}

/// DL HARQ feedback, one value per layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlInfo {
    pub rnti: Rnti,
    pub harq_process_id: HarqProcessId,
    pub status: Vec<HarqFeedback>,
}

impl DlInfo {
    /// All layers decoded
    pub fn is_ack(&self) -> bool {
        self.status.iter().all(|s| *s == HarqFeedback::Ack)
    }

    /// NACK flag per layer
    pub fn nacked_layers(&self) -> Vec<bool> {
        self.status.iter().map(|s| *s == HarqFeedback::Nack).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedDlTriggerReq {
    pub sfn_sf: SfnSf,
    #[serde(default)]
    pub dl_info: Vec<DlInfo>,
}

/// Random access preamble decoded by the PHY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RachInfo {
    pub rnti: Rnti,
    /// Message 3 size the UE needs, in bytes
    pub estimated_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedDlRachInfoReq {
    pub sfn_sf: SfnSf,
    pub rach_list: Vec<RachInfo>,
}

/// CQI report of one UE; either part may be absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlCqiReport {
    pub rnti: Rnti,
    /// One CQI per layer
    #[serde(default)]
    pub wideband: Option<Vec<Cqi>>,
    /// One CQI per RBG
    #[serde(default)]
    pub subband: Option<Vec<Cqi>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedDlCqiInfoReq {
    pub sfn_sf: SfnSf,
    pub cqi_list: Vec<DlCqiReport>,
}

/// UL HARQ feedback (decoding result of a PUSCH TB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UlInfo {
    pub rnti: Rnti,
    pub harq_process_id: HarqProcessId,
    pub status: HarqFeedback,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedUlTriggerReq {
    pub sfn_sf: SfnSf,
    #[serde(default)]
    pub ul_info: Vec<UlInfo>,
}

/// Long BSR: one buffer size index per LCG
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacCeBsr {
    pub rnti: Rnti,
    pub buffer_status: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedUlMacCtrlInfoReq {
    pub sfn_sf: SfnSf,
    pub mac_ce_list: Vec<MacCeBsr>,
}

/// Origin of an UL SINR measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UlCqiSource {
    /// Per-RB SINR of the PUSCH transmissions granted at `sfn_sf`
    Pusch,
    /// Sounding reference signal of one UE
    Srs { rnti: Rnti },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedUlCqiInfoReq {
    /// Subframe of the UL trigger the measurement belongs to
    pub sfn_sf: SfnSf,
    pub source: UlCqiSource,
    /// SINR in dB, one value per RB
    pub sinr_db: Vec<f64>,
}

// =============================================================================
// INDICATIONS
// =============================================================================

/// One DL grant with the RLC PDUs it carries (per logical channel, per layer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDataListElement {
    pub rnti: Rnti,
    pub dci: DlDci,
    pub rlc_pdus: Vec<Vec<RlcPdu>>,
    pub retransmission: bool,
}

/// Random access response carrying the message 3 UL grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRarListElement {
    pub rnti: Rnti,
    pub grant: UlDci,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlConfigInd {
    pub sfn_sf: SfnSf,
    pub build_data_list: Vec<BuildDataListElement>,
    pub build_rar_list: Vec<BuildRarListElement>,
    /// TBs dropped by HARQ this TTI
    pub harq_failures: Vec<HarqFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UlConfigInd {
    pub sfn_sf: SfnSf,
    pub dci_list: Vec<UlDci>,
    pub harq_failures: Vec<HarqFailure>,
}
