/*!
 * SAP Interfaces
 * Inbound provider traits implemented by the scheduler, outbound user traits implemented by the MAC
 */

use super::params::*;
use crate::core::SchedResult;

/// Configuration requests (CSCHED) accepted by the scheduler
pub trait CschedSapProvider {
    fn csched_cell_config_req(&mut self, params: &CschedCellConfigReq) -> SchedResult<()>;

    fn csched_ue_config_req(&mut self, params: &CschedUeConfigReq) -> SchedResult<()>;

    fn csched_lc_config_req(&mut self, params: &CschedLcConfigReq) -> SchedResult<()>;

    fn csched_lc_release_req(&mut self, params: &CschedLcReleaseReq) -> SchedResult<()>;

    fn csched_ue_release_req(&mut self, params: &CschedUeReleaseReq) -> SchedResult<()>;
}

/// Per-TTI requests (SCHED) accepted by the scheduler
///
/// Only the triggers can fail, and only before the cell is configured.
pub trait SchedSapProvider {
    fn sched_dl_rlc_buffer_req(&mut self, params: &SchedDlRlcBufferReq) -> SchedResult<()>;

    fn sched_dl_trigger_req(&mut self, params: &SchedDlTriggerReq) -> SchedResult<()>;

    fn sched_dl_rach_info_req(&mut self, params: &SchedDlRachInfoReq) -> SchedResult<()>;

    fn sched_dl_cqi_info_req(&mut self, params: &SchedDlCqiInfoReq) -> SchedResult<()>;

    fn sched_ul_trigger_req(&mut self, params: &SchedUlTriggerReq) -> SchedResult<()>;

    fn sched_ul_mac_ctrl_info_req(&mut self, params: &SchedUlMacCtrlInfoReq) -> SchedResult<()>;

    fn sched_ul_cqi_info_req(&mut self, params: &SchedUlCqiInfoReq) -> SchedResult<()>;
}

/// Confirmations and indications for configuration requests
pub trait CschedSapUser: Send + Sync {
    fn csched_cell_config_cnf(&self, params: &CschedCellConfigCnf);

    fn csched_ue_config_cnf(&self, params: &CschedUeConfigCnf);

    fn csched_lc_config_cnf(&self, params: &CschedLcConfigCnf);

    fn csched_lc_release_cnf(&self, params: &CschedLcReleaseCnf);

    fn csched_ue_release_cnf(&self, params: &CschedUeReleaseCnf);

    fn csched_ue_config_update_ind(&self, params: &CschedUeConfigUpdateInd);
}

/// Per-TTI allocation decisions
pub trait SchedSapUser: Send + Sync {
    fn sched_dl_config_ind(&self, params: &DlConfigInd);

    fn sched_ul_config_ind(&self, params: &UlConfigInd);
}
