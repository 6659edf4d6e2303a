/*!
 * SAP Adapter
 * Maps provider primitives onto the engine and reports results to the SAP users
 */

use super::params::*;
use super::traits::{CschedSapProvider, SchedSapProvider};
use crate::core::SchedResult;
use crate::scheduler::MacScheduler;
use tracing::warn;

impl CschedSapProvider for MacScheduler {
    fn csched_cell_config_req(&mut self, params: &CschedCellConfigReq) -> SchedResult<()> {
        let result = self.configure_cell(params);
        if let Err(e) = &result {
            warn!(error = %e, "cell configuration rejected");
        }
        if let Some(user) = self.csched_user() {
            user.csched_cell_config_cnf(&CschedCellConfigCnf {
                result: CnfResult::of(&result),
            });
        }
        result
    }

    fn csched_ue_config_req(&mut self, params: &CschedUeConfigReq) -> SchedResult<()> {
        let result = self.configure_ue(params);
        if let Some(user) = self.csched_user() {
            user.csched_ue_config_cnf(&CschedUeConfigCnf {
                rnti: params.rnti,
                result: CnfResult::of(&result),
            });
            if let Ok(Some(update)) = &result {
                user.csched_ue_config_update_ind(update);
            }
        }
        result.map(|_| ())
    }

    fn csched_lc_config_req(&mut self, params: &CschedLcConfigReq) -> SchedResult<()> {
        let result = self.configure_lcs(params);
        if let Some(user) = self.csched_user() {
            user.csched_lc_config_cnf(&CschedLcConfigCnf {
                rnti: params.rnti,
                lcids: params.logical_channels.iter().map(|lc| lc.lcid).collect(),
                result: CnfResult::of(&result),
            });
        }
        result
    }

    fn csched_lc_release_req(&mut self, params: &CschedLcReleaseReq) -> SchedResult<()> {
        let result = self.release_lcs(params);
        if let Some(user) = self.csched_user() {
            user.csched_lc_release_cnf(&CschedLcReleaseCnf {
                rnti: params.rnti,
                lcids: params.lcids.clone(),
                result: CnfResult::of(&result),
            });
        }
        result
    }

    fn csched_ue_release_req(&mut self, params: &CschedUeReleaseReq) -> SchedResult<()> {
        let result = self.release_ue(params.rnti);
        if let Some(user) = self.csched_user() {
            user.csched_ue_release_cnf(&CschedUeReleaseCnf {
                rnti: params.rnti,
                result: CnfResult::of(&result),
            });
        }
        result
    }
}

impl SchedSapProvider for MacScheduler {
    fn sched_dl_rlc_buffer_req(&mut self, params: &SchedDlRlcBufferReq) -> SchedResult<()> {
        self.update_rlc_buffer(params);
        Ok(())
    }

    fn sched_dl_trigger_req(&mut self, params: &SchedDlTriggerReq) -> SchedResult<()> {
        let ind = self.schedule_dl(params)?;
        if let Some(user) = self.sched_user() {
            user.sched_dl_config_ind(&ind);
        }
        Ok(())
    }

    fn sched_dl_rach_info_req(&mut self, params: &SchedDlRachInfoReq) -> SchedResult<()> {
        self.add_rach(params);
        Ok(())
    }

    fn sched_dl_cqi_info_req(&mut self, params: &SchedDlCqiInfoReq) -> SchedResult<()> {
        self.update_dl_cqi(params);
        Ok(())
    }

    fn sched_ul_trigger_req(&mut self, params: &SchedUlTriggerReq) -> SchedResult<()> {
        let ind = self.schedule_ul(params)?;
        if let Some(user) = self.sched_user() {
            user.sched_ul_config_ind(&ind);
        }
        Ok(())
    }

    fn sched_ul_mac_ctrl_info_req(&mut self, params: &SchedUlMacCtrlInfoReq) -> SchedResult<()> {
        self.update_ul_mac_ctrl(params);
        Ok(())
    }

    fn sched_ul_cqi_info_req(&mut self, params: &SchedUlCqiInfoReq) -> SchedResult<()> {
        self.update_ul_cqi(params);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::core::SchedulerError;
    use crate::sap::{RecordingSapUser, SapEvent};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn scheduler_with_recorder() -> (MacScheduler, Arc<RecordingSapUser>) {
        let mut sched = MacScheduler::new(SchedulerConfig::default()).unwrap();
        let recorder = Arc::new(RecordingSapUser::new());
        sched.set_csched_sap_user(recorder.clone());
        sched.set_sched_sap_user(recorder.clone());
        (sched, recorder)
    }

    #[test]
    fn test_failed_cell_config_still_confirms() {
        let (mut sched, recorder) = scheduler_with_recorder();
        let err = sched
            .csched_cell_config_req(&CschedCellConfigReq {
                dl_bandwidth: 120,
                ul_bandwidth: 25,
                num_ccs: 1,
            })
            .unwrap_err();
        assert_eq!(err, SchedulerError::UnsupportedBandwidth(120));
        assert_eq!(
            recorder.events(),
            vec![SapEvent::CellConfigCnf(CschedCellConfigCnf {
                result: CnfResult::Failure
            })]
        );
    }

    #[test]
    fn test_reconfiguration_emits_update_indication() {
        let (mut sched, recorder) = scheduler_with_recorder();
        let mut req = CschedUeConfigReq {
            rnti: 5,
            reconfigure: false,
            transmission_mode: 0,
        };
        sched.csched_ue_config_req(&req).unwrap();
        req.reconfigure = true;
        req.transmission_mode = 2;
        sched.csched_ue_config_req(&req).unwrap();

        let events = recorder.drain();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[2],
            SapEvent::UeConfigUpdateInd(CschedUeConfigUpdateInd {
                rnti: 5,
                transmission_mode: 2
            })
        );
    }

    #[test]
    fn test_trigger_before_cell_config_fails_without_indication() {
        let (mut sched, recorder) = scheduler_with_recorder();
        let result = sched.sched_dl_trigger_req(&SchedDlTriggerReq::default());
        assert_eq!(result, Err(SchedulerError::CellNotConfigured));
        assert!(recorder.is_empty());
    }
}
