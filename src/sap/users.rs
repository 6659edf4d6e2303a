/*!
 * SAP Users
 * Ready-made outbound endpoints: a flume channel and an in-memory recorder
 */

use super::params::*;
use super::traits::{CschedSapUser, SchedSapUser};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Every outbound primitive as one value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "primitive", content = "params", rename_all = "snake_case")]
pub enum SapEvent {
    CellConfigCnf(CschedCellConfigCnf),
    UeConfigCnf(CschedUeConfigCnf),
    LcConfigCnf(CschedLcConfigCnf),
    LcReleaseCnf(CschedLcReleaseCnf),
    UeReleaseCnf(CschedUeReleaseCnf),
    UeConfigUpdateInd(CschedUeConfigUpdateInd),
    DlConfigInd(DlConfigInd),
    UlConfigInd(UlConfigInd),
}

/// Forwards every primitive into an unbounded flume channel
#[derive(Debug, Clone)]
pub struct ChannelSapUser {
    tx: flume::Sender<SapEvent>,
}

impl ChannelSapUser {
    /// User plus the receiving end for the MAC side
    pub fn new() -> (Self, flume::Receiver<SapEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }

    fn send(&self, event: SapEvent) {
        if self.tx.send(event).is_err() {
            debug!("SAP receiver dropped, indication discarded");
        }
    }
}

impl CschedSapUser for ChannelSapUser {
    fn csched_cell_config_cnf(&self, params: &CschedCellConfigCnf) {
        self.send(SapEvent::CellConfigCnf(*params));
    }

    fn csched_ue_config_cnf(&self, params: &CschedUeConfigCnf) {
        self.send(SapEvent::UeConfigCnf(*params));
    }

    fn csched_lc_config_cnf(&self, params: &CschedLcConfigCnf) {
        self.send(SapEvent::LcConfigCnf(params.clone()));
    }

    fn csched_lc_release_cnf(&self, params: &CschedLcReleaseCnf) {
        self.send(SapEvent::LcReleaseCnf(params.clone()));
    }

    fn csched_ue_release_cnf(&self, params: &CschedUeReleaseCnf) {
        self.send(SapEvent::UeReleaseCnf(*params));
    }

    fn csched_ue_config_update_ind(&self, params: &CschedUeConfigUpdateInd) {
        self.send(SapEvent::UeConfigUpdateInd(*params));
    }
}

impl SchedSapUser for ChannelSapUser {
    fn sched_dl_config_ind(&self, params: &DlConfigInd) {
        self.send(SapEvent::DlConfigInd(params.clone()));
    }

    fn sched_ul_config_ind(&self, params: &UlConfigInd) {
        self.send(SapEvent::UlConfigInd(params.clone()));
    }
}

/// Keeps every primitive in arrival order
#[derive(Debug, Default)]
pub struct RecordingSapUser {
    events: Mutex<Vec<SapEvent>>,
}

impl RecordingSapUser {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: SapEvent) {
        self.events.lock().push(event);
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<SapEvent> {
        self.events.lock().clone()
    }

    /// Take the recorded events, leaving the log empty
    pub fn drain(&self) -> Vec<SapEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn dl_indications(&self) -> Vec<DlConfigInd> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SapEvent::DlConfigInd(ind) => Some(ind.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn ul_indications(&self) -> Vec<UlConfigInd> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SapEvent::UlConfigInd(ind) => Some(ind.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl CschedSapUser for RecordingSapUser {
    fn csched_cell_config_cnf(&self, params: &CschedCellConfigCnf) {
        self.push(SapEvent::CellConfigCnf(*params));
    }

    fn csched_ue_config_cnf(&self, params: &CschedUeConfigCnf) {
        self.push(SapEvent::UeConfigCnf(*params));
    }

    fn csched_lc_config_cnf(&self, params: &CschedLcConfigCnf) {
        self.push(SapEvent::LcConfigCnf(params.clone()));
    }

    fn csched_lc_release_cnf(&self, params: &CschedLcReleaseCnf) {
        self.push(SapEvent::LcReleaseCnf(params.clone()));
    }

    fn csched_ue_release_cnf(&self, params: &CschedUeReleaseCnf) {
        self.push(SapEvent::UeReleaseCnf(*params));
    }

    fn csched_ue_config_update_ind(&self, params: &CschedUeConfigUpdateInd) {
        self.push(SapEvent::UeConfigUpdateInd(*params));
    }
}

impl SchedSapUser for RecordingSapUser {
    fn sched_dl_config_ind(&self, params: &DlConfigInd) {
        self.push(SapEvent::DlConfigInd(params.clone()));
    }

    fn sched_ul_config_ind(&self, params: &UlConfigInd) {
        self.push(SapEvent::UlConfigInd(params.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SfnSf;

    #[test]
    fn test_channel_user_forwards_in_order() {
        let (user, rx) = ChannelSapUser::new();
        user.csched_cell_config_cnf(&CschedCellConfigCnf {
            result: CnfResult::Success,
        });
        user.sched_ul_config_ind(&UlConfigInd {
            sfn_sf: SfnSf::new(1, 2),
            ..Default::default()
        });
        assert!(matches!(rx.try_recv(), Ok(SapEvent::CellConfigCnf(_))));
        assert!(matches!(rx.try_recv(), Ok(SapEvent::UlConfigInd(_))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_receiver_drop_is_silent() {
        let (user, rx) = ChannelSapUser::new();
        drop(rx);
        user.sched_dl_config_ind(&DlConfigInd::default());
    }

    #[test]
    fn test_recorder_filters_indications() {
        let recorder = RecordingSapUser::new();
        recorder.sched_dl_config_ind(&DlConfigInd::default());
        recorder.csched_ue_release_cnf(&CschedUeReleaseCnf {
            rnti: 1,
            result: CnfResult::Success,
        });
        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.dl_indications().len(), 1);
        assert!(recorder.ul_indications().is_empty());
        assert_eq!(recorder.drain().len(), 2);
        assert!(recorder.is_empty());
    }
}
