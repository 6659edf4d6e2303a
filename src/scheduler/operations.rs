/*!
 * Scheduler Operations
 * Cell, UE and logical channel configuration plus the per-TTI feedback inputs
 */

use super::cell::{CellState, UeContext};
use super::MacScheduler;
use crate::core::limits::{MAX_C_RNTI, MAX_LCG, MAX_LC_PRIORITY, MIN_C_RNTI, MIN_LC_PRIORITY};
use crate::core::{Direction, Rnti, SchedResult, SchedulerError};
use crate::sap::{
    CschedCellConfigReq, CschedLcConfigReq, CschedLcReleaseReq, CschedUeConfigReq,
    CschedUeConfigUpdateInd, SchedDlCqiInfoReq, SchedDlRachInfoReq, SchedDlRlcBufferReq,
    SchedUlCqiInfoReq, SchedUlMacCtrlInfoReq, UlCqiSource,
};
use std::collections::BTreeMap;
use tracing::{debug, info, trace};

impl MacScheduler {
    /// Size the allocation maps for the carrier bandwidth
    pub fn configure_cell(&mut self, params: &CschedCellConfigReq) -> SchedResult<()> {
        let cell = CellState::new(params.dl_bandwidth, params.ul_bandwidth)?;
        self.dl_map.reset(cell.rbg_count);
        self.ul_map.reset(cell.ul_bandwidth as usize);
        info!(
            dl_bandwidth = cell.dl_bandwidth,
            ul_bandwidth = cell.ul_bandwidth,
            rbg_size = cell.rbg_size,
            rbgs = cell.rbg_count,
            "cell configured"
        );
        self.cell = Some(cell);
        Ok(())
    }

    /// Create a UE context, or update the transmission mode of an existing one
    ///
    /// Returns the update indication when the transmission mode changed.
    pub fn configure_ue(
        &mut self,
        params: &CschedUeConfigReq,
    ) -> SchedResult<Option<CschedUeConfigUpdateInd>> {
        let rnti = params.rnti;
        if !(MIN_C_RNTI..=MAX_C_RNTI).contains(&rnti) {
            return Err(SchedulerError::InvalidRnti(rnti));
        }
        if params.transmission_mode > 7 {
            return Err(SchedulerError::config(format!(
                "transmission mode {} of UE {} outside 0..=7",
                params.transmission_mode, rnti
            )));
        }

        if let Some(ue) = self.ues.get_mut(&rnti) {
            if ue.transmission_mode == params.transmission_mode {
                return Ok(None);
            }
            ue.transmission_mode = params.transmission_mode;
            info!(rnti, mode = params.transmission_mode, "UE transmission mode updated");
            return Ok(Some(CschedUeConfigUpdateInd {
                rnti,
                transmission_mode: params.transmission_mode,
            }));
        }

        self.ues.insert(
            rnti,
            UeContext {
                transmission_mode: params.transmission_mode,
            },
        );
        self.dl_harq.add_ue(rnti);
        self.ul_harq.add_ue(rnti);
        self.flows.add_ue(rnti);
        self.rr_dl.push_back(rnti);
        self.rr_ul.push_back(rnti);
        self.stats.set_active_ues(self.ues.len());
        info!(rnti, mode = params.transmission_mode, "UE configured");
        Ok(None)
    }

    /// Add or reconfigure logical channels of a UE
    pub fn configure_lcs(&mut self, params: &CschedLcConfigReq) -> SchedResult<()> {
        let rnti = params.rnti;
        if !self.ues.contains_key(&rnti) {
            return Err(SchedulerError::UnknownUe(rnti));
        }
        for lc in &params.logical_channels {
            if !(MIN_LC_PRIORITY..=MAX_LC_PRIORITY).contains(&lc.priority) {
                return Err(SchedulerError::config(format!(
                    "LC {} of UE {}: priority {} outside {}..={}",
                    lc.lcid, rnti, lc.priority, MIN_LC_PRIORITY, MAX_LC_PRIORITY
                )));
            }
            if lc.lcg as usize >= MAX_LCG {
                return Err(SchedulerError::config(format!(
                    "LC {} of UE {}: LCG {} outside 0..{}",
                    lc.lcid, rnti, lc.lcg, MAX_LCG
                )));
            }
        }
        for lc in &params.logical_channels {
            self.flows.configure_lc(rnti, *lc);
            debug!(rnti, lcid = lc.lcid, priority = lc.priority, "logical channel configured");
        }
        self.tokens
            .set_rate(rnti, self.flows.maximum_bitrate(rnti, Direction::Downlink));
        Ok(())
    }

    /// Remove logical channels; nothing is removed if one of them is unknown
    pub fn release_lcs(&mut self, params: &CschedLcReleaseReq) -> SchedResult<()> {
        let rnti = params.rnti;
        if !self.ues.contains_key(&rnti) {
            return Err(SchedulerError::UnknownUe(rnti));
        }
        if let Some(&lcid) = params.lcids.iter().find(|&&l| !self.flows.has_lc(rnti, l)) {
            return Err(SchedulerError::UnknownLogicalChannel { rnti, lcid });
        }
        for &lcid in &params.lcids {
            self.flows.release_lc(rnti, lcid);
        }
        self.tokens
            .set_rate(rnti, self.flows.maximum_bitrate(rnti, Direction::Downlink));
        debug!(rnti, lcids = ?params.lcids, "logical channels released");
        Ok(())
    }

    /// Destroy a UE and everything the scheduler holds for it
    ///
    /// Resources already claimed in the current allocation maps go back to
    /// the free pool.
    pub fn release_ue(&mut self, rnti: Rnti) -> SchedResult<()> {
        if self.ues.remove(&rnti).is_none() {
            return Err(SchedulerError::UnknownUe(rnti));
        }
        self.dl_harq.remove_ue(rnti);
        self.ul_harq.remove_ue(rnti);
        self.cqi.remove_ue(rnti);
        self.flows.remove_ue(rnti);
        self.tokens.remove_ue(rnti);
        self.rr_dl.retain(|&r| r != rnti);
        self.rr_ul.retain(|&r| r != rnti);
        self.rach_queue.retain(|r| r.rnti != rnti);
        self.rar_grants.retain(|g| g.rnti != rnti);
        for (_, owners) in self.ul_allocation_maps.iter_mut() {
            for owner in owners.iter_mut().filter(|o| **o == Some(rnti)) {
                *owner = None;
            }
        }
        let released = self.dl_map.release_owner(rnti) + self.ul_map.release_owner(rnti);
        self.stats.set_active_ues(self.ues.len());
        info!(rnti, released, "UE released");
        Ok(())
    }

    /// RLC queue report of one logical channel
    pub fn update_rlc_buffer(&mut self, params: &SchedDlRlcBufferReq) {
        if !self.ues.contains_key(&params.rnti) {
            debug!(rnti = params.rnti, "RLC buffer report for unknown UE ignored");
            return;
        }
        self.flows.update_rlc_buffer_req(
            params.rnti,
            params.lcid,
            params.tx_queue_size,
            params.retx_queue_size,
            params.status_pdu_size,
            params.tx_queue_hol_delay.max(params.retx_queue_hol_delay),
        );
    }

    /// Wideband and subband DL CQI reports
    pub fn update_dl_cqi(&mut self, params: &SchedDlCqiInfoReq) {
        for report in &params.cqi_list {
            if !self.ues.contains_key(&report.rnti) {
                debug!(rnti = report.rnti, "CQI report for unknown UE ignored");
                continue;
            }
            if let Some(wideband) = &report.wideband {
                self.cqi.update_wideband(report.rnti, wideband.clone());
            }
            if let Some(subband) = &report.subband {
                self.cqi.update_subband(report.rnti, subband.clone());
            }
        }
    }

    /// UL SINR measurements, converted to one CQI per UE
    ///
    /// PUSCH measurements are matched to UEs through the allocation map of
    /// the UL trigger they belong to; that map is consumed.
    pub fn update_ul_cqi(&mut self, params: &SchedUlCqiInfoReq) {
        let mut per_ue: BTreeMap<Rnti, (f64, usize)> = BTreeMap::new();
        match params.source {
            UlCqiSource::Srs { rnti } => {
                for &sinr in &params.sinr_db {
                    let acc = per_ue.entry(rnti).or_insert((0.0, 0));
                    acc.0 += sinr;
                    acc.1 += 1;
                }
            }
            UlCqiSource::Pusch => {
                let Some(pos) = self
                    .ul_allocation_maps
                    .iter()
                    .position(|(s, _)| *s == params.sfn_sf)
                else {
                    debug!(sfn_sf = %params.sfn_sf, "PUSCH CQI without allocation map ignored");
                    return;
                };
                let Some((_, owners)) = self.ul_allocation_maps.remove(pos) else {
                    return;
                };
                for (rb, &sinr) in params.sinr_db.iter().enumerate() {
                    if let Some(Some(rnti)) = owners.get(rb) {
                        let acc = per_ue.entry(*rnti).or_insert((0.0, 0));
                        acc.0 += sinr;
                        acc.1 += 1;
                    }
                }
            }
        }

        for (rnti, (sum, count)) in per_ue {
            if count == 0 || !self.ues.contains_key(&rnti) {
                continue;
            }
            let cqi = self.amc.cqi_from_sinr_db(sum / count as f64);
            self.cqi.update_uplink(rnti, cqi);
            trace!(rnti, cqi, "UL CQI updated");
        }
    }

    /// Buffer status reports (one index per LCG)
    pub fn update_ul_mac_ctrl(&mut self, params: &SchedUlMacCtrlInfoReq) {
        for bsr in &params.mac_ce_list {
            if !self.ues.contains_key(&bsr.rnti) {
                debug!(rnti = bsr.rnti, "BSR for unknown UE ignored");
                continue;
            }
            for (lcg, &level) in bsr.buffer_status.iter().enumerate().take(MAX_LCG) {
                self.flows.update_bsr(bsr.rnti, lcg as u8, level);
            }
            trace!(
                rnti = bsr.rnti,
                bytes = self.flows.ul_buffer_bytes(bsr.rnti),
                "BSR received"
            );
        }
    }

    /// Queue RACH preambles for a RAR grant at the next DL trigger
    pub fn add_rach(&mut self, params: &SchedDlRachInfoReq) {
        self.rach_queue.extend(params.rach_list.iter().copied());
    }

    /// Whether the UE may be sent new data in `direction` right now
    pub fn has_valid_cqi(&self, rnti: Rnti, direction: Direction) -> bool {
        match direction {
            Direction::Downlink => self.cqi.effective_cqi(rnti).is_some_and(|c| c > 0),
            Direction::Uplink => self.cqi.effective_uplink(rnti).is_some_and(|c| c > 0),
        }
    }
}
