/*!
 * Uplink Scheduling
 * Contiguous RB grants: RAR first, then HARQ retransmissions, then BSR-driven new data
 */

use super::cell::CellState;
use super::entry::{rank, Candidate};
use super::policy::MetricInput;
use super::MacScheduler;
use crate::config::ShareMode;
use crate::core::{Direction, HarqProcessId, Rnti, SchedResult, SchedulerError, UlDci};
use crate::harq::{HarqFailure, NackOutcome};
use crate::monitoring::tti_span;
use crate::rbg::RbgState;
use crate::sap::{HarqFeedback, SchedUlTriggerReq, UlConfigInd, UlInfo};
use std::collections::BTreeSet;
use tracing::{debug, trace};

impl MacScheduler {
    /// Run one UL scheduling pass
    pub fn schedule_ul(&mut self, params: &SchedUlTriggerReq) -> SchedResult<UlConfigInd> {
        let cell = self.cell.ok_or(SchedulerError::CellNotConfigured)?;
        let span = tti_span(&self.run_id, Direction::Uplink, params.sfn_sf);
        let _guard = span.enter();
        self.stats.add_ul_ttis(1);

        let mut harq_failures = self.ul_harq.tick();
        harq_failures.extend(self.apply_ul_feedback(&params.ul_info));

        let ul_rbs = cell.ul_bandwidth as usize;
        self.ul_map.reset(ul_rbs);
        for (rb, reserved) in self.ffr.ul_reserved_rbs(ul_rbs).into_iter().enumerate() {
            if reserved {
                self.ul_map.mark_reserved(rb);
            }
        }

        // Message 3 resources promised in the last RAR
        for grant in std::mem::take(&mut self.rar_grants) {
            let start = grant.rb_start as usize;
            for rb in start..start + grant.rb_len as usize {
                self.ul_map.try_claim(rb, grant.rnti);
            }
        }

        let mut served = BTreeSet::new();
        let mut dci_list = Vec::new();
        let mut deferred = 0u64;
        for (rnti, id) in self.ul_harq.pending_retransmissions() {
            if served.contains(&rnti) {
                continue;
            }
            match self.retransmit_ul(rnti, id) {
                Some(dci) => {
                    served.insert(rnti);
                    dci_list.push(dci);
                }
                None => deferred += 1,
            }
        }
        self.stats.add_ul_retx_grants(dci_list.len() as u64);
        self.stats.add_retx_deferred(deferred);

        self.cqi.tick(Direction::Uplink);
        let mut candidates = self.ul_candidates(&served);
        rank(&mut candidates);

        let share_mode = self.metric.kind().share_mode();
        let total = candidates.len();
        let mut first_served = None;
        let mut new_grants = 0u64;
        for (k, candidate) in candidates.iter().enumerate() {
            let free = self.ul_map.free_count();
            if free == 0 {
                break;
            }
            let share = match share_mode {
                ShareMode::Equal => free.div_ceil(total - k),
                ShareMode::Greedy => free,
            };
            if let Some(dci) = self.grant_ul(&cell, candidate, share) {
                first_served.get_or_insert(candidate.rnti);
                dci_list.push(dci);
                new_grants += 1;
            }
        }
        self.stats.add_ul_new_grants(new_grants);
        self.stats.add_harq_failures(harq_failures.len() as u64);

        let owners = self
            .ul_map
            .entries()
            .iter()
            .map(|state| match state {
                RbgState::Claimed(rnti) => Some(*rnti),
                _ => None,
            })
            .collect();
        self.store_ul_allocation_map(params.sfn_sf, owners);

        self.flows.end_tti(Direction::Uplink);
        self.rotate(Direction::Uplink, first_served);

        span.record("granted", dci_list.len());
        span.record("deferred", deferred);

        Ok(UlConfigInd {
            sfn_sf: params.sfn_sf,
            dci_list,
            harq_failures,
        })
    }

    fn apply_ul_feedback(&mut self, ul_info: &[UlInfo]) -> Vec<HarqFailure> {
        let mut failures = Vec::new();
        for info in ul_info {
            match info.status {
                HarqFeedback::Ack => {
                    if !self.ul_harq.mark_acknowledged(info.rnti, info.harq_process_id) {
                        self.stats.add_stale_feedback(1);
                    }
                }
                HarqFeedback::Nack => match self.ul_harq.mark_nack(info.rnti, info.harq_process_id) {
                    NackOutcome::Retransmit => {}
                    NackOutcome::Dropped(failure) => failures.push(failure),
                    NackOutcome::Stale => {
                        trace!(rnti = info.rnti, process = info.harq_process_id, "stale UL NACK");
                        self.stats.add_stale_feedback(1);
                    }
                },
            }
        }
        failures
    }

    /// Resend a NACKed UL TB on the same RBs, or the next contiguous run of the same length
    fn retransmit_ul(&mut self, rnti: Rnti, id: HarqProcessId) -> Option<UlDci> {
        let mut dci = self.ul_harq.process(rnti, id)?.dci.clone()?;
        let len = dci.rb_len as usize;
        let n = self.ul_map.len();
        if len == 0 || len > n {
            return None;
        }

        let fits = |start: usize| {
            start + len <= n
                && (start..start + len).all(|rb| {
                    self.ul_map.is_free(rb) && self.ffr.is_ul_rb_available_for_ue(rb, rnti)
                })
        };
        let previous = dci.rb_start as usize;
        let start = if fits(previous) {
            previous
        } else {
            let Some(start) = (1..n).map(|k| (previous + k) % n).find(|&s| fits(s)) else {
                debug!(rnti, process = id, "UL retransmission deferred, no contiguous run");
                return None;
            };
            start
        };

        for rb in start..start + len {
            self.ul_map.try_claim(rb, rnti);
        }
        dci.rb_start = start as u16;
        dci.ndi = 0;
        self.ul_harq.mark_retransmitted(rnti, id, dci.clone());
        debug!(rnti, process = id, rb_start = start, rb_len = len, "UL HARQ retransmission");
        Some(dci)
    }

    /// UEs with buffered UL data, a usable UL CQI and a free HARQ process
    fn ul_candidates(&self, served: &BTreeSet<Rnti>) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for &rnti in self.ues.keys() {
            let demand = self.flows.ul_buffer_bytes(rnti);
            if served.contains(&rnti) || demand == 0 {
                continue;
            }
            let Some(cqi) = self.cqi.effective_uplink(rnti).filter(|&c| c > 0) else {
                trace!(rnti, "no valid UL CQI, skipped");
                self.stats.add_cqi_skips(1);
                continue;
            };
            if !self.ul_harq.has_free_process(rnti) {
                trace!(rnti, "no free UL HARQ process, skipped");
                self.stats.add_harq_busy_skips(1);
                continue;
            }

            let input = MetricInput {
                rnti,
                direction: Direction::Uplink,
                cqi,
                layer_cqi: std::slice::from_ref(&cqi),
                subband: None,
                unit_rbs: self.config.min_ul_rbs_per_ue as u32,
                past_average: self.flows.past_average(rnti, Direction::Uplink),
                priority: self.flows.highest_priority(rnti, Direction::Uplink),
                gbr_bps: self.flows.guaranteed_bitrate(rnti, Direction::Uplink),
                rr_position: self.rr_position(Direction::Uplink, rnti),
                token_ratio: 0.0,
                amc: &self.amc,
            };
            candidates.push(Candidate {
                rnti,
                metric: self.metric.metric(&input),
                cqi: vec![cqi],
                subband: None,
                demand,
            });
        }
        candidates
    }

    /// Contiguous new-data grant for one ranked candidate
    fn grant_ul(&mut self, cell: &CellState, candidate: &Candidate, share: usize) -> Option<UlDci> {
        let rnti = candidate.rnti;
        let cqi = candidate.cqi.first().copied()?;
        let mcs = self.amc.mcs_from_cqi(cqi);
        let min_rbs = (self.config.min_ul_rbs_per_ue as usize).min(cell.ul_bandwidth as usize);
        let budget = share.max(min_rbs);
        let wanted = (self
            .amc
            .rbs_for_bytes(Direction::Uplink, mcs, candidate.demand, budget as u32)
            as usize)
            .max(min_rbs);

        let (start, len) = self
            .ul_map
            .free_run_for(min_rbs, wanted, |rb| self.ffr.is_ul_rb_available_for_ue(rb, rnti))?;
        let harq_process = self.ul_harq.allocate_or_reuse_process(rnti)?;
        for rb in start..start + len {
            self.ul_map.try_claim(rb, rnti);
        }

        let tb_size = self.amc.tb_size_bytes(Direction::Uplink, mcs, len as u32);
        let dci = UlDci {
            rnti,
            rb_start: start as u16,
            rb_len: len as u16,
            harq_process,
            mcs,
            tb_size,
            ndi: 1,
            tpc: 1,
            cqi_request: false,
        };
        self.ul_harq.mark_active(rnti, harq_process, dci.clone(), Vec::new());
        self.flows.consume_ul(rnti, tb_size);
        self.flows.record_transmission(rnti, Direction::Uplink, tb_size);
        self.stats.add_ul_bytes(tb_size as u64);
        debug!(rnti, process = harq_process, rb_start = start, rb_len = len, mcs, tb_size, "UL grant");
        Some(dci)
    }
}
