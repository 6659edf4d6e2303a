/*!
 * Downlink Scheduling
 * HARQ retransmissions first, then new data over RBGs in metric order
 */

use super::cell::CellState;
use super::entry::{rank, Candidate};
use super::policy::MetricInput;
use super::MacScheduler;
use crate::config::ShareMode;
use crate::core::limits::{HARQ_RV_CYCLE, MAC_SUBHEADER_BYTES, RLC_HEADER_BYTES};
use crate::core::{
    Cqi, Direction, DlDci, HarqProcessId, Mcs, RlcPdu, Rnti, SchedResult, SchedulerError,
};
use crate::harq::{HarqFailure, NackOutcome};
use crate::monitoring::tti_span;
use crate::sap::{BuildDataListElement, DlConfigInd, DlInfo, SchedDlTriggerReq};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// RBG selection for one new-data grant
struct DlPlan {
    rbgs: Vec<usize>,
    layer_cqi: Vec<Cqi>,
    tb_size: Vec<u32>,
}

impl MacScheduler {
    /// Run one DL scheduling pass
    pub fn schedule_dl(&mut self, params: &SchedDlTriggerReq) -> SchedResult<DlConfigInd> {
        let cell = self.cell.ok_or(SchedulerError::CellNotConfigured)?;
        let span = tti_span(&self.run_id, Direction::Downlink, params.sfn_sf);
        let _guard = span.enter();
        self.stats.add_dl_ttis(1);

        let mut harq_failures = self.dl_harq.tick();
        harq_failures.extend(self.apply_dl_feedback(&params.dl_info));

        self.dl_map.reset(cell.rbg_count);
        for (rbg, reserved) in self.ffr.dl_reserved_rbgs(cell.rbg_count).into_iter().enumerate() {
            if reserved {
                self.dl_map.mark_reserved(rbg);
            }
        }

        let build_rar_list = self.serve_rach(&cell);

        // Retransmissions preempt new data, one per UE
        let mut served = BTreeSet::new();
        let mut build_data_list = Vec::new();
        let mut deferred = 0u64;
        for (rnti, id) in self.dl_harq.pending_retransmissions() {
            if served.contains(&rnti) {
                continue;
            }
            match self.retransmit_dl(rnti, id) {
                Some(element) => {
                    served.insert(rnti);
                    build_data_list.push(element);
                }
                None => deferred += 1,
            }
        }
        self.stats.add_dl_retx_grants(build_data_list.len() as u64);
        self.stats.add_retx_deferred(deferred);

        self.cqi.tick(Direction::Downlink);
        if self.metric.kind().uses_token_bank() {
            self.tokens.refill();
        }
        let mut candidates = self.dl_candidates(&cell, &served);
        rank(&mut candidates);

        let share_mode = self.metric.kind().share_mode();
        let total = candidates.len();
        let mut first_served = None;
        let mut new_grants = 0u64;
        for (k, candidate) in candidates.iter().enumerate() {
            let free = self.dl_map.free_count();
            if free == 0 {
                break;
            }
            let share = match share_mode {
                ShareMode::Equal => free.div_ceil(total - k),
                ShareMode::Greedy => free,
            };
            if let Some(element) = self.grant_dl(&cell, candidate, share) {
                first_served.get_or_insert(candidate.rnti);
                build_data_list.push(element);
                new_grants += 1;
            }
        }
        self.stats.add_dl_new_grants(new_grants);
        self.stats.add_harq_failures(harq_failures.len() as u64);

        self.flows.end_tti(Direction::Downlink);
        self.rotate(Direction::Downlink, first_served);

        span.record("granted", build_data_list.len());
        span.record("deferred", deferred);

        Ok(DlConfigInd {
            sfn_sf: params.sfn_sf,
            build_data_list,
            build_rar_list,
            harq_failures,
        })
    }

    /// ACK frees the process, NACK flags it (or drops it at the transmission limit)
    fn apply_dl_feedback(&mut self, dl_info: &[DlInfo]) -> Vec<HarqFailure> {
        let mut failures = Vec::new();
        for info in dl_info {
            if info.is_ack() || !self.resends_any_layer(info) {
                if !self.dl_harq.mark_acknowledged(info.rnti, info.harq_process_id) {
                    self.stats.add_stale_feedback(1);
                }
                continue;
            }
            match self
                .dl_harq
                .mark_nack_layers(info.rnti, info.harq_process_id, info.nacked_layers())
            {
                NackOutcome::Retransmit => {}
                NackOutcome::Dropped(failure) => failures.push(failure),
                NackOutcome::Stale => {
                    trace!(rnti = info.rnti, process = info.harq_process_id, "stale DL NACK");
                    self.stats.add_stale_feedback(1);
                }
            }
        }
        failures
    }

    /// Whether a NACK hits a layer that actually carried data
    fn resends_any_layer(&self, info: &DlInfo) -> bool {
        let Some(dci) = self
            .dl_harq
            .process(info.rnti, info.harq_process_id)
            .and_then(|p| p.dci.as_ref())
        else {
            return true;
        };
        dci.tb_size
            .iter()
            .zip(info.nacked_layers())
            .any(|(&tb, nacked)| tb > 0 && nacked)
    }

    /// Resend a NACKed TB on its old RBGs, or on as many free RBGs found after them
    ///
    /// Only NACKed layers are resent; decoded layers go out as empty TBs.
    fn retransmit_dl(&mut self, rnti: Rnti, id: HarqProcessId) -> Option<BuildDataListElement> {
        let process = self.dl_harq.process(rnti, id)?;
        let mut dci = process.dci.clone()?;
        let resend: Vec<bool> = dci
            .tb_size
            .iter()
            .enumerate()
            .map(|(layer, &tb)| tb > 0 && process.layer_nacked(layer))
            .collect();
        let rlc_pdus: Vec<Vec<RlcPdu>> = process
            .rlc_pdus
            .iter()
            .map(|layers| {
                layers
                    .iter()
                    .enumerate()
                    .map(|(layer, pdu)| match resend.get(layer) {
                        Some(true) => *pdu,
                        _ => RlcPdu { size: 0, ..*pdu },
                    })
                    .collect()
            })
            .collect();
        let previous = dci.rbgs();
        let last = *previous.last()?;

        let rbgs = {
            let usable =
                |i: usize| self.dl_map.is_free(i) && self.ffr.is_dl_rbg_available_for_ue(i, rnti);
            if previous.iter().all(|&i| usable(i)) {
                previous.clone()
            } else {
                let n = self.dl_map.len();
                let mut found: Vec<usize> = (0..n)
                    .map(|k| (last + 1 + k) % n)
                    .filter(|&i| usable(i))
                    .take(previous.len())
                    .collect();
                if found.len() < previous.len() {
                    debug!(rnti, process = id, "DL retransmission deferred, not enough RBGs");
                    return None;
                }
                found.sort_unstable();
                found
            }
        };

        for &rbg in &rbgs {
            self.dl_map.try_claim(rbg, rnti);
        }
        dci.rbg_bitmap = DlDci::bitmap_of(&rbgs);
        for (layer, &again) in resend.iter().enumerate() {
            if again {
                dci.bump_redundancy_version(layer, HARQ_RV_CYCLE);
            } else {
                dci.clear_layer(layer);
            }
        }
        self.dl_harq.mark_retransmitted(rnti, id, dci.clone());
        debug!(rnti, process = id, rbgs = ?rbgs, rv = ?dci.rv, "DL HARQ retransmission");

        Some(BuildDataListElement {
            rnti,
            dci,
            rlc_pdus,
            retransmission: true,
        })
    }

    /// UEs with queued data, a usable CQI and a free HARQ process
    fn dl_candidates(&self, cell: &CellState, served: &BTreeSet<Rnti>) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for (&rnti, ue) in &self.ues {
            let active = self.flows.lc_active_per_flow(rnti);
            if served.contains(&rnti) || active == 0 {
                continue;
            }
            let Some(cqi0) = self.cqi.effective_cqi(rnti).filter(|&c| c > 0) else {
                trace!(rnti, "no valid DL CQI, skipped");
                self.stats.add_cqi_skips(1);
                continue;
            };
            if !self.dl_harq.has_free_process(rnti) {
                trace!(rnti, "no free DL HARQ process, skipped");
                self.stats.add_harq_busy_skips(1);
                continue;
            }

            let wideband = self.cqi.effective_wideband(rnti);
            let cqi: Vec<Cqi> = (0..ue.layers())
                .map(|layer| {
                    wideband
                        .and_then(|w| w.get(layer).copied())
                        .unwrap_or(cqi0)
                })
                .enumerate()
                .take_while(|&(layer, c)| layer == 0 || c > 0)
                .map(|(_, c)| c)
                .collect();
            let subband = self.cqi.effective_subband(rnti).map(|s| s.to_vec());

            let input = MetricInput {
                rnti,
                direction: Direction::Downlink,
                cqi: cqi0,
                layer_cqi: &cqi,
                subband: subband.as_deref(),
                unit_rbs: cell.rbg_size as u32,
                past_average: self.flows.past_average(rnti, Direction::Downlink),
                priority: self.flows.highest_priority(rnti, Direction::Downlink),
                gbr_bps: self.flows.guaranteed_bitrate(rnti, Direction::Downlink),
                rr_position: self.rr_position(Direction::Downlink, rnti),
                token_ratio: self.tokens.metric(rnti),
                amc: &self.amc,
            };
            let metric = self.metric.metric(&input);
            let mut demand = self.flows.dl_demand_bytes(rnti) + active as u32 * MAC_SUBHEADER_BYTES;
            if self.metric.kind().uses_token_bank() {
                demand = demand.min(self.tokens.budget(rnti));
                if demand == 0 {
                    trace!(rnti, "token budget exhausted, skipped");
                    continue;
                }
            }

            candidates.push(Candidate {
                rnti,
                metric,
                cqi,
                subband,
                demand,
            });
        }
        candidates
    }

    /// CQI per layer over the chosen RBGs (worst subband when subbands drive the choice)
    fn layer_cqi(candidate: &Candidate, rbgs: &[usize], subbands: Option<&[Cqi]>) -> Vec<Cqi> {
        let mut cqi = candidate.cqi.clone();
        if let (Some(subband), Some(first)) = (subbands, cqi.first_mut()) {
            let wideband = *first;
            *first = rbgs
                .iter()
                .map(|&i| subband.get(i).copied().unwrap_or(wideband))
                .min()
                .unwrap_or(wideband);
        }
        cqi
    }

    /// Pick up to `share` RBGs, the fewest that carry the UE's demand
    fn plan_dl(&self, cell: &CellState, candidate: &Candidate, share: usize) -> Option<DlPlan> {
        let rnti = candidate.rnti;
        let subbands = candidate
            .subband
            .as_deref()
            .filter(|_| self.metric.kind().uses_subbands());

        let mut usable: Vec<usize> = self
            .dl_map
            .free_indexes()
            .into_iter()
            .filter(|&i| self.ffr.is_dl_rbg_available_for_ue(i, rnti))
            .collect();
        if let Some(subband) = subbands {
            let wideband = candidate.cqi.first().copied().unwrap_or(0);
            let quality = |i: usize| subband.get(i).copied().unwrap_or(wideband);
            usable.retain(|&i| quality(i) > 0);
            usable.sort_by(|&a, &b| quality(b).cmp(&quality(a)).then(a.cmp(&b)));
        }

        let mut plan = None;
        for n in 1..=share.min(usable.len()) {
            let mut rbgs = usable[..n].to_vec();
            rbgs.sort_unstable();
            let layer_cqi = Self::layer_cqi(candidate, &rbgs, subbands);
            let rbs = cell.rbs_in(&rbgs);
            let tb_size: Vec<u32> = layer_cqi
                .iter()
                .map(|&c| {
                    self.amc
                        .tb_size_bytes(Direction::Downlink, self.amc.mcs_from_cqi(c), rbs)
                })
                .collect();
            let carried: u32 = tb_size.iter().sum();
            plan = Some(DlPlan {
                rbgs,
                layer_cqi,
                tb_size,
            });
            if carried >= candidate.demand {
                break;
            }
        }
        plan
    }

    /// New-data grant for one ranked candidate
    fn grant_dl(
        &mut self,
        cell: &CellState,
        candidate: &Candidate,
        share: usize,
    ) -> Option<BuildDataListElement> {
        let rnti = candidate.rnti;
        let plan = self.plan_dl(cell, candidate, share)?;

        let Some(harq_process) = self.dl_harq.allocate_or_reuse_process(rnti) else {
            self.stats.add_harq_busy_skips(1);
            return None;
        };
        let rlc_pdus = self.build_rlc_pdus(rnti, &plan.tb_size);
        if rlc_pdus.is_empty() {
            trace!(rnti, "TB too small for any RLC PDU");
            return None;
        }
        for &rbg in &plan.rbgs {
            self.dl_map.try_claim(rbg, rnti);
        }

        let layers = plan.tb_size.len();
        let mcs: Vec<Mcs> = plan
            .layer_cqi
            .iter()
            .map(|&c| self.amc.mcs_from_cqi(c))
            .collect();
        let dci = DlDci {
            rnti,
            rbg_bitmap: DlDci::bitmap_of(&plan.rbgs),
            harq_process,
            mcs,
            tb_size: plan.tb_size,
            ndi: vec![1; layers],
            rv: vec![0; layers],
            tpc: 1,
        };
        self.dl_harq
            .mark_active(rnti, harq_process, dci.clone(), rlc_pdus.clone());

        let bytes: u32 = dci.tb_size.iter().sum();
        if self.metric.kind().uses_token_bank() {
            self.tokens.consume(rnti, bytes);
        }
        self.flows.record_transmission(rnti, Direction::Downlink, bytes);
        self.stats.add_dl_bytes(bytes as u64);
        debug!(rnti, process = harq_process, rbgs = ?plan.rbgs, mcs = ?dci.mcs, bytes, "DL grant");

        Some(BuildDataListElement {
            rnti,
            dci,
            rlc_pdus,
            retransmission: false,
        })
    }

    /// Fill each layer's TB with RLC PDUs in LC priority order, draining the queues
    ///
    /// Result is indexed by logical channel, then layer.
    fn build_rlc_pdus(&mut self, rnti: Rnti, tb_size: &[u32]) -> Vec<Vec<RlcPdu>> {
        let flows = self.flows.active_flows(rnti);
        let mut per_lc: Vec<Vec<RlcPdu>> = flows
            .iter()
            .map(|&(lcid, _)| vec![RlcPdu { lcid, size: 0 }; tb_size.len()])
            .collect();

        for (layer, &tb) in tb_size.iter().enumerate() {
            let mut budget = tb;
            for (idx, &(lcid, _)) in flows.iter().enumerate() {
                if budget <= MAC_SUBHEADER_BYTES + RLC_HEADER_BYTES {
                    break;
                }
                let queued = self
                    .flows
                    .flow(rnti, lcid)
                    .map(|f| f.queued_bytes())
                    .unwrap_or(0);
                if queued == 0 {
                    continue;
                }
                let size = (queued + RLC_HEADER_BYTES).min(budget - MAC_SUBHEADER_BYTES);
                self.flows.consume_dl(rnti, lcid, size);
                per_lc[idx][layer].size = size;
                budget -= size + MAC_SUBHEADER_BYTES;
            }
        }

        per_lc.retain(|layers| layers.iter().any(|pdu| pdu.size > 0));
        per_lc
    }
}
