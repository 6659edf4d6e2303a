/*!
 * Synthetic MAC
 * Drives the scheduler SAP once per TTI from a scenario, with seeded randomness
 */

use super::scenario::{Scenario, TrafficModel, UeScenario};
use super::trace::{AllocationTrace, SimulationReport, TtiRecord, UeReport};
use crate::config::SchedulerConfig;
use crate::core::limits::{MAX_CQI, MAX_LCG, RLC_HEADER_BYTES, TTI_SECONDS};
use crate::core::{Cqi, Lcid, Rnti, SchedResult, SfnSf};
use crate::flow::{bytes_to_bsr_level, LcDirection};
use crate::sap::*;
use crate::scheduler::MacScheduler;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Queue size reported for full-buffer traffic
const FULL_BUFFER_BYTES: u32 = 100_000;

/// Scheduler plus the MAC/PHY stand-in feeding it
pub struct Simulation {
    scheduler: MacScheduler,
    scenario: Scenario,
    recorder: Arc<RecordingSapUser>,
    rng: StdRng,
    tti: u32,
    sfn_sf: SfnSf,
    dl_queues: BTreeMap<(Rnti, Lcid), u32>,
    ul_queues: BTreeMap<Rnti, u32>,
    // Feedback due at a TTI, in emission order
    dl_feedback: Vec<(u32, DlInfo)>,
    ul_feedback: Vec<(u32, UlInfo)>,
    pusch_cqi: Vec<(u32, SchedUlCqiInfoReq)>,
}

impl Simulation {
    /// Configure cell, UEs and logical channels through the CSCHED SAP
    pub fn new(config: SchedulerConfig, scenario: Scenario) -> SchedResult<Self> {
        scenario.validate()?;
        let mut scheduler = MacScheduler::new(config)?;
        let recorder = Arc::new(RecordingSapUser::new());
        scheduler.set_csched_sap_user(recorder.clone());
        scheduler.set_sched_sap_user(recorder.clone());

        scheduler.csched_cell_config_req(&CschedCellConfigReq {
            dl_bandwidth: scenario.dl_bandwidth,
            ul_bandwidth: scenario.ul_bandwidth,
            num_ccs: 1,
        })?;
        for ue in &scenario.ues {
            scheduler.csched_ue_config_req(&CschedUeConfigReq {
                rnti: ue.rnti,
                reconfigure: false,
                transmission_mode: ue.transmission_mode,
            })?;
            scheduler.csched_lc_config_req(&CschedLcConfigReq {
                rnti: ue.rnti,
                reconfigure: false,
                logical_channels: ue.channels(),
            })?;
        }
        recorder.drain();

        info!(
            policy = %scheduler.policy(),
            ues = scenario.ues.len(),
            seed = scenario.seed,
            "simulation ready"
        );
        Ok(Self {
            rng: StdRng::seed_from_u64(scenario.seed),
            scheduler,
            scenario,
            recorder,
            tti: 0,
            sfn_sf: SfnSf::default(),
            dl_queues: BTreeMap::new(),
            ul_queues: BTreeMap::new(),
            dl_feedback: Vec::new(),
            ul_feedback: Vec::new(),
            pusch_cqi: Vec::new(),
        })
    }

    pub fn scheduler(&self) -> &MacScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut MacScheduler {
        &mut self.scheduler
    }

    pub fn tti(&self) -> u32 {
        self.tti
    }

    pub fn is_finished(&self) -> bool {
        self.tti >= self.scenario.ttis
    }

    /// One subframe: reports, DL trigger, UL trigger
    pub fn step(&mut self) -> SchedResult<TtiRecord> {
        let tti = self.tti;
        let sfn_sf = self.sfn_sf;

        let ues = self.scenario.ues.clone();
        for ue in &ues {
            self.offer_dl_traffic(ue)?;
            self.offer_ul_traffic(ue)?;
            if tti % ue.cqi_period == 0 {
                self.report_cqi(ue, sfn_sf)?;
            }
        }

        let rach_list: Vec<RachInfo> = self
            .scenario
            .rach
            .iter()
            .filter(|r| r.tti == tti)
            .map(|r| RachInfo {
                rnti: r.rnti,
                estimated_size: r.estimated_size,
            })
            .collect();
        if !rach_list.is_empty() {
            self.scheduler
                .sched_dl_rach_info_req(&SchedDlRachInfoReq { sfn_sf, rach_list })?;
        }

        let pusch = take_due(&mut self.pusch_cqi, tti);
        for report in pusch {
            self.scheduler.sched_ul_cqi_info_req(&report)?;
        }

        let dl_info = take_due(&mut self.dl_feedback, tti);
        self.scheduler
            .sched_dl_trigger_req(&SchedDlTriggerReq { sfn_sf, dl_info })?;
        let ul_info = take_due(&mut self.ul_feedback, tti);
        self.scheduler
            .sched_ul_trigger_req(&SchedUlTriggerReq { sfn_sf, ul_info })?;

        let mut dl = DlConfigInd::default();
        let mut ul = UlConfigInd::default();
        for event in self.recorder.drain() {
            match event {
                SapEvent::DlConfigInd(ind) => dl = ind,
                SapEvent::UlConfigInd(ind) => ul = ind,
                other => debug!(?other, "unexpected SAP event during TTI"),
            }
        }
        self.apply_dl(tti, &dl);
        self.apply_ul(tti, sfn_sf, &ul);

        self.tti += 1;
        self.sfn_sf = self.sfn_sf.next();
        Ok(TtiRecord {
            tti,
            sfn_sf,
            dl,
            ul,
        })
    }

    /// Run the remaining TTIs of the scenario
    pub fn run(&mut self) -> SchedResult<AllocationTrace> {
        let mut trace = AllocationTrace::default();
        while !self.is_finished() {
            trace.push(self.step()?);
        }
        Ok(trace)
    }

    /// Per-UE totals over a trace plus the scheduler counters
    pub fn report(&self, trace: &AllocationTrace) -> SimulationReport {
        let seconds = (trace.len().max(1) as f64) * TTI_SECONDS;
        let ues = self
            .scenario
            .ues
            .iter()
            .map(|ue| {
                let (dl_bytes, ul_bytes) = trace
                    .records
                    .iter()
                    .map(|r| r.new_bytes_of(ue.rnti))
                    .fold((0, 0), |(dl, ul), (d, u)| (dl + d, ul + u));
                UeReport {
                    rnti: ue.rnti,
                    dl_bytes,
                    ul_bytes,
                    dl_bitrate: dl_bytes as f64 * 8.0 / seconds,
                    ul_bitrate: ul_bytes as f64 * 8.0 / seconds,
                }
            })
            .collect();
        SimulationReport {
            run_id: self.scheduler.run_id().to_string(),
            ttis: trace.len() as u32,
            stats: self.scheduler.stats(),
            ues,
        }
    }

    fn arrival(&mut self, model: TrafficModel, queued: u32) -> u32 {
        match model {
            TrafficModel::Idle => queued,
            TrafficModel::FullBuffer => queued.max(FULL_BUFFER_BYTES),
            TrafficModel::ConstantBitRate { bytes_per_tti } => queued.saturating_add(bytes_per_tti),
            TrafficModel::Bursty { bytes, probability } => {
                if self.rng.gen_bool(probability.clamp(0.0, 1.0)) {
                    queued.saturating_add(bytes)
                } else {
                    queued
                }
            }
        }
    }

    fn offer_dl_traffic(&mut self, ue: &UeScenario) -> SchedResult<()> {
        let Some(lc) = ue
            .channels()
            .into_iter()
            .find(|lc| lc.direction != LcDirection::Uplink)
        else {
            return Ok(());
        };
        let key = (ue.rnti, lc.lcid);
        let before = self.dl_queues.get(&key).copied().unwrap_or(0);
        let after = self.arrival(ue.dl_traffic, before);
        self.dl_queues.insert(key, after);
        if after == before && ue.dl_traffic.is_idle() {
            return Ok(());
        }
        self.scheduler.sched_dl_rlc_buffer_req(&SchedDlRlcBufferReq {
            rnti: ue.rnti,
            lcid: lc.lcid,
            tx_queue_size: after,
            tx_queue_hol_delay: 0,
            retx_queue_size: 0,
            retx_queue_hol_delay: 0,
            status_pdu_size: 0,
        })
    }

    fn offer_ul_traffic(&mut self, ue: &UeScenario) -> SchedResult<()> {
        let Some(lc) = ue.ul_channel() else {
            return Ok(());
        };
        if ue.ul_traffic.is_idle() {
            return Ok(());
        }
        let before = self.ul_queues.get(&ue.rnti).copied().unwrap_or(0);
        let after = self.arrival(ue.ul_traffic, before);
        self.ul_queues.insert(ue.rnti, after);

        let mut buffer_status = vec![0u8; MAX_LCG];
        if let Some(slot) = buffer_status.get_mut(lc.lcg as usize) {
            *slot = bytes_to_bsr_level(after);
        }
        self.scheduler
            .sched_ul_mac_ctrl_info_req(&SchedUlMacCtrlInfoReq {
                sfn_sf: self.sfn_sf,
                mac_ce_list: vec![MacCeBsr {
                    rnti: ue.rnti,
                    buffer_status,
                }],
            })
    }

    fn jittered_cqi(&mut self, mean: Cqi, jitter: u8) -> Cqi {
        if jitter == 0 {
            return mean;
        }
        let delta = self.rng.gen_range(-(jitter as i16)..=jitter as i16);
        (mean as i16 + delta).clamp(0, MAX_CQI as i16) as Cqi
    }

    fn report_cqi(&mut self, ue: &UeScenario, sfn_sf: SfnSf) -> SchedResult<()> {
        let layers = self
            .scheduler
            .ue(ue.rnti)
            .map(|ctx| ctx.layers())
            .unwrap_or(1);
        let wideband: Vec<Cqi> = (0..layers)
            .map(|_| self.jittered_cqi(ue.dl_cqi, ue.cqi_jitter))
            .collect();
        let subband = if ue.subband_cqi {
            let rbgs = self.scheduler.cell().map(|c| c.rbg_count).unwrap_or(0);
            Some(
                (0..rbgs)
                    .map(|_| self.jittered_cqi(ue.dl_cqi, ue.cqi_jitter))
                    .collect(),
            )
        } else {
            None
        };
        self.scheduler.sched_dl_cqi_info_req(&SchedDlCqiInfoReq {
            sfn_sf,
            cqi_list: vec![DlCqiReport {
                rnti: ue.rnti,
                wideband: Some(wideband),
                subband,
            }],
        })?;

        let sinr = ue.ul_sinr_db + self.rng.gen_range(-1.0..=1.0);
        self.scheduler.sched_ul_cqi_info_req(&SchedUlCqiInfoReq {
            sfn_sf,
            source: UlCqiSource::Srs { rnti: ue.rnti },
            sinr_db: vec![sinr],
        })
    }

    fn nack(&mut self) -> HarqFeedback {
        if self.rng.gen_bool(self.scenario.nack_probability) {
            HarqFeedback::Nack
        } else {
            HarqFeedback::Ack
        }
    }

    /// RLC drains what was sent; the PHY decodes (or not) after the feedback delay
    fn apply_dl(&mut self, tti: u32, dl: &DlConfigInd) {
        let due = tti + self.scenario.harq_feedback_delay;
        let harq = self.scheduler.config().harq_enabled;
        for element in &dl.build_data_list {
            if !element.retransmission {
                for pdu in element.rlc_pdus.iter().flatten() {
                    if let Some(queue) = self.dl_queues.get_mut(&(element.rnti, pdu.lcid)) {
                        *queue = queue.saturating_sub(pdu.size.saturating_sub(RLC_HEADER_BYTES));
                    }
                }
            }
            if harq {
                let status = (0..element.dci.layers()).map(|_| self.nack()).collect();
                self.dl_feedback.push((
                    due,
                    DlInfo {
                        rnti: element.rnti,
                        harq_process_id: element.dci.harq_process,
                        status,
                    },
                ));
            }
        }
    }

    /// UE empties its buffer into the grant; PUSCH SINR comes back with the feedback
    fn apply_ul(&mut self, tti: u32, sfn_sf: SfnSf, ul: &UlConfigInd) {
        let due = tti + self.scenario.harq_feedback_delay;
        let harq = self.scheduler.config().harq_enabled;
        let mut sinr_db = vec![0.0; self.scenario.ul_bandwidth as usize];

        for dci in &ul.dci_list {
            if dci.ndi == 1 {
                if let Some(queue) = self.ul_queues.get_mut(&dci.rnti) {
                    *queue = queue.saturating_sub(dci.tb_size);
                }
            }
            let ue_sinr = self
                .scenario
                .ues
                .iter()
                .find(|ue| ue.rnti == dci.rnti)
                .map(|ue| ue.ul_sinr_db)
                .unwrap_or(0.0);
            let start = dci.rb_start as usize;
            for slot in sinr_db.iter_mut().skip(start).take(dci.rb_len as usize) {
                *slot = ue_sinr;
            }
            if harq {
                let status = self.nack();
                self.ul_feedback.push((
                    due,
                    UlInfo {
                        rnti: dci.rnti,
                        harq_process_id: dci.harq_process,
                        status,
                    },
                ));
            }
        }

        if !ul.dci_list.is_empty() {
            self.pusch_cqi.push((
                due,
                SchedUlCqiInfoReq {
                    sfn_sf,
                    source: UlCqiSource::Pusch,
                    sinr_db,
                },
            ));
        }
    }
}

/// Remove and return the entries due at or before `tti`, keeping their order
fn take_due<T>(queue: &mut Vec<(u32, T)>, tti: u32) -> Vec<T> {
    let (due, later): (Vec<_>, Vec<_>) = std::mem::take(queue)
        .into_iter()
        .partition(|(at, _)| *at <= tti);
    *queue = later;
    due.into_iter().map(|(_, item)| item).collect()
}
