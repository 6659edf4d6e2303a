/*!
 * MAC Scheduler Engine
 * One engine for every policy: HARQ precedence, CQI gating and RBG bookkeeping
 * are shared, the ranking metric is injected
 */

mod atomic_stats;
mod cell;
mod downlink;
mod entry;
mod operations;
mod policy;
mod rach;
mod stats;
mod uplink;

pub use atomic_stats::AtomicSchedulerStats;
pub use cell::{CellState, UeContext};
pub use policy::{
    metric_for, CalibrationMetric, FdMaxThroughputMetric, MaxThroughputMetric, MetricInput,
    PriorityMetric, ProportionalFairMetric, RoundRobinMetric, SchedulingMetric,
    ThroughputToAverageMetric, TokenBankMetric,
};
pub use stats::SchedulerStats;

use crate::config::{PolicyKind, SchedulerConfig};
use crate::core::{Amc, Direction, Rnti, SchedResult, SfnSf, UlDci};
use crate::cqi::CqiFeedbackStore;
use crate::ffr::{FrequencyReuse, NoFrequencyReuse};
use crate::flow::{TokenBank, UeFlowState};
use crate::harq::{DlHarqTable, UlHarqTable};
use crate::rbg::RbgAllocationMap;
use crate::sap::{CschedSapUser, RachInfo, SchedSapUser};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// UL allocation maps kept for PUSCH CQI attribution
const MAX_UL_ALLOCATION_MAPS: usize = 32;

/// MAC scheduler of one component carrier
///
/// Single-threaded: every request runs to completion before the next one.
/// `schedule_dl`/`schedule_ul` return their indication directly; through the
/// SAP provider traits the same indication is delivered to the registered user.
pub struct MacScheduler {
    config: SchedulerConfig,
    metric: Box<dyn SchedulingMetric>,
    amc: Amc,
    ffr: Box<dyn FrequencyReuse>,

    cell: Option<CellState>,
    ues: BTreeMap<Rnti, UeContext>,

    dl_harq: DlHarqTable,
    ul_harq: UlHarqTable,
    cqi: CqiFeedbackStore,
    flows: UeFlowState,
    // DL token buckets, driven only by the token-bank policy
    tokens: TokenBank,

    // Allocation maps of the TTI being scheduled
    dl_map: RbgAllocationMap,
    ul_map: RbgAllocationMap,

    // Round-robin rotation per direction (head = next to serve)
    rr_dl: VecDeque<Rnti>,
    rr_ul: VecDeque<Rnti>,

    rach_queue: Vec<RachInfo>,
    // RAR grants placed by the DL trigger, claimed by the next UL trigger
    rar_grants: Vec<UlDci>,
    // RB owners of recent UL triggers, oldest first
    ul_allocation_maps: VecDeque<(SfnSf, Vec<Option<Rnti>>)>,

    csched_user: Option<Arc<dyn CschedSapUser>>,
    sched_user: Option<Arc<dyn SchedSapUser>>,

    stats: Arc<AtomicSchedulerStats>,
    run_id: Uuid,
}

impl MacScheduler {
    /// Build an engine for the configured policy
    pub fn new(config: SchedulerConfig) -> SchedResult<Self> {
        let metric = metric_for(config.policy);
        Self::with_metric(config, metric)
    }

    /// Build an engine around a custom ranking metric
    pub fn with_metric(
        config: SchedulerConfig,
        metric: Box<dyn SchedulingMetric>,
    ) -> SchedResult<Self> {
        config.validate()?;
        let ffr: Box<dyn FrequencyReuse> = match &config.frequency_reuse {
            Some(masks) => Box::new(masks.clone()),
            None => Box::new(NoFrequencyReuse),
        };
        let run_id = crate::monitoring::generate_run_id();
        let policy = metric.kind();

        info!(
            %policy,
            harq = config.harq_enabled,
            cqi_threshold = config.cqi_threshold(),
            run_id = %run_id,
            "MAC scheduler created"
        );

        Ok(Self {
            metric,
            amc: Amc::new(config.amc_target_ber),
            ffr,
            cell: None,
            ues: BTreeMap::new(),
            dl_harq: DlHarqTable::new(Direction::Downlink, config.harq(Direction::Downlink)),
            ul_harq: UlHarqTable::new(Direction::Uplink, config.harq(Direction::Uplink)),
            cqi: CqiFeedbackStore::new(config.cqi_threshold()),
            flows: UeFlowState::new(config.time_window),
            tokens: TokenBank::new(config.token_bank),
            dl_map: RbgAllocationMap::default(),
            ul_map: RbgAllocationMap::default(),
            rr_dl: VecDeque::new(),
            rr_ul: VecDeque::new(),
            rach_queue: Vec::new(),
            rar_grants: Vec::new(),
            ul_allocation_maps: VecDeque::new(),
            csched_user: None,
            sched_user: None,
            stats: Arc::new(AtomicSchedulerStats::new(policy)),
            run_id,
            config,
        })
    }

    /// Replace the frequency reuse algorithm
    pub fn set_frequency_reuse(&mut self, ffr: Box<dyn FrequencyReuse>) {
        self.ffr = ffr;
    }

    pub fn set_csched_sap_user(&mut self, user: Arc<dyn CschedSapUser>) {
        self.csched_user = Some(user);
    }

    pub fn set_sched_sap_user(&mut self, user: Arc<dyn SchedSapUser>) {
        self.sched_user = Some(user);
    }

    pub(crate) fn csched_user(&self) -> Option<&Arc<dyn CschedSapUser>> {
        self.csched_user.as_ref()
    }

    pub(crate) fn sched_user(&self) -> Option<&Arc<dyn SchedSapUser>> {
        self.sched_user.as_ref()
    }

    #[inline]
    pub fn policy(&self) -> PolicyKind {
        self.metric.kind()
    }

    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[inline]
    pub fn cell(&self) -> Option<&CellState> {
        self.cell.as_ref()
    }

    pub fn ue(&self, rnti: Rnti) -> Option<&UeContext> {
        self.ues.get(&rnti)
    }

    pub fn ue_count(&self) -> usize {
        self.ues.len()
    }

    pub fn dl_harq(&self) -> &DlHarqTable {
        &self.dl_harq
    }

    pub fn ul_harq(&self) -> &UlHarqTable {
        &self.ul_harq
    }

    pub fn cqi(&self) -> &CqiFeedbackStore {
        &self.cqi
    }

    pub fn flows(&self) -> &UeFlowState {
        &self.flows
    }

    /// DL allocation map as left by the last DL trigger
    pub fn dl_map(&self) -> &RbgAllocationMap {
        &self.dl_map
    }

    /// UL allocation map as left by the last UL trigger
    pub fn ul_map(&self) -> &RbgAllocationMap {
        &self.ul_map
    }

    /// Current round-robin rotation of a direction, head first
    pub fn rr_order(&self, direction: Direction) -> Vec<Rnti> {
        match direction {
            Direction::Downlink => self.rr_dl.iter().copied().collect(),
            Direction::Uplink => self.rr_ul.iter().copied().collect(),
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats.snapshot()
    }

    /// Shared handle to the live counters
    pub fn stats_handle(&self) -> Arc<AtomicSchedulerStats> {
        Arc::clone(&self.stats)
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// RB owners recorded by the UL trigger of `sfn_sf`
    pub fn ul_allocation_map(&self, sfn_sf: SfnSf) -> Option<&[Option<Rnti>]> {
        self.ul_allocation_maps
            .iter()
            .find(|(s, _)| *s == sfn_sf)
            .map(|(_, owners)| owners.as_slice())
    }

    fn rr_queue_mut(&mut self, direction: Direction) -> &mut VecDeque<Rnti> {
        match direction {
            Direction::Downlink => &mut self.rr_dl,
            Direction::Uplink => &mut self.rr_ul,
        }
    }

    fn rr_position(&self, direction: Direction, rnti: Rnti) -> usize {
        let queue = match direction {
            Direction::Downlink => &self.rr_dl,
            Direction::Uplink => &self.rr_ul,
        };
        queue.iter().position(|&r| r == rnti).unwrap_or(queue.len())
    }

    /// The UE served first this TTI goes to the back of the rotation
    fn rotate(&mut self, direction: Direction, first_served: Option<Rnti>) {
        let Some(rnti) = first_served else {
            return;
        };
        let queue = self.rr_queue_mut(direction);
        if let Some(pos) = queue.iter().position(|&r| r == rnti) {
            queue.remove(pos);
            queue.push_back(rnti);
        }
    }

    fn store_ul_allocation_map(&mut self, sfn_sf: SfnSf, owners: Vec<Option<Rnti>>) {
        self.ul_allocation_maps.retain(|(s, _)| *s != sfn_sf);
        self.ul_allocation_maps.push_back((sfn_sf, owners));
        while self.ul_allocation_maps.len() > MAX_UL_ALLOCATION_MAPS {
            self.ul_allocation_maps.pop_front();
        }
    }
}

impl fmt::Debug for MacScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacScheduler")
            .field("policy", &self.metric.kind())
            .field("cell", &self.cell)
            .field("ues", &self.ues.len())
            .field("run_id", &self.run_id)
            .finish()
    }
}
