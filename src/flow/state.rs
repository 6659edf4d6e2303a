/*!
 * Flow State
 * Per-(RNTI, LCID) queue records, per-LCG BSR bytes and per-UE throughput
 */

use super::bsr::bsr_level_to_bytes;
use super::throughput::ThroughputStats;
use crate::core::limits::{MAX_LCG, MAX_LC_PRIORITY, RLC_HEADER_BYTES};
use crate::core::{Direction, FlowId, Lcg, Lcid, Rnti};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Directions a logical channel carries data in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LcDirection {
    Downlink,
    Uplink,
    Both,
}

impl LcDirection {
    #[inline]
    pub fn carries(&self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Self::Both, _)
                | (Self::Downlink, Direction::Downlink)
                | (Self::Uplink, Direction::Uplink)
        )
    }
}

/// QoS configuration of a logical channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalChannelConfig {
    pub lcid: Lcid,
    pub lcg: Lcg,
    pub direction: LcDirection,
    /// 1 (highest) ..= 16
    pub priority: u8,
    pub qci: u8,
    /// Guaranteed bit rates in bit/s (0 for non-GBR bearers)
    pub gbr_dl: u64,
    pub gbr_ul: u64,
    /// Maximum bit rates in bit/s (0 = unlimited)
    #[serde(default)]
    pub mbr_dl: u64,
    #[serde(default)]
    pub mbr_ul: u64,
}

impl LogicalChannelConfig {
    /// Best-effort bearer used for buffer reports on unconfigured channels
    pub fn best_effort(lcid: Lcid) -> Self {
        Self {
            lcid,
            lcg: 3,
            direction: LcDirection::Both,
            priority: MAX_LC_PRIORITY,
            qci: 9,
            gbr_dl: 0,
            gbr_ul: 0,
            mbr_dl: 0,
            mbr_ul: 0,
        }
    }
}

/// Queue state of one logical channel as reported by RLC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub config: LogicalChannelConfig,
    pub tx_queue: u32,
    pub retx_queue: u32,
    pub status_pdu: u32,
    /// Head-of-line delay in ms
    pub hol_delay: u16,
}

impl FlowRecord {
    fn new(config: LogicalChannelConfig) -> Self {
        Self {
            config,
            tx_queue: 0,
            retx_queue: 0,
            status_pdu: 0,
            hol_delay: 0,
        }
    }

    #[inline]
    pub fn queued_bytes(&self) -> u32 {
        self.tx_queue + self.retx_queue + self.status_pdu
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.queued_bytes() > 0
    }

    /// Drain `bytes` of TB space: status PDU, then retransmissions, then new data
    fn consume(&mut self, bytes: u32) -> u32 {
        let mut left = bytes.saturating_sub(RLC_HEADER_BYTES);
        let mut drained = 0;
        for queue in [&mut self.status_pdu, &mut self.retx_queue, &mut self.tx_queue] {
            let take = (*queue).min(left);
            *queue -= take;
            left -= take;
            drained += take;
        }
        drained
    }
}

/// Traffic bookkeeping for every UE of the cell
#[derive(Debug, Clone)]
pub struct UeFlowState {
    flows: BTreeMap<FlowId, FlowRecord>,
    bsr: BTreeMap<Rnti, [u32; MAX_LCG]>,
    throughput: BTreeMap<(Rnti, Direction), ThroughputStats>,
    time_window: f64,
}

impl UeFlowState {
    pub fn new(time_window: f64) -> Self {
        Self {
            flows: BTreeMap::new(),
            bsr: BTreeMap::new(),
            throughput: BTreeMap::new(),
            time_window,
        }
    }

    /// Start throughput history for a UE
    pub fn add_ue(&mut self, rnti: Rnti) {
        for direction in [Direction::Downlink, Direction::Uplink] {
            self.throughput.entry((rnti, direction)).or_default();
        }
        self.bsr.entry(rnti).or_insert([0; MAX_LCG]);
    }

    /// Drop every record of a UE
    pub fn remove_ue(&mut self, rnti: Rnti) {
        self.flows.retain(|flow, _| flow.rnti != rnti);
        self.bsr.remove(&rnti);
        self.throughput.retain(|(r, _), _| *r != rnti);
    }

    /// Add or reconfigure a logical channel, keeping its queue state
    pub fn configure_lc(&mut self, rnti: Rnti, config: LogicalChannelConfig) {
        self.flows
            .entry(FlowId::new(rnti, config.lcid))
            .and_modify(|record| record.config = config)
            .or_insert_with(|| FlowRecord::new(config));
    }

    pub fn release_lc(&mut self, rnti: Rnti, lcid: Lcid) -> bool {
        self.flows.remove(&FlowId::new(rnti, lcid)).is_some()
    }

    pub fn has_lc(&self, rnti: Rnti, lcid: Lcid) -> bool {
        self.flows.contains_key(&FlowId::new(rnti, lcid))
    }

    /// Overwrite the RLC queue report of one logical channel
    pub fn update_rlc_buffer_req(
        &mut self,
        rnti: Rnti,
        lcid: Lcid,
        tx_queue: u32,
        retx_queue: u32,
        status_pdu: u32,
        hol_delay: u16,
    ) {
        let record = self
            .flows
            .entry(FlowId::new(rnti, lcid))
            .or_insert_with(|| FlowRecord::new(LogicalChannelConfig::best_effort(lcid)));
        record.tx_queue = tx_queue;
        record.retx_queue = retx_queue;
        record.status_pdu = status_pdu;
        record.hol_delay = hol_delay;
        trace!(rnti, lcid, tx_queue, retx_queue, status_pdu, "RLC buffer report");
    }

    /// Store the bytes behind a BSR index for one LCG (replaces the previous report)
    pub fn update_bsr(&mut self, rnti: Rnti, lcg: Lcg, level: u8) {
        let bytes = bsr_level_to_bytes(level);
        let groups = self.bsr.entry(rnti).or_insert([0; MAX_LCG]);
        if let Some(slot) = groups.get_mut(lcg as usize) {
            *slot = bytes;
        }
    }

    /// UL bytes announced by the last BSRs of a UE
    pub fn ul_buffer_bytes(&self, rnti: Rnti) -> u32 {
        self.bsr.get(&rnti).map(|g| g.iter().sum()).unwrap_or(0)
    }

    /// Remove granted UL bytes from the BSR estimate, lowest LCG first
    pub fn consume_ul(&mut self, rnti: Rnti, bytes: u32) {
        let Some(groups) = self.bsr.get_mut(&rnti) else {
            return;
        };
        let mut left = bytes;
        for slot in groups.iter_mut() {
            let take = (*slot).min(left);
            *slot -= take;
            left -= take;
        }
    }

    /// Logical channels of a UE with queued DL data
    pub fn lc_active_per_flow(&self, rnti: Rnti) -> usize {
        self.flows_of(rnti).filter(|(_, r)| r.is_active()).count()
    }

    /// Active logical channels, highest priority first (then lowest LCID)
    pub fn active_flows(&self, rnti: Rnti) -> Vec<(Lcid, FlowRecord)> {
        let mut flows: Vec<(Lcid, FlowRecord)> = self
            .flows_of(rnti)
            .filter(|(_, r)| r.is_active())
            .map(|(flow, r)| (flow.lcid, *r))
            .collect();
        flows.sort_by_key(|(lcid, r)| (r.config.priority, *lcid));
        flows
    }

    /// DL bytes needed to empty every queue, RLC headers included
    pub fn dl_demand_bytes(&self, rnti: Rnti) -> u32 {
        self.flows_of(rnti)
            .filter(|(_, r)| r.is_active())
            .map(|(_, r)| r.queued_bytes() + RLC_HEADER_BYTES)
            .sum()
    }

    /// Drain TB space from one logical channel, returns payload bytes removed
    pub fn consume_dl(&mut self, rnti: Rnti, lcid: Lcid, bytes: u32) -> u32 {
        self.flows
            .get_mut(&FlowId::new(rnti, lcid))
            .map(|r| r.consume(bytes))
            .unwrap_or(0)
    }

    /// Best (numerically lowest) priority among channels carrying `direction`
    pub fn highest_priority(&self, rnti: Rnti, direction: Direction) -> Option<u8> {
        self.flows_of(rnti)
            .filter(|(_, r)| r.config.direction.carries(direction))
            .filter(|(_, r)| direction == Direction::Uplink || r.is_active())
            .map(|(_, r)| r.config.priority)
            .min()
    }

    /// Guaranteed bit rate summed over the channels carrying `direction`, bit/s
    pub fn guaranteed_bitrate(&self, rnti: Rnti, direction: Direction) -> u64 {
        self.flows_of(rnti)
            .filter(|(_, r)| r.config.direction.carries(direction))
            .map(|(_, r)| match direction {
                Direction::Downlink => r.config.gbr_dl,
                Direction::Uplink => r.config.gbr_ul,
            })
            .sum()
    }

    /// Sum of the maximum bit rates of a UE's channels in one direction
    pub fn maximum_bitrate(&self, rnti: Rnti, direction: Direction) -> u64 {
        self.flows_of(rnti)
            .filter(|(_, r)| r.config.direction.carries(direction))
            .map(|(_, r)| match direction {
                Direction::Downlink => r.config.mbr_dl,
                Direction::Uplink => r.config.mbr_ul,
            })
            .sum()
    }

    pub fn flow(&self, rnti: Rnti, lcid: Lcid) -> Option<&FlowRecord> {
        self.flows.get(&FlowId::new(rnti, lcid))
    }

    /// Count bytes granted to a UE in the current TTI
    pub fn record_transmission(&mut self, rnti: Rnti, direction: Direction, bytes: u32) {
        let stats = self.throughput.entry((rnti, direction)).or_default();
        stats.last_tti_bytes += bytes;
    }

    /// Close the TTI for one direction: fold granted bytes into the averages
    pub fn end_tti(&mut self, direction: Direction) {
        let window = self.time_window;
        for ((_, d), stats) in self.throughput.iter_mut() {
            if *d == direction {
                stats.end_tti(window);
            }
        }
    }

    /// Averaged throughput in bytes/s
    pub fn past_average(&self, rnti: Rnti, direction: Direction) -> f64 {
        self.throughput
            .get(&(rnti, direction))
            .map(|s| s.past_average)
            .unwrap_or(1.0)
    }

    pub fn throughput(&self, rnti: Rnti, direction: Direction) -> Option<&ThroughputStats> {
        self.throughput.get(&(rnti, direction))
    }

    fn flows_of(&self, rnti: Rnti) -> impl Iterator<Item = (&FlowId, &FlowRecord)> {
        self.flows
            .range(FlowId::new(rnti, Lcid::MIN)..=FlowId::new(rnti, Lcid::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lc(lcid: Lcid, priority: u8) -> LogicalChannelConfig {
        LogicalChannelConfig {
            priority,
            ..LogicalChannelConfig::best_effort(lcid)
        }
    }

    #[test]
    fn test_rlc_report_overwrites() {
        let mut state = UeFlowState::new(99.0);
        state.update_rlc_buffer_req(1, 3, 500, 0, 0, 10);
        state.update_rlc_buffer_req(1, 3, 200, 0, 0, 4);
        assert_eq!(state.flow(1, 3).unwrap().tx_queue, 200);
        assert_eq!(state.lc_active_per_flow(1), 1);
    }

    #[test]
    fn test_lc_active_counts_only_nonempty_queues() {
        let mut state = UeFlowState::new(99.0);
        state.configure_lc(1, lc(3, 5));
        state.configure_lc(1, lc(4, 5));
        state.update_rlc_buffer_req(1, 3, 100, 0, 0, 0);
        state.update_rlc_buffer_req(2, 3, 100, 0, 0, 0);
        assert_eq!(state.lc_active_per_flow(1), 1);
        state.update_rlc_buffer_req(1, 4, 0, 0, 20, 0);
        assert_eq!(state.lc_active_per_flow(1), 2);
    }

    #[test]
    fn test_active_flows_priority_order() {
        let mut state = UeFlowState::new(99.0);
        state.configure_lc(1, lc(3, 9));
        state.configure_lc(1, lc(4, 2));
        state.update_rlc_buffer_req(1, 3, 10, 0, 0, 0);
        state.update_rlc_buffer_req(1, 4, 10, 0, 0, 0);
        let order: Vec<Lcid> = state.active_flows(1).iter().map(|(l, _)| *l).collect();
        assert_eq!(order, vec![4, 3]);
        assert_eq!(state.highest_priority(1, Direction::Downlink), Some(2));
    }

    #[test]
    fn test_consume_dl_drains_status_then_retx_then_tx() {
        let mut state = UeFlowState::new(99.0);
        state.update_rlc_buffer_req(1, 3, 100, 50, 10, 0);
        let drained = state.consume_dl(1, 3, 72);
        assert_eq!(drained, 70);
        let flow = state.flow(1, 3).unwrap();
        assert_eq!((flow.status_pdu, flow.retx_queue, flow.tx_queue), (0, 0, 90));
    }

    #[test]
    fn test_bsr_per_lcg_overwrite_and_sum() {
        let mut state = UeFlowState::new(99.0);
        state.add_ue(1);
        state.update_bsr(1, 0, 10); // 42 bytes
        state.update_bsr(1, 1, 20); // 200 bytes
        assert_eq!(state.ul_buffer_bytes(1), 242);
        state.update_bsr(1, 0, 1);
        assert_eq!(state.ul_buffer_bytes(1), 210);
        state.consume_ul(1, 100);
        assert_eq!(state.ul_buffer_bytes(1), 110);
    }

    #[test]
    fn test_remove_ue_purges_everything() {
        let mut state = UeFlowState::new(99.0);
        state.add_ue(1);
        state.add_ue(2);
        state.update_rlc_buffer_req(1, 3, 100, 0, 0, 0);
        state.update_rlc_buffer_req(2, 3, 100, 0, 0, 0);
        state.update_bsr(1, 0, 30);
        state.remove_ue(1);
        assert_eq!(state.lc_active_per_flow(1), 0);
        assert_eq!(state.ul_buffer_bytes(1), 0);
        assert!(state.throughput(1, Direction::Downlink).is_none());
        assert_eq!(state.lc_active_per_flow(2), 1);
    }

    #[test]
    fn test_throughput_window() {
        let mut state = UeFlowState::new(2.0);
        state.add_ue(1);
        state.record_transmission(1, Direction::Downlink, 10);
        state.end_tti(Direction::Downlink);
        // (1 - 1/2) * 1.0 + (1/2) * 10 / 0.001
        assert!((state.past_average(1, Direction::Downlink) - 5000.5).abs() < 1e-6);
        assert_eq!(state.past_average(1, Direction::Uplink), 1.0);
    }
}
