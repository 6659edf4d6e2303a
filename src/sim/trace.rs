/*!
 * Allocation Traces
 * Per-TTI scheduler output, bincode-encoded for byte-level comparison
 */

use crate::core::{Rnti, SchedResult, SchedulerError, SfnSf};
use crate::sap::{DlConfigInd, UlConfigInd};
use crate::scheduler::SchedulerStats;
use serde::{Deserialize, Serialize};

/// Indications produced by one TTI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtiRecord {
    pub tti: u32,
    pub sfn_sf: SfnSf,
    pub dl: DlConfigInd,
    pub ul: UlConfigInd,
}

impl TtiRecord {
    /// New-data bytes granted to `rnti` in this TTI, (DL, UL)
    pub fn new_bytes_of(&self, rnti: Rnti) -> (u64, u64) {
        let dl = self
            .dl
            .build_data_list
            .iter()
            .filter(|e| e.rnti == rnti && !e.retransmission)
            .map(|e| e.dci.tb_size.iter().map(|&b| b as u64).sum::<u64>())
            .sum();
        let ul = self
            .ul
            .dci_list
            .iter()
            .filter(|d| d.rnti == rnti && d.ndi == 1)
            .map(|d| d.tb_size as u64)
            .sum();
        (dl, ul)
    }
}

/// Ordered TTI records of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationTrace {
    pub records: Vec<TtiRecord>,
}

impl AllocationTrace {
    pub fn push(&mut self, record: TtiRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Compact binary form; equal traces encode to equal bytes
    pub fn encode(&self) -> SchedResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| SchedulerError::Io(e.to_string().into()))
    }

    pub fn decode(bytes: &[u8]) -> SchedResult<Self> {
        bincode::deserialize(bytes).map_err(|e| SchedulerError::Parse(e.to_string().into()))
    }
}

/// Throughput delivered to one UE over a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UeReport {
    pub rnti: Rnti,
    pub dl_bytes: u64,
    pub ul_bytes: u64,
    /// Mean DL throughput, bit/s
    pub dl_bitrate: f64,
    /// Mean UL throughput, bit/s
    pub ul_bitrate: f64,
}

/// Summary printed by the driver binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: String,
    pub ttis: u32,
    pub stats: SchedulerStats,
    pub ues: Vec<UeReport>,
}
