/*!
 * HARQ Process Table
 * Allocation, feedback and timeout handling for the processes of every UE
 */

use super::process::HarqProcess;
use crate::core::limits::{HARQ_DISABLED_PROCESS, HARQ_PROC_NUM};
use crate::core::{Direction, HarqDescriptor, HarqProcessId, RlcPdu, Rnti};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Table behaviour for one direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarqConfig {
    pub enabled: bool,
    /// TTIs without feedback before a process is force-freed
    pub timeout: u32,
    /// Transmissions allowed per TB (`None` = unlimited)
    pub max_transmissions: Option<u8>,
}

/// Why a TB was dropped from HARQ bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarqFailureReason {
    Timeout,
    MaxTransmissions,
}

/// TB lost by HARQ; upper layers decide whether to resend it as new data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarqFailure {
    pub rnti: Rnti,
    pub direction: Direction,
    pub process_id: HarqProcessId,
    pub reason: HarqFailureReason,
    pub transmissions: u8,
    pub lost_bytes: u32,
}

/// Result of applying a NACK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NackOutcome {
    /// Process flagged for retransmission
    Retransmit,
    /// Transmission budget exhausted, process freed
    Dropped(HarqFailure),
    /// No active process for this feedback (timed out or UE unknown)
    Stale,
}

#[derive(Debug, Clone)]
struct UeProcesses<D> {
    processes: Vec<HarqProcess<D>>,
    /// Last process handed out; searches start after it
    current: HarqProcessId,
}

impl<D> UeProcesses<D> {
    fn new() -> Self {
        Self {
            processes: (0..HARQ_PROC_NUM as HarqProcessId)
                .map(HarqProcess::new)
                .collect(),
            current: 0,
        }
    }

    /// Cyclic search for a free process, starting after `current`
    fn next_free(&self) -> Option<HarqProcessId> {
        (1..=HARQ_PROC_NUM)
            .map(|step| ((self.current as usize + step) % HARQ_PROC_NUM) as HarqProcessId)
            .find(|&id| self.processes[id as usize].is_free())
    }
}

/// Per-UE HARQ processes of one direction
#[derive(Debug, Clone)]
pub struct HarqProcessTable<D> {
    direction: Direction,
    config: HarqConfig,
    ues: BTreeMap<Rnti, UeProcesses<D>>,
}

impl<D: HarqDescriptor> HarqProcessTable<D> {
    pub fn new(direction: Direction, config: HarqConfig) -> Self {
        Self {
            direction,
            config,
            ues: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Create the processes of a UE (no-op when already present)
    pub fn add_ue(&mut self, rnti: Rnti) {
        self.ues.entry(rnti).or_insert_with(UeProcesses::new);
    }

    /// Destroy the processes of a UE
    pub fn remove_ue(&mut self, rnti: Rnti) -> bool {
        self.ues.remove(&rnti).is_some()
    }

    pub fn contains(&self, rnti: Rnti) -> bool {
        self.ues.contains_key(&rnti)
    }

    pub fn process(&self, rnti: Rnti, id: HarqProcessId) -> Option<&HarqProcess<D>> {
        self.ues.get(&rnti)?.processes.get(id as usize)
    }

    /// Whether a new TB could get a process this TTI (does not claim it)
    pub fn has_free_process(&self, rnti: Rnti) -> bool {
        if !self.config.enabled {
            return self.ues.contains_key(&rnti);
        }
        self.ues
            .get(&rnti)
            .map(|ue| ue.next_free().is_some())
            .unwrap_or(false)
    }

    /// Return a free process id for a new TB, or `None` if all 8 are busy
    pub fn allocate_or_reuse_process(&mut self, rnti: Rnti) -> Option<HarqProcessId> {
        let ue = self.ues.get_mut(&rnti)?;
        if !self.config.enabled {
            return Some(HARQ_DISABLED_PROCESS);
        }
        let id = ue.next_free()?;
        ue.current = id;
        Some(id)
    }

    /// Store the outgoing grant and count one more transmission
    pub fn mark_active(
        &mut self,
        rnti: Rnti,
        id: HarqProcessId,
        dci: D,
        rlc_pdus: Vec<Vec<RlcPdu>>,
    ) -> bool {
        if !self.config.enabled {
            return true;
        }
        match self.slot_mut(rnti, id) {
            Some(process) => {
                process.activate(dci, rlc_pdus);
                true
            }
            None => false,
        }
    }

    /// Re-send a NACKed TB with an updated grant; the buffered RLC PDUs are kept
    pub fn mark_retransmitted(&mut self, rnti: Rnti, id: HarqProcessId, dci: D) -> bool {
        match self.slot_mut(rnti, id) {
            Some(process) if !process.is_free() => {
                let pdus = std::mem::take(&mut process.rlc_pdus);
                process.activate(dci, pdus);
                true
            }
            _ => false,
        }
    }

    /// ACK: process back to FREE, buffers dropped
    pub fn mark_acknowledged(&mut self, rnti: Rnti, id: HarqProcessId) -> bool {
        match self.slot_mut(rnti, id) {
            Some(process) => {
                process.reset();
                true
            }
            None => false,
        }
    }

    /// NACK on every layer: flag for retransmission unless the transmission budget is spent
    pub fn mark_nack(&mut self, rnti: Rnti, id: HarqProcessId) -> NackOutcome {
        self.mark_nack_layers(rnti, id, Vec::new())
    }

    /// NACK on the layers set in `nacked` (empty = all); decoded layers are not resent
    pub fn mark_nack_layers(
        &mut self,
        rnti: Rnti,
        id: HarqProcessId,
        nacked: Vec<bool>,
    ) -> NackOutcome {
        let direction = self.direction;
        let max_transmissions = self.config.max_transmissions;
        let Some(process) = self.slot_mut(rnti, id) else {
            return NackOutcome::Stale;
        };
        if process.is_free() {
            return NackOutcome::Stale;
        }

        let transmissions = process.transmissions();
        if max_transmissions.is_some_and(|max| transmissions >= max) {
            let failure = HarqFailure {
                rnti,
                direction,
                process_id: id,
                reason: HarqFailureReason::MaxTransmissions,
                transmissions,
                lost_bytes: process.dci.as_ref().map(|d| d.tb_bytes()).unwrap_or(0),
            };
            process.reset();
            info!(rnti, process = id, %direction, transmissions, "max HARQ transmissions reached, dropping TB");
            return NackOutcome::Dropped(failure);
        }

        process.awaiting_retx = true;
        process.nacked_layers = nacked;
        NackOutcome::Retransmit
    }

    /// Advance one TTI: age ACTIVE processes and free those reaching the timeout
    pub fn tick(&mut self) -> Vec<HarqFailure> {
        let mut failures = Vec::new();
        if !self.config.enabled {
            return failures;
        }

        for (&rnti, ue) in self.ues.iter_mut() {
            for process in ue.processes.iter_mut().filter(|p| !p.is_free()) {
                process.timer += 1;
                if process.timer >= self.config.timeout {
                    failures.push(HarqFailure {
                        rnti,
                        direction: self.direction,
                        process_id: process.id,
                        reason: HarqFailureReason::Timeout,
                        transmissions: process.transmissions(),
                        lost_bytes: process.dci.as_ref().map(|d| d.tb_bytes()).unwrap_or(0),
                    });
                    debug!(rnti, process = process.id, direction = %self.direction, "HARQ timeout, process reset");
                    process.reset();
                }
            }
        }

        failures
    }

    /// Processes waiting for a retransmission, RNTI then process id order
    pub fn pending_retransmissions(&self) -> Vec<(Rnti, HarqProcessId)> {
        self.ues
            .iter()
            .flat_map(|(&rnti, ue)| {
                ue.processes
                    .iter()
                    .filter(|p| p.awaiting_retx && !p.is_free())
                    .map(move |p| (rnti, p.id))
            })
            .collect()
    }

    /// Number of ACTIVE processes of a UE
    pub fn active_count(&self, rnti: Rnti) -> usize {
        self.ues
            .get(&rnti)
            .map(|ue| ue.processes.iter().filter(|p| !p.is_free()).count())
            .unwrap_or(0)
    }

    fn slot_mut(&mut self, rnti: Rnti, id: HarqProcessId) -> Option<&mut HarqProcess<D>> {
        self.ues.get_mut(&rnti)?.processes.get_mut(id as usize)
    }
}
