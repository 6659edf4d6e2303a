/*!
 * HARQ Process
 * One retransmittable transport block attempt
 */

use crate::core::{HarqProcessId, RlcPdu};
use serde::{Deserialize, Serialize};

/// Process status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HarqStatus {
    Free,
    /// Transport block in flight, sent `transmissions` times so far
    Active { transmissions: u8 },
}

/// HARQ process slot
///
/// `D` is the grant descriptor buffered for retransmission (DL or UL DCI).
/// RLC PDUs are stored per logical channel, then per layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarqProcess<D> {
    pub id: HarqProcessId,
    pub status: HarqStatus,
    /// TTIs since the last (re)transmission
    pub timer: u32,
    /// NACK received, waiting for resources
    pub awaiting_retx: bool,
    /// Layers reported as NACK; empty means every layer
    pub nacked_layers: Vec<bool>,
    pub dci: Option<D>,
    pub rlc_pdus: Vec<Vec<RlcPdu>>,
}

impl<D> HarqProcess<D> {
    pub fn new(id: HarqProcessId) -> Self {
        Self {
            id,
            status: HarqStatus::Free,
            timer: 0,
            awaiting_retx: false,
            nacked_layers: Vec::new(),
            dci: None,
            rlc_pdus: Vec::new(),
        }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.status == HarqStatus::Free
    }

    #[inline]
    pub fn transmissions(&self) -> u8 {
        match self.status {
            HarqStatus::Free => 0,
            HarqStatus::Active { transmissions } => transmissions,
        }
    }

    /// Whether `layer` must be resent on the next retransmission
    pub fn layer_nacked(&self, layer: usize) -> bool {
        self.nacked_layers.is_empty() || self.nacked_layers.get(layer).copied().unwrap_or(false)
    }

    /// Back to FREE with every buffer cleared
    pub(super) fn reset(&mut self) {
        self.status = HarqStatus::Free;
        self.timer = 0;
        self.awaiting_retx = false;
        self.nacked_layers.clear();
        self.dci = None;
        self.rlc_pdus.clear();
    }

    pub(super) fn activate(&mut self, dci: D, rlc_pdus: Vec<Vec<RlcPdu>>) {
        let transmissions = self.transmissions().saturating_add(1);
        self.status = HarqStatus::Active { transmissions };
        self.timer = 0;
        self.awaiting_retx = false;
        self.nacked_layers.clear();
        self.dci = Some(dci);
        self.rlc_pdus = rlc_pdus;
    }
}
