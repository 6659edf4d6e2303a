/*!
 * Control Information Descriptors
 * DL/UL grant descriptors buffered by HARQ and emitted to the MAC
 */

use super::types::{HarqProcessId, Lcid, Mcs, Rnti};
use serde::{Deserialize, Serialize};

/// Downlink control information (format 1/2 style, RBG bitmap allocation)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlDci {
    pub rnti: Rnti,
    /// Bit `i` set when RBG `i` carries this TB
    pub rbg_bitmap: u32,
    pub harq_process: HarqProcessId,
    /// Per-layer values (one entry per spatial layer)
    pub mcs: Vec<Mcs>,
    pub tb_size: Vec<u32>,
    pub ndi: Vec<u8>,
    pub rv: Vec<u8>,
    pub tpc: u8,
}

impl DlDci {
    /// RBG indexes set in the bitmap, ascending
    pub fn rbgs(&self) -> Vec<usize> {
        (0..32).filter(|i| self.rbg_bitmap & (1 << i) != 0).collect()
    }

    pub fn layers(&self) -> usize {
        self.tb_size.len()
    }

    /// Retransmission of `layer`: NDI 0, next redundancy version
    pub fn bump_redundancy_version(&mut self, layer: usize, cycle: u8) {
        if let Some(ndi) = self.ndi.get_mut(layer) {
            *ndi = 0;
        }
        if let Some(rv) = self.rv.get_mut(layer) {
            *rv = (*rv + 1) % cycle;
        }
    }

    /// Empty TB on `layer` (already decoded by the UE)
    pub fn clear_layer(&mut self, layer: usize) {
        for field in [&mut self.ndi, &mut self.rv, &mut self.mcs] {
            if let Some(value) = field.get_mut(layer) {
                *value = 0;
            }
        }
        if let Some(tb) = self.tb_size.get_mut(layer) {
            *tb = 0;
        }
    }

    /// Bitmap with the given RBGs set
    pub fn bitmap_of(rbgs: &[usize]) -> u32 {
        rbgs.iter().fold(0u32, |acc, &i| acc | (1 << i))
    }
}

/// Uplink control information (format 0, contiguous RB allocation)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UlDci {
    pub rnti: Rnti,
    pub rb_start: u16,
    pub rb_len: u16,
    pub harq_process: HarqProcessId,
    pub mcs: Mcs,
    pub tb_size: u32,
    pub ndi: u8,
    pub tpc: u8,
    pub cqi_request: bool,
}

/// One RLC PDU placed in a TB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlcPdu {
    pub lcid: Lcid,
    pub size: u32,
}

/// Descriptor a HARQ process can buffer for retransmission
pub trait HarqDescriptor: Clone + std::fmt::Debug {
    /// Bytes carried by the buffered TB(s)
    fn tb_bytes(&self) -> u32;
}

impl HarqDescriptor for DlDci {
    fn tb_bytes(&self) -> u32 {
        self.tb_size.iter().sum()
    }
}

impl HarqDescriptor for UlDci {
    fn tb_bytes(&self) -> u32 {
        self.tb_size
    }
}
