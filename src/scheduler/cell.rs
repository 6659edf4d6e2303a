/*!
 * Cell and UE Contexts
 */

use crate::core::{SchedResult, SchedulerError};
use crate::rbg::{rbg_count, rbg_size};

/// Bandwidth configuration of the carrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellState {
    pub dl_bandwidth: u16,
    pub ul_bandwidth: u16,
    pub rbg_size: u16,
    pub rbg_count: usize,
}

impl CellState {
    pub fn new(dl_bandwidth: u16, ul_bandwidth: u16) -> SchedResult<Self> {
        let size = rbg_size(dl_bandwidth)?;
        // UL is allocated per RB but must respect the same supported range
        rbg_size(ul_bandwidth).map_err(|_| SchedulerError::UnsupportedBandwidth(ul_bandwidth))?;
        Ok(Self {
            dl_bandwidth,
            ul_bandwidth,
            rbg_size: size,
            rbg_count: rbg_count(dl_bandwidth)?,
        })
    }

    /// RBs inside RBG `rbg` (the last RBG may be shorter)
    pub fn rbs_in_rbg(&self, rbg: usize) -> u32 {
        let start = rbg as u32 * self.rbg_size as u32;
        (self.dl_bandwidth as u32)
            .saturating_sub(start)
            .min(self.rbg_size as u32)
    }

    pub fn rbs_in(&self, rbgs: &[usize]) -> u32 {
        rbgs.iter().map(|&i| self.rbs_in_rbg(i)).sum()
    }
}

/// Per-UE configuration held by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UeContext {
    pub transmission_mode: u8,
}

impl UeContext {
    /// Spatial layers of the transmission mode (modes 2 and 3 multiplex two)
    pub fn layers(&self) -> usize {
        match self.transmission_mode {
            2 | 3 => 2,
            _ => 1,
        }
    }
}
