/*!
 * RBG Allocation Map
 * One entry per assignable unit: free, reserved by frequency reuse, or claimed by a UE
 */

use crate::core::limits::TYPE0_ALLOCATION_RBG;
use crate::core::{Rnti, SchedResult, SchedulerError};
use serde::{Deserialize, Serialize};

/// Ownership of one RBG (DL) or RB (UL) within a TTI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "rnti", rename_all = "snake_case")]
pub enum RbgState {
    Free,
    Reserved,
    Claimed(Rnti),
}

/// RBs per RBG for a bandwidth of `bandwidth_rbs` (type 0 allocation)
///
/// 1 below 10 RBs, 2 below 26, 3 below 63, 4 below 110.
pub fn rbg_size(bandwidth_rbs: u16) -> SchedResult<u16> {
    TYPE0_ALLOCATION_RBG
        .iter()
        .position(|&threshold| bandwidth_rbs < threshold)
        .filter(|_| bandwidth_rbs > 0)
        .map(|i| i as u16 + 1)
        .ok_or(SchedulerError::UnsupportedBandwidth(bandwidth_rbs))
}

/// RBGs in a bandwidth of `bandwidth_rbs` (the last one may be partial)
pub fn rbg_count(bandwidth_rbs: u16) -> SchedResult<usize> {
    let size = rbg_size(bandwidth_rbs)?;
    Ok(bandwidth_rbs.div_ceil(size) as usize)
}

/// Allocation bitmap of one direction for the TTI being scheduled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RbgAllocationMap {
    entries: Vec<RbgState>,
}

impl RbgAllocationMap {
    pub fn new(len: usize) -> Self {
        Self {
            entries: vec![RbgState::Free; len],
        }
    }

    /// Fresh bitmap of `len` free entries
    pub fn reset(&mut self, len: usize) {
        self.entries.clear();
        self.entries.resize(len, RbgState::Free);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exclude an entry from this TTI; claimed entries keep their owner
    pub fn mark_reserved(&mut self, index: usize) -> bool {
        match self.entries.get_mut(index) {
            Some(entry @ RbgState::Free) => {
                *entry = RbgState::Reserved;
                true
            }
            _ => false,
        }
    }

    /// Claim a free entry for `rnti`; fails when reserved, claimed or out of range
    pub fn try_claim(&mut self, index: usize, rnti: Rnti) -> bool {
        match self.entries.get_mut(index) {
            Some(entry @ RbgState::Free) => {
                *entry = RbgState::Claimed(rnti);
                true
            }
            _ => false,
        }
    }

    /// Give back every entry owned by `rnti`, returns how many were released
    pub fn release_owner(&mut self, rnti: Rnti) -> usize {
        let mut released = 0;
        for entry in self.entries.iter_mut() {
            if *entry == RbgState::Claimed(rnti) {
                *entry = RbgState::Free;
                released += 1;
            }
        }
        released
    }

    #[inline]
    pub fn state(&self, index: usize) -> Option<RbgState> {
        self.entries.get(index).copied()
    }

    #[inline]
    pub fn is_free(&self, index: usize) -> bool {
        self.state(index) == Some(RbgState::Free)
    }

    /// Indexes owned by `rnti`, ascending
    pub fn claimed_by(&self, rnti: Rnti) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| **e == RbgState::Claimed(rnti))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn free_count(&self) -> usize {
        self.entries.iter().filter(|e| **e == RbgState::Free).count()
    }

    pub fn claimed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, RbgState::Claimed(_)))
            .count()
    }

    /// Free indexes, ascending
    pub fn free_indexes(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| **e == RbgState::Free)
            .map(|(i, _)| i)
            .collect()
    }

    /// First run of at least `min_len` free entries, extended up to `max_len`
    pub fn free_run(&self, min_len: usize, max_len: usize) -> Option<(usize, usize)> {
        self.free_run_for(min_len, max_len, |_| true)
    }

    /// Like `free_run`, counting only entries accepted by `usable`
    pub fn free_run_for(
        &self,
        min_len: usize,
        max_len: usize,
        usable: impl Fn(usize) -> bool,
    ) -> Option<(usize, usize)> {
        let open = |i: usize| self.is_free(i) && usable(i);
        let mut start = 0;
        while start < self.entries.len() {
            if !open(start) {
                start += 1;
                continue;
            }
            let mut end = start;
            while end < self.entries.len() && open(end) && end - start < max_len {
                end += 1;
            }
            if end - start >= min_len.max(1) {
                return Some((start, end - start));
            }
            start = end.max(start + 1);
        }
        None
    }

    /// Smallest free run holding at least `len` entries (best fit), returns its start
    pub fn smallest_run_fitting(&self, len: usize) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        let mut i = 0;
        while i < self.entries.len() {
            if !self.is_free(i) {
                i += 1;
                continue;
            }
            let start = i;
            while i < self.entries.len() && self.is_free(i) {
                i += 1;
            }
            let run = i - start;
            if run >= len && best.map_or(true, |(_, b)| run < b) {
                best = Some((start, run));
            }
        }
        best.map(|(start, _)| start)
    }

    pub fn entries(&self) -> &[RbgState] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rbg_size_thresholds() {
        assert_eq!(rbg_size(6).unwrap(), 1);
        assert_eq!(rbg_size(25).unwrap(), 2);
        assert_eq!(rbg_size(50).unwrap(), 3);
        assert_eq!(rbg_size(100).unwrap(), 4);
        assert!(rbg_size(0).is_err());
        assert_eq!(rbg_count(25).unwrap(), 13);
        assert_eq!(rbg_count(50).unwrap(), 17);
    }

    #[test]
    fn test_claim_is_exclusive() {
        let mut map = RbgAllocationMap::new(4);
        assert!(map.try_claim(1, 10));
        assert!(!map.try_claim(1, 11));
        assert!(map.mark_reserved(2));
        assert!(!map.try_claim(2, 11));
        assert!(!map.try_claim(9, 11));
        assert_eq!(map.free_count(), 2);
        assert_eq!(map.claimed_by(10), vec![1]);
    }

    #[test]
    fn test_release_owner_frees_entries() {
        let mut map = RbgAllocationMap::new(5);
        map.try_claim(0, 3);
        map.try_claim(4, 3);
        map.try_claim(2, 4);
        assert_eq!(map.release_owner(3), 2);
        assert_eq!(map.free_indexes(), vec![0, 1, 3, 4]);
        assert_eq!(map.claimed_by(4), vec![2]);
    }

    #[test]
    fn test_reset_clears_reservations() {
        let mut map = RbgAllocationMap::new(3);
        map.mark_reserved(0);
        map.try_claim(1, 1);
        map.reset(6);
        assert_eq!(map.len(), 6);
        assert_eq!(map.free_count(), 6);
    }

    #[test]
    fn test_free_runs() {
        let mut map = RbgAllocationMap::new(12);
        map.mark_reserved(2);
        map.try_claim(7, 1);
        // free: [0,1] [3..=6] [8..=11]
        assert_eq!(map.free_run(3, 10), Some((3, 4)));
        assert_eq!(map.free_run(1, 2), Some((0, 2)));
        assert_eq!(map.free_run(5, 10), None);
        assert_eq!(map.free_run_for(3, 10, |i| i != 4), Some((8, 4)));
        assert_eq!(map.smallest_run_fitting(2), Some(0));
        assert_eq!(map.smallest_run_fitting(3), Some(3));
        assert_eq!(map.smallest_run_fitting(5), None);
    }
}
