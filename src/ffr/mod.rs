/*!
 * Frequency Reuse
 * Masks applied by an external reuse algorithm before and during scheduling
 */

use crate::core::Rnti;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Frequency (fractional) reuse hooks consulted by the scheduler
///
/// Cell-wide masks are applied to the allocation maps before any UE is
/// served; per-UE checks filter the entries a given UE may claim.
pub trait FrequencyReuse: Debug + Send + Sync {
    /// DL RBGs excluded this TTI (`true` = reserved)
    fn dl_reserved_rbgs(&self, rbgs: usize) -> Vec<bool>;

    /// UL RBs excluded this TTI (`true` = reserved)
    fn ul_reserved_rbs(&self, rbs: usize) -> Vec<bool>;

    fn is_dl_rbg_available_for_ue(&self, rbg: usize, rnti: Rnti) -> bool;

    fn is_ul_rb_available_for_ue(&self, rb: usize, rnti: Rnti) -> bool;
}

/// Every RBG and RB open to every UE
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFrequencyReuse;

impl FrequencyReuse for NoFrequencyReuse {
    fn dl_reserved_rbgs(&self, rbgs: usize) -> Vec<bool> {
        vec![false; rbgs]
    }

    fn ul_reserved_rbs(&self, rbs: usize) -> Vec<bool> {
        vec![false; rbs]
    }

    fn is_dl_rbg_available_for_ue(&self, _rbg: usize, _rnti: Rnti) -> bool {
        true
    }

    fn is_ul_rb_available_for_ue(&self, _rb: usize, _rnti: Rnti) -> bool {
        true
    }
}

/// Fixed reuse pattern
///
/// `dl_reserved` / `ul_reserved` list indexes closed to the whole cell.
/// UEs found in `dl_ue_masks` / `ul_ue_masks` may only use the listed indexes
/// (cell-edge sub-band); other UEs use everything not reserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFrequencyReuse {
    pub dl_reserved: Vec<usize>,
    pub ul_reserved: Vec<usize>,
    pub dl_ue_masks: BTreeMap<Rnti, Vec<usize>>,
    pub ul_ue_masks: BTreeMap<Rnti, Vec<usize>>,
}

impl StaticFrequencyReuse {
    fn mask(len: usize, reserved: &[usize]) -> Vec<bool> {
        let mut mask = vec![false; len];
        for &i in reserved.iter().filter(|&&i| i < len) {
            mask[i] = true;
        }
        mask
    }

    fn allowed(masks: &BTreeMap<Rnti, Vec<usize>>, index: usize, rnti: Rnti) -> bool {
        masks
            .get(&rnti)
            .map_or(true, |allowed| allowed.contains(&index))
    }
}

impl FrequencyReuse for StaticFrequencyReuse {
    fn dl_reserved_rbgs(&self, rbgs: usize) -> Vec<bool> {
        Self::mask(rbgs, &self.dl_reserved)
    }

    fn ul_reserved_rbs(&self, rbs: usize) -> Vec<bool> {
        Self::mask(rbs, &self.ul_reserved)
    }

    fn is_dl_rbg_available_for_ue(&self, rbg: usize, rnti: Rnti) -> bool {
        Self::allowed(&self.dl_ue_masks, rbg, rnti)
    }

    fn is_ul_rb_available_for_ue(&self, rb: usize, rnti: Rnti) -> bool {
        Self::allowed(&self.ul_ue_masks, rb, rnti)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_reuse_opens_everything() {
        let ffr = NoFrequencyReuse;
        assert_eq!(ffr.dl_reserved_rbgs(3), vec![false; 3]);
        assert!(ffr.is_ul_rb_available_for_ue(40, 7));
    }

    #[test]
    fn test_static_masks() {
        let ffr = StaticFrequencyReuse {
            dl_reserved: vec![0, 5, 99],
            dl_ue_masks: BTreeMap::from([(2, vec![3, 4])]),
            ..Default::default()
        };
        assert_eq!(
            ffr.dl_reserved_rbgs(6),
            vec![true, false, false, false, false, true]
        );
        assert!(ffr.is_dl_rbg_available_for_ue(1, 1));
        assert!(!ffr.is_dl_rbg_available_for_ue(1, 2));
        assert!(ffr.is_dl_rbg_available_for_ue(4, 2));
    }
}
