/*!
 * Candidate Entries
 * UEs eligible for new data in one TTI, with their ranking metric
 */

use crate::core::{Cqi, Rnti};
use std::cmp::Ordering;

/// UE competing for new-data resources this TTI
#[derive(Debug, Clone)]
pub(super) struct Candidate {
    pub rnti: Rnti,
    pub metric: f64,
    /// DL: CQI per layer; UL: single value
    pub cqi: Vec<Cqi>,
    /// Valid subband CQI per RBG (DL only)
    pub subband: Option<Vec<Cqi>>,
    /// Bytes needed to empty the UE's queues
    pub demand: u32,
}

impl Candidate {
    /// Ranking order: higher metric first, lowest RNTI on ties
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .metric
            .total_cmp(&self.metric)
            .then_with(|| self.rnti.cmp(&other.rnti))
    }
}

/// Sort candidates into service order
pub(super) fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(Candidate::rank_cmp);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(rnti: Rnti, metric: f64) -> Candidate {
        Candidate {
            rnti,
            metric,
            cqi: vec![10],
            subband: None,
            demand: 100,
        }
    }

    #[test]
    fn test_rank_by_metric_then_rnti() {
        let mut c = vec![
            candidate(5, 1.0),
            candidate(2, 3.0),
            candidate(4, 1.0),
            candidate(1, 0.5),
        ];
        rank(&mut c);
        let order: Vec<Rnti> = c.iter().map(|c| c.rnti).collect();
        assert_eq!(order, vec![2, 4, 5, 1]);
    }
}
