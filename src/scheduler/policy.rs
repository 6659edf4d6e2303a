/*!
 * Scheduling Metrics
 * The one part of the engine that varies per policy: how candidates are ranked
 */

use crate::config::PolicyKind;
use crate::core::limits::MAX_LC_PRIORITY;
use crate::core::{Amc, Cqi, Direction, Rnti};
use std::fmt::Debug;

/// What a metric may look at for one candidate
#[derive(Debug, Clone, Copy)]
pub struct MetricInput<'a> {
    pub rnti: Rnti,
    pub direction: Direction,
    /// Wideband CQI (first layer) or UL CQI
    pub cqi: Cqi,
    /// Wideband CQI of every usable layer
    pub layer_cqi: &'a [Cqi],
    /// Per-RBG CQI when a valid subband report exists (DL only)
    pub subband: Option<&'a [Cqi]>,
    /// RBs of one allocation unit (RBG in DL)
    pub unit_rbs: u32,
    /// Averaged throughput, bytes/s
    pub past_average: f64,
    /// Best LC priority (1 = highest)
    pub priority: Option<u8>,
    /// Guaranteed bit rate, bit/s
    pub gbr_bps: u64,
    /// Position in the round-robin rotation (0 = next to serve)
    pub rr_position: usize,
    /// Token-bank counter over generation rate (DL)
    pub token_ratio: f64,
    pub amc: &'a Amc,
}

impl MetricInput<'_> {
    fn rate(&self, cqi: Cqi) -> f64 {
        self.amc.achievable_rate(self.direction, cqi, self.unit_rbs)
    }

    fn wideband_rate(&self) -> f64 {
        self.rate(self.cqi)
    }
}

/// Ranking strategy injected into the scheduling engine
///
/// Higher values are served first; equal values fall back to the lowest RNTI.
pub trait SchedulingMetric: Debug + Send + Sync {
    fn kind(&self) -> PolicyKind;

    fn metric(&self, input: &MetricInput<'_>) -> f64;
}

/// Serve in rotation order; the head of the rotation ranks first
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobinMetric;

impl SchedulingMetric for RoundRobinMetric {
    fn kind(&self) -> PolicyKind {
        PolicyKind::RoundRobin
    }

    fn metric(&self, input: &MetricInput<'_>) -> f64 {
        -(input.rr_position as f64)
    }
}

/// Achievable rate over past average throughput
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalFairMetric;

impl SchedulingMetric for ProportionalFairMetric {
    fn kind(&self) -> PolicyKind {
        PolicyKind::ProportionalFair
    }

    fn metric(&self, input: &MetricInput<'_>) -> f64 {
        input.wideband_rate() / input.past_average.max(f64::EPSILON)
    }
}

/// LC priority class first, GBR deficit inside a class
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityMetric;

impl PriorityMetric {
    /// Weight of one priority class; deficits are capped below it
    const CLASS_WEIGHT: f64 = 1000.0;
}

impl SchedulingMetric for PriorityMetric {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Priority
    }

    fn metric(&self, input: &MetricInput<'_>) -> f64 {
        let priority = input.priority.unwrap_or(MAX_LC_PRIORITY).min(MAX_LC_PRIORITY);
        let class = (MAX_LC_PRIORITY + 1 - priority) as f64;
        let deficit = if input.gbr_bps > 0 {
            (input.gbr_bps as f64 / 8.0) / input.past_average.max(1.0)
        } else {
            0.0
        };
        class * Self::CLASS_WEIGHT + deficit.min(Self::CLASS_WEIGHT - 1.0)
    }
}

/// Best subband rate over wideband rate
#[derive(Debug, Clone, Copy, Default)]
pub struct ThroughputToAverageMetric;

impl SchedulingMetric for ThroughputToAverageMetric {
    fn kind(&self) -> PolicyKind {
        PolicyKind::ThroughputToAverage
    }

    fn metric(&self, input: &MetricInput<'_>) -> f64 {
        let wideband = input.wideband_rate();
        if wideband <= 0.0 {
            return 0.0;
        }
        let best = input
            .subband
            .and_then(|s| s.iter().copied().max())
            .map(|cqi| input.rate(cqi))
            .unwrap_or(wideband);
        best / wideband
    }
}

/// Wideband achievable rate
#[derive(Debug, Clone, Copy, Default)]
pub struct FdMaxThroughputMetric;

impl SchedulingMetric for FdMaxThroughputMetric {
    fn kind(&self) -> PolicyKind {
        PolicyKind::FdMaxThroughput
    }

    fn metric(&self, input: &MetricInput<'_>) -> f64 {
        input.wideband_rate()
    }
}

/// Achievable rate summed over the spatial layers
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxThroughputMetric;

impl SchedulingMetric for MaxThroughputMetric {
    fn kind(&self) -> PolicyKind {
        PolicyKind::MaxThroughput
    }

    fn metric(&self, input: &MetricInput<'_>) -> f64 {
        if input.layer_cqi.is_empty() {
            return input.wideband_rate();
        }
        input.layer_cqi.iter().map(|&cqi| input.rate(cqi)).sum()
    }
}

/// Largest bank deposit relative to the token rate; UL rotates like RR
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenBankMetric;

impl SchedulingMetric for TokenBankMetric {
    fn kind(&self) -> PolicyKind {
        PolicyKind::TokenBankFairQueue
    }

    fn metric(&self, input: &MetricInput<'_>) -> f64 {
        match input.direction {
            Direction::Downlink => input.token_ratio,
            Direction::Uplink => -(input.rr_position as f64),
        }
    }
}

/// Fixed ascending RNTI order
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationMetric;

impl SchedulingMetric for CalibrationMetric {
    fn kind(&self) -> PolicyKind {
        PolicyKind::ThreeGppCalibration
    }

    fn metric(&self, input: &MetricInput<'_>) -> f64 {
        -(input.rnti as f64)
    }
}

/// Metric implementing `kind`
pub fn metric_for(kind: PolicyKind) -> Box<dyn SchedulingMetric> {
    match kind {
        PolicyKind::RoundRobin => Box::new(RoundRobinMetric),
        PolicyKind::ProportionalFair => Box::new(ProportionalFairMetric),
        PolicyKind::Priority => Box::new(PriorityMetric),
        PolicyKind::ThroughputToAverage => Box::new(ThroughputToAverageMetric),
        PolicyKind::FdMaxThroughput => Box::new(FdMaxThroughputMetric),
        PolicyKind::ThreeGppCalibration => Box::new(CalibrationMetric),
        PolicyKind::MaxThroughput => Box::new(MaxThroughputMetric),
        PolicyKind::TokenBankFairQueue => Box::new(TokenBankMetric),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(amc: &Amc) -> MetricInput<'_> {
        MetricInput {
            rnti: 1,
            direction: Direction::Downlink,
            cqi: 10,
            layer_cqi: &[10],
            subband: None,
            unit_rbs: 2,
            past_average: 1000.0,
            priority: None,
            gbr_bps: 0,
            rr_position: 0,
            token_ratio: 0.0,
            amc,
        }
    }

    #[test]
    fn test_metric_for_matches_kind() {
        for kind in PolicyKind::ALL {
            assert_eq!(metric_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_pf_prefers_starved_ue() {
        let amc = Amc::default();
        let starved = MetricInput {
            past_average: 10.0,
            ..input(&amc)
        };
        let served = MetricInput {
            past_average: 100_000.0,
            ..input(&amc)
        };
        let pf = ProportionalFairMetric;
        assert!(pf.metric(&starved) > pf.metric(&served));
    }

    #[test]
    fn test_priority_class_dominates_deficit() {
        let amc = Amc::default();
        let high = MetricInput {
            priority: Some(2),
            ..input(&amc)
        };
        let low_starved = MetricInput {
            priority: Some(3),
            gbr_bps: 10_000_000,
            past_average: 1.0,
            ..input(&amc)
        };
        let m = PriorityMetric;
        assert!(m.metric(&high) > m.metric(&low_starved));

        let low_ok = MetricInput {
            priority: Some(3),
            ..input(&amc)
        };
        assert!(m.metric(&low_starved) > m.metric(&low_ok));
    }

    #[test]
    fn test_tta_uses_best_subband() {
        let amc = Amc::default();
        let subband = [4, 15, 7];
        let with_subband = MetricInput {
            subband: Some(&subband),
            ..input(&amc)
        };
        let tta = ThroughputToAverageMetric;
        assert!(tta.metric(&with_subband) > 1.0);
        assert_eq!(tta.metric(&input(&amc)), 1.0);
    }

    #[test]
    fn test_rotation_and_calibration_orders() {
        let amc = Amc::default();
        let first = MetricInput {
            rr_position: 0,
            ..input(&amc)
        };
        let third = MetricInput {
            rr_position: 2,
            ..input(&amc)
        };
        assert!(RoundRobinMetric.metric(&first) > RoundRobinMetric.metric(&third));

        let low = MetricInput { rnti: 3, ..input(&amc) };
        let high = MetricInput { rnti: 9, ..input(&amc) };
        assert!(CalibrationMetric.metric(&low) > CalibrationMetric.metric(&high));
    }

    #[test]
    fn test_max_throughput_counts_every_layer() {
        let amc = Amc::default();
        let two_layers = MetricInput {
            layer_cqi: &[10, 7],
            ..input(&amc)
        };
        let mt = MaxThroughputMetric;
        assert!(mt.metric(&two_layers) > mt.metric(&input(&amc)));
        assert_eq!(mt.metric(&input(&amc)), FdMaxThroughputMetric.metric(&input(&amc)));
    }

    #[test]
    fn test_token_bank_ranks_by_deposit_in_downlink_only() {
        let amc = Amc::default();
        let rich = MetricInput {
            token_ratio: 0.5,
            ..input(&amc)
        };
        let poor = MetricInput {
            token_ratio: -0.2,
            ..input(&amc)
        };
        assert!(TokenBankMetric.metric(&rich) > TokenBankMetric.metric(&poor));

        let ul_head = MetricInput {
            direction: Direction::Uplink,
            token_ratio: -1.0,
            ..input(&amc)
        };
        let ul_tail = MetricInput {
            direction: Direction::Uplink,
            rr_position: 3,
            token_ratio: 1.0,
            ..input(&amc)
        };
        assert!(TokenBankMetric.metric(&ul_head) > TokenBankMetric.metric(&ul_tail));
    }
}
