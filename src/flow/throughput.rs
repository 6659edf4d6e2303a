/*!
 * Throughput History
 * Exponentially averaged per-UE throughput used by fairness metrics
 */

use crate::core::limits::TTI_SECONDS;
use serde::{Deserialize, Serialize};

/// Throughput bookkeeping of one UE in one direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputStats {
    /// Averaged throughput in bytes/s
    pub past_average: f64,
    /// Bytes granted during the current TTI
    pub last_tti_bytes: u32,
    pub total_bytes: u64,
}

impl Default for ThroughputStats {
    fn default() -> Self {
        // Non-zero start keeps the PF ratio finite for a fresh UE
        Self {
            past_average: 1.0,
            last_tti_bytes: 0,
            total_bytes: 0,
        }
    }
}

impl ThroughputStats {
    /// Fold the current TTI into the average over `window` TTIs
    pub fn end_tti(&mut self, window: f64) {
        let instant = self.last_tti_bytes as f64 / TTI_SECONDS;
        self.past_average = (1.0 - 1.0 / window) * self.past_average + (1.0 / window) * instant;
        self.total_bytes += self.last_tti_bytes as u64;
        self.last_tti_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_converges_to_constant_rate() {
        let mut stats = ThroughputStats::default();
        for _ in 0..2000 {
            stats.last_tti_bytes = 100;
            stats.end_tti(99.0);
        }
        assert!((stats.past_average - 100_000.0).abs() < 1.0);
        assert_eq!(stats.total_bytes, 200_000);
    }

    #[test]
    fn test_idle_tti_decays_average() {
        let mut stats = ThroughputStats {
            past_average: 1000.0,
            ..Default::default()
        };
        stats.end_tti(10.0);
        assert!((stats.past_average - 900.0).abs() < 1e-9);
    }
}
