/*!
 * Scheduling Policy Selection
 */

use crate::core::limits::DEFAULT_CQI_TIMERS_THRESHOLD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// How a ranked UE is sized once its turn comes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
    /// Remaining resources split evenly among the remaining candidates
    Equal,
    /// Take as much as the demand needs, leftovers go down the ranking
    Greedy,
}

/// Scheduling policy family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolicyKind {
    #[default]
    RoundRobin,
    ProportionalFair,
    /// QoS aware: LC priority class first, GBR deficit second
    Priority,
    ThroughputToAverage,
    FdMaxThroughput,
    /// Fixed RNTI order with equal share, used for calibration runs
    ThreeGppCalibration,
    /// Highest MIMO-aware achievable rate, flows served until satisfied
    MaxThroughput,
    /// Token-bank fair queue: buckets at the MBR, overflow shared through a bank
    TokenBankFairQueue,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 8] = [
        Self::RoundRobin,
        Self::ProportionalFair,
        Self::Priority,
        Self::ThroughputToAverage,
        Self::FdMaxThroughput,
        Self::ThreeGppCalibration,
        Self::MaxThroughput,
        Self::TokenBankFairQueue,
    ];

    /// Parse from string representation
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "round_robin" | "roundrobin" | "rr" => Ok(Self::RoundRobin),
            "proportional_fair" | "pf" => Ok(Self::ProportionalFair),
            "priority" | "prio" | "qos" => Ok(Self::Priority),
            "throughput_to_average" | "tta" => Ok(Self::ThroughputToAverage),
            "fd_max_throughput" | "fdmt" => Ok(Self::FdMaxThroughput),
            "3gpp_calibration" | "3gpp" | "cal" => Ok(Self::ThreeGppCalibration),
            "max_throughput" | "mt" => Ok(Self::MaxThroughput),
            "token_bank_fair_queue" | "fdtbfq" | "tbfq" => Ok(Self::TokenBankFairQueue),
            _ => Err(format!(
                "Invalid policy '{}'. Valid: round_robin, proportional_fair, priority, \
                 throughput_to_average, fd_max_throughput, 3gpp_calibration, max_throughput, \
                 token_bank_fair_queue",
                s
            )),
        }
    }

    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::ProportionalFair => "proportional_fair",
            Self::Priority => "priority",
            Self::ThroughputToAverage => "throughput_to_average",
            Self::FdMaxThroughput => "fd_max_throughput",
            Self::ThreeGppCalibration => "3gpp_calibration",
            Self::MaxThroughput => "max_throughput",
            Self::TokenBankFairQueue => "token_bank_fair_queue",
        }
    }

    pub const fn share_mode(&self) -> ShareMode {
        match self {
            Self::RoundRobin | Self::ThreeGppCalibration => ShareMode::Equal,
            _ => ShareMode::Greedy,
        }
    }

    /// Policies that pick RBGs by subband CQI instead of lowest index first
    pub const fn uses_subbands(&self) -> bool {
        matches!(
            self,
            Self::ThroughputToAverage
                | Self::FdMaxThroughput
                | Self::MaxThroughput
                | Self::TokenBankFairQueue
        )
    }

    /// Policies whose DL grants are bounded by per-UE token buckets
    pub const fn uses_token_bank(&self) -> bool {
        matches!(self, Self::TokenBankFairQueue)
    }

    /// CQI validity window used when the configuration does not set one
    pub const fn default_cqi_timers_threshold(&self) -> u32 {
        match self {
            // calibration runs use fresh periodic reports only
            Self::ThreeGppCalibration => 40,
            _ => DEFAULT_CQI_TIMERS_THRESHOLD,
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PolicyKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PolicyKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!(PolicyKind::from_str("rr").unwrap(), PolicyKind::RoundRobin);
        assert_eq!(PolicyKind::from_str("PF").unwrap(), PolicyKind::ProportionalFair);
        assert_eq!(PolicyKind::from_str("fdmt").unwrap(), PolicyKind::FdMaxThroughput);
        assert_eq!(
            PolicyKind::from_str("3gpp").unwrap(),
            PolicyKind::ThreeGppCalibration
        );
        assert_eq!(PolicyKind::from_str("mt").unwrap(), PolicyKind::MaxThroughput);
        assert_eq!(
            PolicyKind::from_str("FDTBFQ").unwrap(),
            PolicyKind::TokenBankFairQueue
        );
        assert!(PolicyKind::from_str("edf").is_err());
    }

    #[test]
    fn test_as_str_round_trips() {
        for kind in PolicyKind::ALL {
            assert_eq!(PolicyKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn test_share_modes() {
        assert_eq!(PolicyKind::RoundRobin.share_mode(), ShareMode::Equal);
        assert_eq!(PolicyKind::ThreeGppCalibration.share_mode(), ShareMode::Equal);
        assert_eq!(PolicyKind::ProportionalFair.share_mode(), ShareMode::Greedy);
    }
}
