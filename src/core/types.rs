/*!
 * Core Types
 * Identifiers and small value types shared by every scheduler component
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Radio Network Temporary Identifier (per-UE id within a cell)
pub type Rnti = u16;

/// Logical channel identifier
pub type Lcid = u8;

/// Logical channel group (BSR granularity)
pub type Lcg = u8;

/// HARQ process index (0..HARQ_PROC_NUM)
pub type HarqProcessId = u8;

/// Channel quality indicator (0 = out of range, 1..=15)
pub type Cqi = u8;

/// Modulation and coding scheme index (0..=28)
pub type Mcs = u8;

/// Common result type for scheduler operations
pub type SchedResult<T> = Result<T, super::errors::SchedulerError>;

/// Link direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Downlink,
    Uplink,
}

impl Direction {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Downlink => "dl",
            Self::Uplink => "ul",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// System frame number and subframe packed the way the FF MAC API does it
/// (`sfn << 4 | sf`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SfnSf(pub u16);

impl SfnSf {
    /// Build from frame (0..1024) and subframe (0..10)
    #[inline]
    pub const fn new(frame: u16, subframe: u8) -> Self {
        Self(((frame % 1024) << 4) | (subframe as u16 & 0xF))
    }

    #[inline]
    pub const fn frame(&self) -> u16 {
        self.0 >> 4
    }

    #[inline]
    pub const fn subframe(&self) -> u8 {
        (self.0 & 0xF) as u8
    }

    /// Subframe following this one
    pub const fn next(&self) -> Self {
        if self.subframe() >= 9 {
            Self::new((self.frame() + 1) % 1024, 0)
        } else {
            Self::new(self.frame(), self.subframe() + 1)
        }
    }

    /// Subframe `n` TTIs later
    pub fn advance(&self, n: u32) -> Self {
        let absolute = self.frame() as u32 * 10 + self.subframe() as u32 + n;
        Self::new(((absolute / 10) % 1024) as u16, (absolute % 10) as u8)
    }
}

impl fmt::Display for SfnSf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.frame(), self.subframe())
    }
}

/// Flow key: one logical channel of one UE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId {
    pub rnti: Rnti,
    pub lcid: Lcid,
}

impl FlowId {
    #[inline]
    pub const fn new(rnti: Rnti, lcid: Lcid) -> Self {
        Self { rnti, lcid }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sfn_sf_packing() {
        let s = SfnSf::new(5, 3);
        assert_eq!(s.frame(), 5);
        assert_eq!(s.subframe(), 3);
        assert_eq!(s.0, (5 << 4) | 3);
    }

    #[test]
    fn test_sfn_sf_wraps() {
        assert_eq!(SfnSf::new(0, 9).next(), SfnSf::new(1, 0));
        assert_eq!(SfnSf::new(1023, 9).next(), SfnSf::new(0, 0));
        assert_eq!(SfnSf::new(2, 8).advance(4), SfnSf::new(3, 2));
    }

    #[test]
    fn test_flow_ordering_is_rnti_first() {
        let mut flows = vec![FlowId::new(2, 1), FlowId::new(1, 3), FlowId::new(1, 1)];
        flows.sort();
        assert_eq!(flows, vec![FlowId::new(1, 1), FlowId::new(1, 3), FlowId::new(2, 1)]);
    }
}
