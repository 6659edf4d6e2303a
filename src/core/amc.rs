/*!
 * Adaptive Modulation and Coding
 * CQI, MCS and transport block size mapping used by every scheduling policy
 */

use super::limits::{
    AMC_TARGET_BER, MAX_CQI, MAX_MCS, PDCCH_SYMBOLS, SUBCARRIERS_PER_RB, SYMBOLS_PER_SUBFRAME,
    TTI_SECONDS, UL_DMRS_SYMBOLS,
};
use super::types::{Cqi, Direction, Mcs};

/// Spectral efficiency (bit/s/Hz) reached at each CQI index (TS 36.213 table 7.2.3-1)
const SPECTRAL_EFFICIENCY_FOR_CQI: [f64; 16] = [
    0.0, // out of range
    0.15, 0.23, 0.38, 0.6, 0.88, 1.18, 1.48, 1.91, 2.41, 2.73, 3.32, 3.9, 4.52, 5.12, 5.55,
];

/// Spectral efficiency of each MCS index
const SPECTRAL_EFFICIENCY_FOR_MCS: [f64; 29] = [
    0.15, 0.19, 0.23, 0.31, 0.38, 0.49, 0.6, 0.74, 0.88, 1.03, 1.18, 1.33, 1.48, 1.7, 1.91,
    2.16, 2.41, 2.57, 2.73, 3.03, 3.32, 3.61, 3.9, 4.21, 4.52, 4.82, 5.12, 5.33, 5.55,
];

/// Link adaptation model
///
/// TB sizes are derived from the MCS spectral efficiency and the resource
/// elements left for data in one subframe, rounded down to whole bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amc {
    ber: f64,
}

impl Default for Amc {
    fn default() -> Self {
        Self {
            ber: AMC_TARGET_BER,
        }
    }
}

impl Amc {
    pub fn new(ber: f64) -> Self {
        Self { ber }
    }

    /// Highest MCS whose efficiency does not exceed the one promised by `cqi`
    pub fn mcs_from_cqi(&self, cqi: Cqi) -> Mcs {
        let cqi = cqi.min(MAX_CQI);
        let efficiency = SPECTRAL_EFFICIENCY_FOR_CQI[cqi as usize];
        let mut mcs: Mcs = 0;
        while mcs < MAX_MCS && SPECTRAL_EFFICIENCY_FOR_MCS[mcs as usize + 1] <= efficiency {
            mcs += 1;
        }
        mcs
    }

    /// CQI reachable with spectral efficiency `s`
    pub fn cqi_from_spectral_efficiency(&self, s: f64) -> Cqi {
        let mut cqi: Cqi = 0;
        while cqi < MAX_CQI && SPECTRAL_EFFICIENCY_FOR_CQI[cqi as usize + 1] < s {
            cqi += 1;
        }
        cqi
    }

    /// CQI for a measured SINR in dB, Shannon capacity reduced by the BER gap
    pub fn cqi_from_sinr_db(&self, sinr_db: f64) -> Cqi {
        let sinr = 10f64.powf(sinr_db / 10.0);
        let gap = -(5.0 * self.ber).ln() / 1.5;
        let efficiency = (1.0 + sinr / gap).log2();
        self.cqi_from_spectral_efficiency(efficiency)
    }

    /// Data resource elements of one RB in one subframe
    #[inline]
    fn data_res_per_rb(direction: Direction) -> u32 {
        let overhead = match direction {
            Direction::Downlink => PDCCH_SYMBOLS,
            Direction::Uplink => UL_DMRS_SYMBOLS,
        };
        SUBCARRIERS_PER_RB * (SYMBOLS_PER_SUBFRAME - overhead)
    }

    /// Transport block size in bytes for `rbs` resource blocks at `mcs`
    pub fn tb_size_bytes(&self, direction: Direction, mcs: Mcs, rbs: u32) -> u32 {
        let mcs = mcs.min(MAX_MCS);
        let res = (Self::data_res_per_rb(direction) * rbs) as f64;
        let bits = (SPECTRAL_EFFICIENCY_FOR_MCS[mcs as usize] * res).floor() as u32;
        bits / 8
    }

    /// Smallest RB count whose TB carries `bytes`, bounded by `max_rbs`
    pub fn rbs_for_bytes(&self, direction: Direction, mcs: Mcs, bytes: u32, max_rbs: u32) -> u32 {
        let mut rbs = 1;
        while rbs < max_rbs && self.tb_size_bytes(direction, mcs, rbs) < bytes {
            rbs += 1;
        }
        rbs.min(max_rbs)
    }

    /// Achievable rate in bytes/s over `rbs` resource blocks at `cqi`
    pub fn achievable_rate(&self, direction: Direction, cqi: Cqi, rbs: u32) -> f64 {
        if cqi == 0 {
            return 0.0;
        }
        let mcs = self.mcs_from_cqi(cqi);
        self.tb_size_bytes(direction, mcs, rbs) as f64 / TTI_SECONDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcs_from_cqi_monotonic() {
        let amc = Amc::default();
        let mut last = 0;
        for cqi in 1..=15 {
            let mcs = amc.mcs_from_cqi(cqi);
            assert!(mcs >= last, "cqi {} -> mcs {} < {}", cqi, mcs, last);
            last = mcs;
        }
        assert_eq!(amc.mcs_from_cqi(15), 28);
        assert_eq!(amc.mcs_from_cqi(1), 0);
    }

    #[test]
    fn test_tb_size_grows_with_rbs_and_mcs() {
        let amc = Amc::default();
        assert!(amc.tb_size_bytes(Direction::Downlink, 10, 4) > amc.tb_size_bytes(Direction::Downlink, 10, 2));
        assert!(amc.tb_size_bytes(Direction::Downlink, 20, 4) > amc.tb_size_bytes(Direction::Downlink, 10, 4));
        // 25 RBs at the top MCS is close to the 36.213 table value (18336 bits)
        let bits = amc.tb_size_bytes(Direction::Downlink, 28, 25) * 8;
        assert!((17_000..19_000).contains(&bits));
    }

    #[test]
    fn test_rbs_for_bytes() {
        let amc = Amc::default();
        let rbs = amc.rbs_for_bytes(Direction::Uplink, 5, 200, 50);
        assert!(amc.tb_size_bytes(Direction::Uplink, 5, rbs) >= 200);
        assert!(amc.tb_size_bytes(Direction::Uplink, 5, rbs - 1) < 200);
        assert_eq!(amc.rbs_for_bytes(Direction::Uplink, 0, 1_000_000, 6), 6);
    }

    #[test]
    fn test_cqi_from_sinr() {
        let amc = Amc::default();
        assert_eq!(amc.cqi_from_sinr_db(-20.0), 0);
        assert_eq!(amc.cqi_from_sinr_db(40.0), 15);
        assert!(amc.cqi_from_sinr_db(10.0) > amc.cqi_from_sinr_db(0.0));
    }
}
