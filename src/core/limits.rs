/*!
 * Scheduler Limits and Constants
 *
 * Centralized location for the LTE numerology and FF MAC API limits used by
 * every scheduler component. Values come from 3GPP TS 36.213 / 36.321 unless
 * marked otherwise.
 */

use super::types::Rnti;

// =============================================================================
// HARQ
// =============================================================================

/// HARQ processes per UE and direction (FDD)
pub const HARQ_PROC_NUM: usize = 8;

/// DL HARQ round-trip timeout in TTIs
/// A process whose feedback has not arrived after this many TTIs is freed
pub const HARQ_DL_TIMEOUT: u32 = 11;

/// UL HARQ round-trip timeout in TTIs (synchronous HARQ period)
pub const HARQ_UL_TIMEOUT: u32 = 7;

/// Redundancy versions cycle 0, 1, 2, 3
pub const HARQ_RV_CYCLE: u8 = 4;

/// Process id reported when HARQ is disabled
pub const HARQ_DISABLED_PROCESS: u8 = 0;

// =============================================================================
// RESOURCE GRID
// =============================================================================

/// Type 0 allocation thresholds (TS 36.213 table 7.1.6.1-1)
/// Bandwidth below `TYPE0_ALLOCATION_RBG[i]` RBs uses RBGs of `i + 1` RBs
pub const TYPE0_ALLOCATION_RBG: [u16; 4] = [10, 26, 63, 110];

/// Subcarriers per resource block
pub const SUBCARRIERS_PER_RB: u32 = 12;

/// OFDM symbols per subframe (normal cyclic prefix)
pub const SYMBOLS_PER_SUBFRAME: u32 = 14;

/// Symbols reserved for PDCCH in the DL TB size estimate
pub const PDCCH_SYMBOLS: u32 = 3;

/// Symbols reserved for DMRS in the UL TB size estimate
pub const UL_DMRS_SYMBOLS: u32 = 2;

/// Maximum DL layers (spatial multiplexing)
pub const MAX_LAYERS: usize = 2;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Lowest valid C-RNTI
pub const MIN_C_RNTI: Rnti = 0x0001;

/// Highest valid C-RNTI (TS 36.321 table 7.1-1)
pub const MAX_C_RNTI: Rnti = 0xFFF3;

/// Logical channel priority range (1 = highest)
pub const MIN_LC_PRIORITY: u8 = 1;
pub const MAX_LC_PRIORITY: u8 = 16;

/// Logical channel groups reported in a long BSR
pub const MAX_LCG: usize = 4;

// =============================================================================
// LINK ADAPTATION
// =============================================================================

/// Highest CQI index
pub const MAX_CQI: u8 = 15;

/// Highest MCS index usable for new transmissions
pub const MAX_MCS: u8 = 28;

/// Target BER for the SINR to CQI gap model
pub const AMC_TARGET_BER: f64 = 0.00005;

/// TTI duration in seconds (rate = bytes / TTI)
pub const TTI_SECONDS: f64 = 0.001;

// =============================================================================
// SCHEDULER DEFAULTS
// =============================================================================

/// Default CQI validity window in TTIs
pub const DEFAULT_CQI_TIMERS_THRESHOLD: u32 = 1000;

/// Default PF averaging window in TTIs
pub const DEFAULT_PF_TIME_WINDOW: f64 = 99.0;

/// Minimum contiguous UL RBs per grant
pub const DEFAULT_MIN_UL_RBS: u16 = 3;

/// RLC header overhead assumed per PDU (bytes)
pub const RLC_HEADER_BYTES: u32 = 2;

/// MAC subheader overhead per logical channel (bytes)
pub const MAC_SUBHEADER_BYTES: u32 = 3;
