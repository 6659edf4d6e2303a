/*!
 * HARQ Process Bookkeeping
 * Per-UE, per-process retransmission state for downlink and uplink
 */

mod process;
mod table;

pub use process::{HarqProcess, HarqStatus};
pub use table::{HarqConfig, HarqFailure, HarqFailureReason, HarqProcessTable, NackOutcome};

use crate::core::{DlDci, UlDci};

/// Downlink HARQ table (buffers DCI and RLC PDU lists)
pub type DlHarqTable = HarqProcessTable<DlDci>;

/// Uplink HARQ table (buffers the UL grant only)
pub type UlHarqTable = HarqProcessTable<UlDci>;
