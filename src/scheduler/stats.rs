/*!
 * Scheduler Statistics
 * Serializable snapshot of the engine counters
 */

use crate::config::PolicyKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub policy: PolicyKind,
    pub dl_ttis: u64,
    pub ul_ttis: u64,
    pub dl_new_grants: u64,
    pub dl_retx_grants: u64,
    pub ul_new_grants: u64,
    pub ul_retx_grants: u64,
    /// Retransmissions postponed for lack of resources
    pub retx_deferred: u64,
    pub harq_failures: u64,
    /// HARQ feedback for processes that were no longer active
    pub stale_feedback: u64,
    /// Candidates skipped because their CQI was stale or zero
    pub cqi_skips: u64,
    /// Candidates skipped because all HARQ processes were busy
    pub harq_busy_skips: u64,
    pub rach_grants: u64,
    pub dl_bytes: u64,
    pub ul_bytes: u64,
    pub active_ues: usize,
}
