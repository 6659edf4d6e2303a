/*!
 * Lock-Free Scheduler Statistics
 * Atomic counters updated from the TTI path, snapshotted on demand
 */

use super::stats::SchedulerStats;
use crate::config::PolicyKind;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Atomic scheduler statistics
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - Relaxed ordering; counters are independent of each other
#[repr(C, align(64))]
#[derive(Debug)]
pub struct AtomicSchedulerStats {
    dl_ttis: AtomicU64,
    ul_ttis: AtomicU64,
    dl_new_grants: AtomicU64,
    dl_retx_grants: AtomicU64,
    ul_new_grants: AtomicU64,
    ul_retx_grants: AtomicU64,
    retx_deferred: AtomicU64,
    harq_failures: AtomicU64,
    stale_feedback: AtomicU64,
    cqi_skips: AtomicU64,
    harq_busy_skips: AtomicU64,
    rach_grants: AtomicU64,
    dl_bytes: AtomicU64,
    ul_bytes: AtomicU64,
    active_ues: AtomicUsize,
    policy: PolicyKind,
}

macro_rules! counter {
    ($name:ident, $field:ident) => {
        #[inline(always)]
        pub fn $name(&self, n: u64) {
            self.$field.fetch_add(n, Ordering::Relaxed);
        }
    };
}

impl AtomicSchedulerStats {
    pub fn new(policy: PolicyKind) -> Self {
        Self {
            dl_ttis: AtomicU64::new(0),
            ul_ttis: AtomicU64::new(0),
            dl_new_grants: AtomicU64::new(0),
            dl_retx_grants: AtomicU64::new(0),
            ul_new_grants: AtomicU64::new(0),
            ul_retx_grants: AtomicU64::new(0),
            retx_deferred: AtomicU64::new(0),
            harq_failures: AtomicU64::new(0),
            stale_feedback: AtomicU64::new(0),
            cqi_skips: AtomicU64::new(0),
            harq_busy_skips: AtomicU64::new(0),
            rach_grants: AtomicU64::new(0),
            dl_bytes: AtomicU64::new(0),
            ul_bytes: AtomicU64::new(0),
            active_ues: AtomicUsize::new(0),
            policy,
        }
    }

    counter!(add_dl_ttis, dl_ttis);
    counter!(add_ul_ttis, ul_ttis);
    counter!(add_dl_new_grants, dl_new_grants);
    counter!(add_dl_retx_grants, dl_retx_grants);
    counter!(add_ul_new_grants, ul_new_grants);
    counter!(add_ul_retx_grants, ul_retx_grants);
    counter!(add_retx_deferred, retx_deferred);
    counter!(add_harq_failures, harq_failures);
    counter!(add_stale_feedback, stale_feedback);
    counter!(add_cqi_skips, cqi_skips);
    counter!(add_harq_busy_skips, harq_busy_skips);
    counter!(add_rach_grants, rach_grants);
    counter!(add_dl_bytes, dl_bytes);
    counter!(add_ul_bytes, ul_bytes);

    #[inline]
    pub fn set_active_ues(&self, count: usize) {
        self.active_ues.store(count, Ordering::Relaxed);
    }

    /// Current values (each counter individually accurate)
    pub fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            policy: self.policy,
            dl_ttis: self.dl_ttis.load(Ordering::Relaxed),
            ul_ttis: self.ul_ttis.load(Ordering::Relaxed),
            dl_new_grants: self.dl_new_grants.load(Ordering::Relaxed),
            dl_retx_grants: self.dl_retx_grants.load(Ordering::Relaxed),
            ul_new_grants: self.ul_new_grants.load(Ordering::Relaxed),
            ul_retx_grants: self.ul_retx_grants.load(Ordering::Relaxed),
            retx_deferred: self.retx_deferred.load(Ordering::Relaxed),
            harq_failures: self.harq_failures.load(Ordering::Relaxed),
            stale_feedback: self.stale_feedback.load(Ordering::Relaxed),
            cqi_skips: self.cqi_skips.load(Ordering::Relaxed),
            harq_busy_skips: self.harq_busy_skips.load(Ordering::Relaxed),
            rach_grants: self.rach_grants.load(Ordering::Relaxed),
            dl_bytes: self.dl_bytes.load(Ordering::Relaxed),
            ul_bytes: self.ul_bytes.load(Ordering::Relaxed),
            active_ues: self.active_ues.load(Ordering::Relaxed),
        }
    }
}
