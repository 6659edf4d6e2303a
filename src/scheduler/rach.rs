/*!
 * Random Access Grants
 * RAR grants for message 3, placed on the UL map of the next UL trigger
 */

use super::cell::CellState;
use super::MacScheduler;
use crate::core::{Direction, UlDci};
use crate::rbg::RbgAllocationMap;
use crate::sap::BuildRarListElement;
use tracing::debug;

impl MacScheduler {
    /// Grant every queued preamble the smallest free RB run that fits its message
    ///
    /// Preambles that do not fit stay queued for the next DL trigger.
    pub(super) fn serve_rach(&mut self, cell: &CellState) -> Vec<BuildRarListElement> {
        self.rar_grants.clear();
        if self.rach_queue.is_empty() {
            return Vec::new();
        }

        let ul_rbs = cell.ul_bandwidth as usize;
        let mut map = RbgAllocationMap::new(ul_rbs);
        for (rb, reserved) in self.ffr.ul_reserved_rbs(ul_rbs).into_iter().enumerate() {
            if reserved {
                map.mark_reserved(rb);
            }
        }

        let mcs = self.config.ul_grant_mcs;
        let mut rar_list = Vec::new();
        let mut waiting = Vec::new();

        for rach in std::mem::take(&mut self.rach_queue) {
            let rbs = self
                .amc
                .rbs_for_bytes(Direction::Uplink, mcs, rach.estimated_size, ul_rbs as u32)
                as usize;
            let Some(start) = map.smallest_run_fitting(rbs) else {
                debug!(rnti = rach.rnti, rbs, "no room for RAR grant, retrying next TTI");
                waiting.push(rach);
                continue;
            };
            for rb in start..start + rbs {
                map.try_claim(rb, rach.rnti);
            }

            let grant = UlDci {
                rnti: rach.rnti,
                rb_start: start as u16,
                rb_len: rbs as u16,
                harq_process: 0,
                mcs,
                tb_size: self.amc.tb_size_bytes(Direction::Uplink, mcs, rbs as u32),
                ndi: 1,
                tpc: 1,
                cqi_request: false,
            };
            debug!(rnti = rach.rnti, rb_start = start, rb_len = rbs, "RAR grant");
            self.rar_grants.push(grant.clone());
            rar_list.push(BuildRarListElement {
                rnti: rach.rnti,
                grant,
            });
        }

        self.rach_queue = waiting;
        self.stats.add_rach_grants(rar_list.len() as u64);
        rar_list
    }
}
