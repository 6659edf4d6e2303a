/*!
 * Resource Allocation Map
 * Per-TTI ownership of DL RBGs and UL RBs
 */

mod map;

pub use map::{rbg_count, rbg_size, RbgAllocationMap, RbgState};
