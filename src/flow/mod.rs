/*!
 * UE Flow State
 * Logical channel queues, buffer status reports and throughput history
 */

mod bsr;
mod state;
mod throughput;
mod token_bank;

pub use bsr::{bsr_level_to_bytes, bytes_to_bsr_level, BSR_LEVELS};
pub use state::{FlowRecord, LcDirection, LogicalChannelConfig, UeFlowState};
pub use throughput::ThroughputStats;
pub use token_bank::{TokenBank, TokenBankConfig, TokenBucket};
