/*!
 * Scheduler SAP
 * FemtoForum-style service access points between MAC and scheduler
 */

mod params;
mod provider;
mod traits;
mod users;

pub use params::*;
pub use traits::{CschedSapProvider, CschedSapUser, SchedSapProvider, SchedSapUser};
pub use users::{ChannelSapUser, RecordingSapUser, SapEvent};
