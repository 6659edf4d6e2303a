/*!
 * Scheduler Configuration
 * Policy selection and the recognised options of every scheduling policy
 */

mod policy;
mod settings;

pub use policy::{PolicyKind, ShareMode};
pub use settings::SchedulerConfig;
