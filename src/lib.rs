/*!
 * cv2x MAC Scheduler Library
 * Per-TTI LTE/cv2x downlink and uplink resource scheduling behind the FemtoForum SAP
 */

pub mod config;
pub mod core;
pub mod cqi;
pub mod ffr;
pub mod flow;
pub mod harq;
pub mod monitoring;
pub mod rbg;
pub mod sap;
pub mod scheduler;
pub mod sim;

// Re-exports
pub use config::{PolicyKind, SchedulerConfig, ShareMode};
pub use crate::core::{Amc, Direction, DlDci, RlcPdu, Rnti, SchedResult, SchedulerError, SfnSf, UlDci};
pub use cqi::CqiFeedbackStore;
pub use ffr::{FrequencyReuse, NoFrequencyReuse, StaticFrequencyReuse};
pub use flow::{LcDirection, LogicalChannelConfig, UeFlowState};
pub use harq::{HarqFailure, HarqProcessTable};
pub use monitoring::{init_tracing, tti_span};
pub use rbg::{RbgAllocationMap, RbgState};
pub use sap::{CschedSapProvider, CschedSapUser, SchedSapProvider, SchedSapUser};
pub use scheduler::{MacScheduler, SchedulerStats, SchedulingMetric};
pub use sim::{AllocationTrace, Scenario, Simulation};
