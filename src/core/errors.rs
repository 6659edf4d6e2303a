/*!
 * Error Types
 * Configuration-time failures of the MAC scheduler, with thiserror, miette and serde support
 *
 * Runtime resource exhaustion (no RBG, no HARQ process, stale CQI) is not an
 * error: it is resolved inside the TTI and only shows up in traces and stats.
 */

use super::inline_string::InlineString;
use super::types::{Lcid, Rnti};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scheduler errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SchedulerError {
    #[error("Unsupported bandwidth: {0} RBs")]
    #[diagnostic(
        code(scheduler::unsupported_bandwidth),
        help("Type 0 allocation supports 1 to 109 resource blocks (e.g. 6, 15, 25, 50, 75, 100).")
    )]
    UnsupportedBandwidth(u16),

    #[error("RNTI {0} out of range")]
    #[diagnostic(
        code(scheduler::invalid_rnti),
        help("C-RNTI values must lie in 1..=65523 (0x0001..=0xFFF3).")
    )]
    InvalidRnti(Rnti),

    #[error("UE {0} is not configured at the scheduler")]
    #[diagnostic(
        code(scheduler::unknown_ue),
        help("Send CschedUeConfigReq for this RNTI before configuring its logical channels.")
    )]
    UnknownUe(Rnti),

    #[error("Logical channel {lcid} of UE {rnti} is not configured")]
    #[diagnostic(
        code(scheduler::unknown_logical_channel),
        help("Send CschedLcConfigReq before releasing or updating the channel.")
    )]
    UnknownLogicalChannel { rnti: Rnti, lcid: Lcid },

    #[error("Cell is not configured")]
    #[diagnostic(
        code(scheduler::cell_not_configured),
        help("CschedCellConfigReq must be the first primitive sent to the scheduler.")
    )]
    CellNotConfigured,

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(scheduler::invalid_configuration),
        help("Review the scheduler configuration file and MAC_SCHED_* environment overrides.")
    )]
    InvalidConfiguration(InlineString),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(scheduler::io_error),
        help("Check that the configuration or scenario file exists and is readable.")
    )]
    Io(InlineString),

    #[error("Parse error: {0}")]
    #[diagnostic(
        code(scheduler::parse_error),
        help("The file must be valid JSON matching the documented schema.")
    )]
    Parse(InlineString),
}

impl SchedulerError {
    /// Shorthand for configuration errors built from a message
    pub fn config(msg: impl Into<InlineString>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

impl From<std::io::Error> for SchedulerError {
    fn from(err: std::io::Error) -> Self {
        SchedulerError::Io(err.to_string().into())
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Parse(err.to_string().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SchedulerError::UnsupportedBandwidth(110).to_string(),
            "Unsupported bandwidth: 110 RBs"
        );
        assert_eq!(
            SchedulerError::UnknownLogicalChannel { rnti: 3, lcid: 4 }.to_string(),
            "Logical channel 4 of UE 3 is not configured"
        );
    }

    #[test]
    fn test_error_serializes_tagged() {
        let json = serde_json::to_string(&SchedulerError::InvalidRnti(0)).unwrap();
        assert_eq!(json, r#"{"error_type":"invalid_rnti","details":0}"#);
    }
}
