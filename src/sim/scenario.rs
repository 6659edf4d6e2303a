/*!
 * Simulation Scenarios
 * JSON description of the cell, its UEs and their offered traffic
 */

use crate::core::limits::{MAX_CQI, MAX_C_RNTI, MIN_C_RNTI};
use crate::core::{Cqi, Rnti, SchedResult, SchedulerError};
use crate::flow::{LcDirection, LogicalChannelConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Offered load of one direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum TrafficModel {
    #[default]
    Idle,
    /// Queue never drains
    FullBuffer,
    /// Fixed bytes arriving every TTI
    ConstantBitRate { bytes_per_tti: u32 },
    /// Bursts of `bytes` with probability `probability` per TTI
    Bursty { bytes: u32, probability: f64 },
}

impl TrafficModel {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

fn default_transmission_mode() -> u8 {
    0
}

fn default_cqi_period() -> u32 {
    5
}

fn default_ul_sinr_db() -> f64 {
    10.0
}

/// One UE of the scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UeScenario {
    pub rnti: Rnti,
    #[serde(default = "default_transmission_mode")]
    pub transmission_mode: u8,
    /// Defaults to one best-effort DRB on LCID 3
    #[serde(default)]
    pub logical_channels: Vec<LogicalChannelConfig>,
    /// Mean wideband CQI
    pub dl_cqi: Cqi,
    /// Uniform per-report variation around `dl_cqi`
    #[serde(default)]
    pub cqi_jitter: u8,
    /// Also report per-RBG subband CQI
    #[serde(default)]
    pub subband_cqi: bool,
    /// TTIs between CQI reports (SRS shares the period)
    #[serde(default = "default_cqi_period")]
    pub cqi_period: u32,
    #[serde(default = "default_ul_sinr_db")]
    pub ul_sinr_db: f64,
    #[serde(default)]
    pub dl_traffic: TrafficModel,
    #[serde(default)]
    pub ul_traffic: TrafficModel,
}

impl UeScenario {
    /// Configured channels, or the default DRB
    pub fn channels(&self) -> Vec<LogicalChannelConfig> {
        if self.logical_channels.is_empty() {
            vec![LogicalChannelConfig::best_effort(3)]
        } else {
            self.logical_channels.clone()
        }
    }

    /// First channel carrying UL data
    pub fn ul_channel(&self) -> Option<LogicalChannelConfig> {
        self.channels()
            .into_iter()
            .find(|lc| lc.direction != LcDirection::Downlink)
    }
}

/// Random access attempt injected at a given TTI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RachEvent {
    pub tti: u32,
    pub rnti: Rnti,
    pub estimated_size: u32,
}

fn default_bandwidth() -> u16 {
    25
}

fn default_ttis() -> u32 {
    1000
}

fn default_harq_delay() -> u32 {
    4
}

/// Complete simulation input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_bandwidth")]
    pub dl_bandwidth: u16,
    #[serde(default = "default_bandwidth")]
    pub ul_bandwidth: u16,
    #[serde(default = "default_ttis")]
    pub ttis: u32,
    #[serde(default)]
    pub seed: u64,
    /// Probability that a transmitted TB is NACKed
    #[serde(default)]
    pub nack_probability: f64,
    /// TTIs between a grant and its HARQ feedback
    #[serde(default = "default_harq_delay")]
    pub harq_feedback_delay: u32,
    pub ues: Vec<UeScenario>,
    #[serde(default)]
    pub rach: Vec<RachEvent>,
}

impl Scenario {
    /// Load and validate a scenario file
    pub fn from_file(path: impl AsRef<Path>) -> SchedResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let scenario: Self = serde_json::from_str(&text)?;
        scenario.validate()?;
        info!(
            path = %path.display(),
            ues = scenario.ues.len(),
            ttis = scenario.ttis,
            "scenario loaded"
        );
        Ok(scenario)
    }

    /// Reject values the synthetic MAC cannot drive
    pub fn validate(&self) -> SchedResult<()> {
        if !(0.0..=1.0).contains(&self.nack_probability) {
            return Err(SchedulerError::config(format!(
                "nack_probability {} outside [0, 1]",
                self.nack_probability
            )));
        }
        if self.harq_feedback_delay == 0 {
            return Err(SchedulerError::config("harq_feedback_delay must be at least 1"));
        }
        let mut seen = std::collections::BTreeSet::new();
        for ue in &self.ues {
            if !(MIN_C_RNTI..=MAX_C_RNTI).contains(&ue.rnti) {
                return Err(SchedulerError::InvalidRnti(ue.rnti));
            }
            if !seen.insert(ue.rnti) {
                return Err(SchedulerError::config(format!("UE {} listed twice", ue.rnti)));
            }
            if ue.dl_cqi > MAX_CQI {
                return Err(SchedulerError::config(format!(
                    "dl_cqi {} of UE {} above {}",
                    ue.dl_cqi, ue.rnti, MAX_CQI
                )));
            }
            if ue.cqi_period == 0 {
                return Err(SchedulerError::config(format!(
                    "cqi_period of UE {} must be at least 1",
                    ue.rnti
                )));
            }
        }
        Ok(())
    }
}
