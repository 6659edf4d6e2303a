/*!
 * Scheduler Settings
 * Explicit option set, loaded from JSON and overridable from the environment
 *
 * Environment overrides (applied after the file):
 * - MAC_SCHED_POLICY: policy name (rr, pf, priority, tta, fdmt, 3gpp, mt, fdtbfq)
 * - MAC_SCHED_HARQ_ENABLED: true/false
 * - MAC_SCHED_CQI_TIMERS_THRESHOLD: CQI validity in TTIs
 * - MAC_SCHED_UL_GRANT_MCS: MCS of RACH grants (0..=15)
 * - MAC_SCHED_MAX_HARQ_TX: transmissions per TB, 0 for unlimited
 */

use super::policy::PolicyKind;
use crate::core::limits::{
    AMC_TARGET_BER, DEFAULT_MIN_UL_RBS, DEFAULT_PF_TIME_WINDOW, HARQ_DL_TIMEOUT, HARQ_UL_TIMEOUT,
};
use crate::core::{Direction, Mcs, SchedResult, SchedulerError};
use crate::ffr::StaticFrequencyReuse;
use crate::flow::TokenBankConfig;
use crate::harq::HarqConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Options recognised by every scheduling policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub policy: PolicyKind,
    pub harq_enabled: bool,
    /// CQI validity in TTIs (`None` = policy default)
    pub cqi_timers_threshold: Option<u32>,
    /// Averaging window of the throughput history, in TTIs
    pub time_window: f64,
    /// MCS of RACH (RAR) grants
    pub ul_grant_mcs: Mcs,
    pub min_ul_rbs_per_ue: u16,
    /// Transmissions per TB before HARQ gives up (`None` = unlimited)
    pub max_harq_transmissions: Option<u8>,
    pub harq_dl_timeout: u32,
    pub harq_ul_timeout: u32,
    pub amc_target_ber: f64,
    /// Static frequency reuse masks (no reuse when absent)
    pub frequency_reuse: Option<StaticFrequencyReuse>,
    /// Bucket and bank limits of the token-bank fair queue policy
    pub token_bank: TokenBankConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            harq_enabled: true,
            cqi_timers_threshold: None,
            time_window: DEFAULT_PF_TIME_WINDOW,
            ul_grant_mcs: 0,
            min_ul_rbs_per_ue: DEFAULT_MIN_UL_RBS,
            max_harq_transmissions: None,
            harq_dl_timeout: HARQ_DL_TIMEOUT,
            harq_ul_timeout: HARQ_UL_TIMEOUT,
            amc_target_ber: AMC_TARGET_BER,
            frequency_reuse: None,
            token_bank: TokenBankConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Defaults for one policy
    pub fn for_policy(policy: PolicyKind) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Effective CQI validity window
    pub fn cqi_threshold(&self) -> u32 {
        self.cqi_timers_threshold
            .unwrap_or_else(|| self.policy.default_cqi_timers_threshold())
    }

    /// HARQ table behaviour for one direction
    pub fn harq(&self, direction: Direction) -> HarqConfig {
        HarqConfig {
            enabled: self.harq_enabled,
            timeout: match direction {
                Direction::Downlink => self.harq_dl_timeout,
                Direction::Uplink => self.harq_ul_timeout,
            },
            max_transmissions: self.max_harq_transmissions,
        }
    }

    /// Load a JSON file (missing keys take their defaults), apply environment overrides, validate
    pub fn from_file(path: impl AsRef<Path>) -> SchedResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)?;
        config.apply_env()?;
        config.validate()?;
        info!(path = %path.display(), policy = %config.policy, "scheduler configuration loaded");
        Ok(config)
    }

    /// Defaults with environment overrides, validated
    pub fn from_env() -> SchedResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MAC_SCHED_*` variables on top of the current values
    pub fn apply_env(&mut self) -> SchedResult<()> {
        if let Some(v) = env_var("MAC_SCHED_POLICY") {
            self.policy = PolicyKind::from_str(&v).map_err(SchedulerError::config)?;
        }
        if let Some(v) = env_var("MAC_SCHED_HARQ_ENABLED") {
            self.harq_enabled = matches!(v.as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = env_var("MAC_SCHED_CQI_TIMERS_THRESHOLD") {
            self.cqi_timers_threshold = Some(parse_env("MAC_SCHED_CQI_TIMERS_THRESHOLD", &v)?);
        }
        if let Some(v) = env_var("MAC_SCHED_UL_GRANT_MCS") {
            self.ul_grant_mcs = parse_env("MAC_SCHED_UL_GRANT_MCS", &v)?;
        }
        if let Some(v) = env_var("MAC_SCHED_MAX_HARQ_TX") {
            let max: u8 = parse_env("MAC_SCHED_MAX_HARQ_TX", &v)?;
            self.max_harq_transmissions = (max > 0).then_some(max);
        }
        Ok(())
    }

    /// Reject option values the scheduler cannot run with
    pub fn validate(&self) -> SchedResult<()> {
        if self.ul_grant_mcs > 15 {
            return Err(SchedulerError::config(format!(
                "ul_grant_mcs {} outside 0..=15",
                self.ul_grant_mcs
            )));
        }
        if !(self.time_window >= 1.0) {
            return Err(SchedulerError::config(format!(
                "time_window {} must be at least one TTI",
                self.time_window
            )));
        }
        if self.min_ul_rbs_per_ue == 0 {
            return Err(SchedulerError::config("min_ul_rbs_per_ue must be positive"));
        }
        if self.harq_dl_timeout == 0 || self.harq_ul_timeout == 0 {
            return Err(SchedulerError::config("HARQ timeouts must be positive"));
        }
        if self.max_harq_transmissions == Some(0) {
            return Err(SchedulerError::config(
                "max_harq_transmissions must be positive (omit it for unlimited)",
            ));
        }
        if self.token_bank.debt_limit > 0 {
            return Err(SchedulerError::config(format!(
                "token_bank.debt_limit {} must not be positive",
                self.token_bank.debt_limit
            )));
        }
        if !(self.amc_target_ber > 0.0 && self.amc_target_ber < 1.0) {
            return Err(SchedulerError::config("amc_target_ber must lie in (0, 1)"));
        }
        debug!(policy = %self.policy, "scheduler configuration validated");
        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> SchedResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SchedulerError::config(format!("{}: cannot parse '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_default_threshold() {
        assert_eq!(SchedulerConfig::default().cqi_threshold(), 1000);
        let cal = SchedulerConfig::for_policy(PolicyKind::ThreeGppCalibration);
        assert_eq!(cal.cqi_threshold(), 40);
        let explicit = SchedulerConfig {
            cqi_timers_threshold: Some(5),
            ..cal
        };
        assert_eq!(explicit.cqi_threshold(), 5);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{ "policy": "pf", "harq_enabled": false }"#).unwrap();
        assert_eq!(config.policy, PolicyKind::ProportionalFair);
        assert!(!config.harq_enabled);
        assert_eq!(config.min_ul_rbs_per_ue, DEFAULT_MIN_UL_RBS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_mcs = SchedulerConfig {
            ul_grant_mcs: 20,
            ..Default::default()
        };
        assert!(matches!(
            bad_mcs.validate(),
            Err(SchedulerError::InvalidConfiguration(_))
        ));
        let bad_window = SchedulerConfig {
            time_window: 0.5,
            ..Default::default()
        };
        assert!(bad_window.validate().is_err());
        let bad_debt = SchedulerConfig {
            token_bank: TokenBankConfig {
                debt_limit: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(bad_debt.validate().is_err());
    }

    #[test]
    fn test_harq_config_per_direction() {
        let config = SchedulerConfig::default();
        assert_eq!(config.harq(Direction::Downlink).timeout, HARQ_DL_TIMEOUT);
        assert_eq!(config.harq(Direction::Uplink).timeout, HARQ_UL_TIMEOUT);
        assert_eq!(config.harq(Direction::Uplink).max_transmissions, None);
    }
}
