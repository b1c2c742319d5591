use std::collections::BTreeMap;

use anyhow::Context;
use tracing::trace;

/// Global scheduler settings
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SchedulerSettings {
    /// Milliseconds between two scheduling cycles
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    /// Seconds per interval unit used by check/retry intervals
    #[serde(default = "default_interval_length")]
    pub interval_length: u64,

    /// Business rules are evaluated every N cycles
    #[serde(default = "default_one")]
    pub business_rule_tick: u64,

    /// Business impact modulations are applied every N cycles
    #[serde(default = "default_impact_modulation_tick")]
    pub impact_modulation_tick: u64,

    /// Stats are published every N cycles
    #[serde(default = "default_stats_tick")]
    pub stats_tick: u64,

    /// Number of latency samples kept for the stats window
    #[serde(default = "default_latency_window")]
    pub latency_window: usize,

    #[serde(default = "default_true")]
    pub accept_passive_host_checks: bool,

    #[serde(default = "default_true")]
    pub accept_passive_service_checks: bool,

    /// Offset of the local time zone used to evaluate time periods
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            interval_length: default_interval_length(),
            business_rule_tick: default_one(),
            impact_modulation_tick: default_impact_modulation_tick(),
            stats_tick: default_stats_tick(),
            latency_window: default_latency_window(),
            accept_passive_host_checks: true,
            accept_passive_service_checks: true,
            utc_offset_minutes: 0,
        }
    }
}

fn default_cycle_interval_ms() -> u64 {
    1000
}

fn default_interval_length() -> u64 {
    60
}

fn default_one() -> u64 {
    1
}

fn default_impact_modulation_tick() -> u64 {
    60
}

fn default_stats_tick() -> u64 {
    60
}

fn default_latency_window() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_max_check_attempts() -> u32 {
    3
}

fn default_check_interval() -> u64 {
    5
}

fn default_retry_interval() -> u64 {
    1
}

fn default_business_impact() -> u8 {
    2
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    #[serde(default)]
    pub timeperiods: Vec<TimePeriodConfig>,

    #[serde(default)]
    pub hosts: Vec<HostConfig>,

    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,

    #[serde(default)]
    pub macro_modulations: Vec<MacroModulationConfig>,

    #[serde(default)]
    pub business_impact_modulations: Vec<BusinessImpactModulationConfig>,
}

/// A named set of weekly ranges, one entry per line (`monday 09:00-17:00`)
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TimePeriodConfig {
    pub name: String,

    #[serde(default)]
    pub ranges: Vec<String>,
}

/// Check settings shared by hosts and services
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CheckSettings {
    pub check_command: Option<String>,

    #[serde(default = "default_max_check_attempts")]
    pub max_check_attempts: u32,

    /// In units of `interval_length`
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    /// In units of `interval_length`
    #[serde(default = "default_retry_interval")]
    pub retry_interval: u64,

    pub check_period: Option<String>,

    pub initial_state: Option<String>,

    #[serde(default = "default_true")]
    pub active_checks_enabled: bool,

    #[serde(default = "default_true")]
    pub passive_checks_enabled: bool,

    #[serde(default = "default_business_impact")]
    pub business_impact: u8,

    #[serde(default)]
    pub macro_modulations: Vec<String>,

    #[serde(default)]
    pub business_impact_modulations: Vec<String>,

    #[serde(default)]
    pub customs: BTreeMap<String, String>,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            check_command: None,
            max_check_attempts: default_max_check_attempts(),
            check_interval: default_check_interval(),
            retry_interval: default_retry_interval(),
            check_period: None,
            initial_state: None,
            active_checks_enabled: true,
            passive_checks_enabled: true,
            business_impact: default_business_impact(),
            macro_modulations: Vec::new(),
            business_impact_modulations: Vec::new(),
            customs: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct HostConfig {
    pub name: String,
    pub address: Option<String>,

    /// Network parents of this host
    #[serde(default)]
    pub parents: Vec<String>,

    #[serde(flatten)]
    pub check: CheckSettings,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ServiceConfig {
    pub host: Option<String>,
    pub description: String,

    /// Business rule expression; turns the service into a meta item
    pub business_rule: Option<String>,

    /// With `false`, a non-OK rule result is reported as UNDETERMINED
    #[serde(default = "default_true")]
    pub propagate_impacts: bool,

    #[serde(flatten)]
    pub check: CheckSettings,
}

/// Explicit dependency: the dependent item depends on the target item
#[derive(Debug, Clone, serde::Deserialize)]
pub struct DependencyConfig {
    pub dependent_host: String,
    pub dependent_service: Option<String>,
    pub host: String,
    pub service: Option<String>,

    /// Target states that suppress the dependent's checks; empty means the
    /// target kind's problem states
    #[serde(default)]
    pub failure_states: Vec<String>,

    pub period: Option<String>,

    #[serde(default)]
    pub inherits_parent: bool,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MacroModulationConfig {
    pub name: String,
    pub period: String,

    #[serde(default)]
    pub customs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct BusinessImpactModulationConfig {
    pub name: String,
    pub period: String,
    pub business_impact: u8,
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    serde_json::from_str(&file_content)
        .context("invalid configuration file provided")
        .inspect(|config: &Config| {
            trace!(
                "loaded config: {} hosts, {} services",
                config.hosts.len(),
                config.services.len()
            )
        })
}
