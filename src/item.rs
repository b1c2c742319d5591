//! Monitored items
//!
//! Hosts, services and meta-items (items driven by a business rule) share one
//! [`Item`] record. Kind-specific behavior is not expressed through an
//! inheritance chain but through a [`StatePolicy`] strategy value that is
//! injected when the registry builds the item.
//!
//! ## State model
//!
//! ```text
//! host:    UP | DOWN | UNREACHABLE
//! service: OK | WARNING | CRITICAL | UNKNOWN
//! meta:    OK | WARNING | CRITICAL | UNKNOWN | UNDETERMINED
//!
//! every item: state_type = SOFT | HARD
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::business_rule::{RuleId, RuleSet};
use crate::check::CheckId;
use crate::dependency::DependencyEdge;
use crate::modulation::ModulationId;
use crate::registry::Registry;
use crate::timeperiod::TimePeriodId;

/// Upper bound for check and retry intervals (ten years)
pub const MAX_INTERVAL_SECONDS: u64 = 10 * 365 * 24 * 3600;

/// Stable arena index of an item inside its [`Registry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub usize);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Host,
    Service,
    Meta,
}

impl ItemKind {
    /// Strategy value describing how this kind interprets check results
    pub fn policy(self) -> &'static dyn StatePolicy {
        match self {
            ItemKind::Host => &HostPolicy,
            ItemKind::Service => &ServicePolicy,
            ItemKind::Meta => &MetaPolicy,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Host => write!(f, "host"),
            ItemKind::Service => write!(f, "service"),
            ItemKind::Meta => write!(f, "meta"),
        }
    }
}

/// Reported state of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Up,
    Down,
    Unreachable,
    Ok,
    Warning,
    Critical,
    Unknown,
    Undetermined,
}

impl State {
    /// Nagios-style numeric state id (host and service ids overlap)
    pub fn id(self) -> u8 {
        match self {
            State::Up | State::Ok => 0,
            State::Down | State::Warning => 1,
            State::Unreachable | State::Critical => 2,
            State::Unknown => 3,
            State::Undetermined => 4,
        }
    }

    /// Severity as seen by business rules. DOWN looks like CRITICAL.
    pub fn severity(self) -> Severity {
        match self {
            State::Up | State::Ok => Severity::Ok,
            State::Warning => Severity::Warning,
            State::Down | State::Unreachable | State::Critical => Severity::Critical,
            State::Unknown => Severity::Unknown,
            State::Undetermined => Severity::Undetermined,
        }
    }

    pub fn is_problem(self) -> bool {
        !matches!(self, State::Up | State::Ok)
    }

    pub fn name(self) -> &'static str {
        match self {
            State::Up => "UP",
            State::Down => "DOWN",
            State::Unreachable => "UNREACHABLE",
            State::Ok => "OK",
            State::Warning => "WARNING",
            State::Critical => "CRITICAL",
            State::Unknown => "UNKNOWN",
            State::Undetermined => "UNDETERMINED",
        }
    }

    /// Parse a configured state for the given kind.
    ///
    /// Accepts full names (`down`) and Nagios letters (`d`). The letter `u`
    /// is UNREACHABLE for hosts and UNKNOWN otherwise.
    pub fn parse_for(kind: ItemKind, value: &str) -> Option<State> {
        let value = value.trim().to_ascii_lowercase();
        let state = match (kind, value.as_str()) {
            (ItemKind::Host, "up" | "o") => State::Up,
            (ItemKind::Host, "down" | "d") => State::Down,
            (ItemKind::Host, "unreachable" | "u") => State::Unreachable,
            (ItemKind::Service | ItemKind::Meta, "ok" | "o") => State::Ok,
            (ItemKind::Service | ItemKind::Meta, "warning" | "w") => State::Warning,
            (ItemKind::Service | ItemKind::Meta, "critical" | "c") => State::Critical,
            (ItemKind::Service | ItemKind::Meta, "unknown" | "u") => State::Unknown,
            (ItemKind::Meta, "undetermined") => State::Undetermined,
            _ => return None,
        };
        Some(state)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StateType {
    Soft,
    Hard,
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateType::Soft => write!(f, "SOFT"),
            StateType::Hard => write!(f, "HARD"),
        }
    }
}

/// Mapped severity used by the business rule algebra, best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
    Undetermined = 4,
}

impl Severity {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Severity> {
        match value {
            0 => Some(Severity::Ok),
            1 => Some(Severity::Warning),
            2 => Some(Severity::Critical),
            3 => Some(Severity::Unknown),
            4 => Some(Severity::Undetermined),
            _ => None,
        }
    }

    /// OK and CRITICAL swap, everything else is left alone
    pub fn reversed(self) -> Severity {
        match self {
            Severity::Ok => Severity::Critical,
            Severity::Critical => Severity::Ok,
            other => other,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
            Severity::Undetermined => "UNDETERMINED",
        };
        f.write_str(name)
    }
}

/// Kind-specific interpretation of check results
pub trait StatePolicy: fmt::Debug + Send + Sync {
    /// Map a plugin return code to a state
    fn state_for_code(&self, code: i32) -> State;

    /// The "everything fine" state of this kind
    fn ok_state(&self) -> State;

    /// Is `state` a valid state for this kind?
    fn accepts(&self, state: State) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct HostPolicy;

impl StatePolicy for HostPolicy {
    fn state_for_code(&self, code: i32) -> State {
        match code {
            0 => State::Up,
            2 => State::Unreachable,
            _ => State::Down,
        }
    }

    fn ok_state(&self) -> State {
        State::Up
    }

    fn accepts(&self, state: State) -> bool {
        matches!(state, State::Up | State::Down | State::Unreachable)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ServicePolicy;

impl StatePolicy for ServicePolicy {
    fn state_for_code(&self, code: i32) -> State {
        match code {
            0 => State::Ok,
            1 => State::Warning,
            2 => State::Critical,
            _ => State::Unknown,
        }
    }

    fn ok_state(&self) -> State {
        State::Ok
    }

    fn accepts(&self, state: State) -> bool {
        matches!(
            state,
            State::Ok | State::Warning | State::Critical | State::Unknown
        )
    }
}

/// Meta items receive business rule severities as return codes
#[derive(Debug, Clone, Copy)]
pub struct MetaPolicy;

impl StatePolicy for MetaPolicy {
    fn state_for_code(&self, code: i32) -> State {
        match code {
            0 => State::Ok,
            1 => State::Warning,
            2 => State::Critical,
            4 => State::Undetermined,
            _ => State::Unknown,
        }
    }

    fn ok_state(&self) -> State {
        State::Ok
    }

    fn accepts(&self, state: State) -> bool {
        !matches!(state, State::Up | State::Down | State::Unreachable)
    }
}

/// Result of applying one state to an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub previous: State,
    pub previous_type: StateType,
    pub state: State,
    pub state_type: StateType,
    pub attempt: u32,

    /// The confirmed (HARD) state changed with this result
    pub hard_change: bool,
}

impl Transition {
    pub fn state_changed(&self) -> bool {
        self.previous != self.state
    }
}

/// The capability every monitored item exposes to the scheduler
pub trait Monitored {
    fn state(&self) -> State;

    fn state_type(&self) -> StateType;

    /// Apply an already-interpreted state to the item's SOFT/HARD machine
    fn apply_check_result(&mut self, state: State, output: &str, at: DateTime<Utc>) -> Transition;

    /// Evaluate the item's business rule, if it is a meta item
    fn evaluate_business_rule(&self, rules: &RuleSet, registry: &Registry) -> Option<Severity>;
}

/// A monitored item
#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,

    /// Unique name: `host` or `host/description`
    pub name: String,

    pub kind: ItemKind,

    /// Owning host, for services and meta items attached to a host
    pub host: Option<ItemId>,

    pub host_name: String,

    /// Service description (services and meta items only)
    pub description: Option<String>,

    pub address: Option<String>,

    pub check_command: Option<String>,

    pub policy: &'static dyn StatePolicy,

    pub initial_state: State,
    pub state: State,
    pub state_type: StateType,
    pub last_state: State,
    pub last_hard_state: State,
    pub attempt_count: u32,
    pub max_check_attempts: u32,

    /// Seconds between regular checks, at most [`MAX_INTERVAL_SECONDS`]
    pub check_interval: u64,

    /// Seconds between checks while in a SOFT problem state
    pub retry_interval: u64,

    pub check_period: Option<TimePeriodId>,
    pub active_checks_enabled: bool,
    pub passive_checks_enabled: bool,

    pub checks_in_progress: BTreeSet<CheckId>,
    pub next_check: Option<DateTime<Utc>>,
    pub force_next_check: bool,
    pub last_check_time: Option<DateTime<Utc>>,
    pub last_state_change: Option<DateTime<Utc>>,
    pub last_hard_state_change: Option<DateTime<Utc>>,
    pub has_been_checked: bool,

    /// Seconds between the planned and the actual execution of the last check
    pub latency: f64,

    pub output: String,

    /// Custom attributes, keys normalized to `_UPPERCASE`
    pub customs: BTreeMap<String, String>,

    pub business_rule: Option<RuleId>,

    /// Meta items whose business rule references this item
    pub business_rule_parents: Vec<ItemId>,

    pub business_impact: u8,
    pub configured_business_impact: u8,
    pub macro_modulations: Vec<ModulationId>,
    pub impact_modulations: Vec<ModulationId>,

    /// Edges this item depends on, in insertion order
    pub act_depend_of: Vec<DependencyEdge>,

    /// Items depending on this one
    pub act_depend_of_me: Vec<ItemId>,

    pub topology_change: bool,
    pub notification_pending: bool,

    /// Bumped by forced rechecks, stale checks carry the previous value
    pub generation: u64,
}

impl Item {
    pub fn new(id: ItemId, kind: ItemKind, host_name: &str, description: Option<&str>) -> Self {
        let policy = kind.policy();
        let ok = policy.ok_state();
        let name = match description {
            Some(description) => format!("{host_name}/{description}"),
            None => host_name.to_string(),
        };

        Self {
            id,
            name,
            kind,
            host: None,
            host_name: host_name.to_string(),
            description: description.map(str::to_string),
            address: None,
            check_command: None,
            policy,
            initial_state: ok,
            state: ok,
            state_type: StateType::Hard,
            last_state: ok,
            last_hard_state: ok,
            attempt_count: 0,
            max_check_attempts: 1,
            check_interval: 300,
            retry_interval: 60,
            check_period: None,
            active_checks_enabled: true,
            passive_checks_enabled: true,
            checks_in_progress: BTreeSet::new(),
            next_check: None,
            force_next_check: false,
            last_check_time: None,
            last_state_change: None,
            last_hard_state_change: None,
            has_been_checked: false,
            latency: 0.0,
            output: String::new(),
            customs: BTreeMap::new(),
            business_rule: None,
            business_rule_parents: Vec::new(),
            business_impact: 2,
            configured_business_impact: 2,
            macro_modulations: Vec::new(),
            impact_modulations: Vec::new(),
            act_depend_of: Vec::new(),
            act_depend_of_me: Vec::new(),
            topology_change: false,
            notification_pending: false,
            generation: 0,
        }
    }

    /// Put the item in its configured startup state, before any check ran
    pub fn set_initial_state(&mut self, state: State) {
        self.initial_state = state;
        self.state = state;
        self.last_state = state;
        self.last_hard_state = state;
        self.state_type = StateType::Hard;
    }

    pub fn is_host(&self) -> bool {
        self.kind == ItemKind::Host
    }

    pub fn is_meta(&self) -> bool {
        self.kind == ItemKind::Meta
    }

    /// Name of the command without its `!`-separated arguments
    pub fn command_name(&self) -> Option<&str> {
        if self.is_meta() {
            return Some("bp_rule");
        }
        self.check_command
            .as_deref()
            .map(|command| command.split('!').next().unwrap_or(command))
    }

    /// Normalize a custom attribute key to `_UPPERCASE`
    pub fn custom_key(key: &str) -> String {
        let key = key.trim().to_ascii_uppercase();
        if key.starts_with('_') {
            key
        } else {
            format!("_{key}")
        }
    }
}

impl Monitored for Item {
    fn state(&self) -> State {
        self.state
    }

    fn state_type(&self) -> StateType {
        self.state_type
    }

    fn apply_check_result(&mut self, state: State, output: &str, at: DateTime<Utc>) -> Transition {
        self.output = output.to_string();
        self.last_check_time = Some(at);
        self.has_been_checked = true;
        crate::state_machine::apply(self, state, at)
    }

    fn evaluate_business_rule(&self, rules: &RuleSet, registry: &Registry) -> Option<Severity> {
        let rule = rules.get(self.business_rule?)?;
        Some(rule.get_state(registry))
    }
}
