//! Error types for configuration building and external commands

use std::fmt;

/// A single configuration diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two items (or two time periods/modulations) share a name
    DuplicateName(String),

    /// A service has no host
    MissingHost(String),

    /// An item references a host that is not defined
    UnknownHost { item: String, host: String },

    /// A dependency references an item that is not defined
    UnknownDependencyTarget(String),

    UnknownTimePeriod { item: String, period: String },

    UnknownModulation { item: String, modulation: String },

    InvalidTimeRange { period: String, line: String },

    InvalidInitialState { item: String, state: String },

    /// A failure state in a dependency filter is not valid for its target
    InvalidFailureState { dependency: String, state: String },

    /// `max_check_attempts` must be at least 1
    InvalidAttempts(String),

    /// A check or retry interval overflows once scaled by `interval_length`
    InvalidInterval { item: String, interval: u64 },

    InvalidBusinessRule { item: String, reason: String },

    /// Dependency edges form a cycle (names in walk order)
    DependencyCycle(Vec<String>),

    /// Business rules reference each other in a cycle
    BusinessRuleCycle(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DuplicateName(name) => write!(f, "duplicate name: {name}"),
            ConfigError::MissingHost(item) => write!(f, "service {item} has no host"),
            ConfigError::UnknownHost { item, host } => {
                write!(f, "{item} references unknown host {host}")
            }
            ConfigError::UnknownDependencyTarget(name) => {
                write!(f, "dependency references unknown item {name}")
            }
            ConfigError::UnknownTimePeriod { item, period } => {
                write!(f, "{item} references unknown time period {period}")
            }
            ConfigError::UnknownModulation { item, modulation } => {
                write!(f, "{item} references unknown modulation {modulation}")
            }
            ConfigError::InvalidTimeRange { period, line } => {
                write!(f, "time period {period} has an invalid range: {line}")
            }
            ConfigError::InvalidInitialState { item, state } => {
                write!(f, "{item} has an invalid initial state: {state}")
            }
            ConfigError::InvalidFailureState { dependency, state } => {
                write!(f, "dependency {dependency} has an invalid failure state: {state}")
            }
            ConfigError::InvalidAttempts(item) => {
                write!(f, "{item}: max_check_attempts must be at least 1")
            }
            ConfigError::InvalidInterval { item, interval } => {
                write!(f, "{item}: interval {interval} is out of range")
            }
            ConfigError::InvalidBusinessRule { item, reason } => {
                write!(f, "{item} has an invalid business rule: {reason}")
            }
            ConfigError::DependencyCycle(names) => {
                write!(f, "dependency cycle: {}", names.join(" -> "))
            }
            ConfigError::BusinessRuleCycle(names) => {
                write!(f, "business rule cycle: {}", names.join(" -> "))
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// All diagnostics collected while building a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidConfig {
    pub errors: Vec<ConfigError>,
}

impl fmt::Display for InvalidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration is invalid ({} errors)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for InvalidConfig {}

/// Reasons an external command line is rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,

    /// The line does not start with `[timestamp]`
    MissingTimestamp,

    InvalidTimestamp(String),

    UnknownCommand(String),

    WrongArity {
        command: String,
        expected: usize,
        found: usize,
    },

    InvalidArgument { command: String, argument: String },

    /// The command names an item that does not exist
    UnknownItem(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::MissingTimestamp => write!(f, "command is missing its [timestamp]"),
            CommandError::InvalidTimestamp(value) => write!(f, "invalid timestamp: {value}"),
            CommandError::UnknownCommand(name) => write!(f, "unknown command: {name}"),
            CommandError::WrongArity {
                command,
                expected,
                found,
            } => write!(
                f,
                "{command} expects {expected} arguments, {found} given"
            ),
            CommandError::InvalidArgument { command, argument } => {
                write!(f, "{command}: invalid argument {argument}")
            }
            CommandError::UnknownItem(name) => write!(f, "unknown item: {name}"),
        }
    }
}

impl std::error::Error for CommandError {}
