//! External command grammar
//!
//! Operators and passive-check collectors talk to the scheduler through
//! Nagios-style command lines:
//!
//! ```text
//! [1700000000] PROCESS_SERVICE_CHECK_RESULT;web1;http;2;connection refused
//! [1700000000] ADD_SIMPLE_HOST_DEPENDENCY;web1;router
//! ```
//!
//! The last argument takes the rest of the line, so plugin output may contain
//! semicolons.

use chrono::{DateTime, Utc};

use crate::error::CommandError;
use crate::item::MAX_INTERVAL_SECONDS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Host(String),
    Service { host: String, service: String },
}

impl Target {
    pub fn name(&self) -> String {
        match self {
            Target::Host(host) => host.clone(),
            Target::Service { host, service } => format!("{host}/{service}"),
        }
    }
}

/// Global passive acceptance scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Hosts,
    Services,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ProcessCheckResult {
        target: Target,
        return_code: i32,
        output: String,
    },

    /// `START/STOP_ACCEPTING_PASSIVE_{HOST,SVC}_CHECKS`
    AcceptPassiveChecks { scope: Scope, enabled: bool },

    /// `ENABLE/DISABLE_PASSIVE_{HOST,SVC}_CHECKS`
    SetPassiveChecks { target: Target, enabled: bool },

    /// `ENABLE/DISABLE_{HOST,SVC}_CHECK`
    SetActiveChecks { target: Target, enabled: bool },

    AddSimpleHostDependency { host: String, parent: String },

    DelHostDependency { host: String, parent: String },

    ScheduleCheck {
        target: Target,
        at: DateTime<Utc>,
        forced: bool,
    },

    ChangeCustomVar {
        target: Target,
        name: String,
        value: String,
    },

    ChangeMaxCheckAttempts { target: Target, attempts: u32 },

    /// Interval in `interval_length` units
    ChangeCheckInterval {
        target: Target,
        interval: f64,
        retry: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalCommand {
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub action: Action,
}

#[derive(Clone, Copy)]
enum Kind {
    Host,
    Service,
    Global,
}

impl Kind {
    /// Number of arguments naming the target
    fn target_arity(self) -> usize {
        match self {
            Kind::Host => 1,
            Kind::Service => 2,
            Kind::Global => 0,
        }
    }
}

/// Target kind and number of arguments after the target
fn signature(name: &str) -> Option<(Kind, usize)> {
    let signature = match name {
        "PROCESS_HOST_CHECK_RESULT" => (Kind::Host, 2),
        "PROCESS_SERVICE_CHECK_RESULT" => (Kind::Service, 2),
        "START_ACCEPTING_PASSIVE_HOST_CHECKS"
        | "STOP_ACCEPTING_PASSIVE_HOST_CHECKS"
        | "START_ACCEPTING_PASSIVE_SVC_CHECKS"
        | "STOP_ACCEPTING_PASSIVE_SVC_CHECKS" => (Kind::Global, 0),
        "ENABLE_PASSIVE_HOST_CHECKS" | "DISABLE_PASSIVE_HOST_CHECKS" => (Kind::Host, 0),
        "ENABLE_PASSIVE_SVC_CHECKS" | "DISABLE_PASSIVE_SVC_CHECKS" => (Kind::Service, 0),
        "ENABLE_HOST_CHECK" | "DISABLE_HOST_CHECK" => (Kind::Host, 0),
        "ENABLE_SVC_CHECK" | "DISABLE_SVC_CHECK" => (Kind::Service, 0),
        "ADD_SIMPLE_HOST_DEPENDENCY" | "DEL_HOST_DEPENDENCY" => (Kind::Host, 1),
        "SCHEDULE_HOST_CHECK" | "SCHEDULE_FORCED_HOST_CHECK" => (Kind::Host, 1),
        "SCHEDULE_SVC_CHECK" | "SCHEDULE_FORCED_SVC_CHECK" => (Kind::Service, 1),
        "CHANGE_CUSTOM_HOST_VAR" => (Kind::Host, 2),
        "CHANGE_CUSTOM_SVC_VAR" => (Kind::Service, 2),
        "CHANGE_MAX_HOST_CHECK_ATTEMPTS" => (Kind::Host, 1),
        "CHANGE_MAX_SVC_CHECK_ATTEMPTS" => (Kind::Service, 1),
        "CHANGE_NORMAL_HOST_CHECK_INTERVAL" | "CHANGE_RETRY_HOST_CHECK_INTERVAL" => (Kind::Host, 1),
        "CHANGE_NORMAL_SVC_CHECK_INTERVAL" | "CHANGE_RETRY_SVC_CHECK_INTERVAL" => {
            (Kind::Service, 1)
        }
        _ => return None,
    };
    Some(signature)
}

pub fn parse(line: &str) -> Result<ExternalCommand, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Empty);
    }

    let rest = line.strip_prefix('[').ok_or(CommandError::MissingTimestamp)?;
    let (timestamp, rest) = rest.split_once(']').ok_or(CommandError::MissingTimestamp)?;
    let timestamp = timestamp
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| CommandError::InvalidTimestamp(timestamp.to_string()))?;

    let rest = rest.trim_start();
    let (name, arguments) = match rest.split_once(';') {
        Some((name, arguments)) => (name.trim(), Some(arguments)),
        None => (rest.trim(), None),
    };

    if name.is_empty() {
        return Err(CommandError::Empty);
    }

    let (kind, extra) =
        signature(name).ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
    let arity = kind.target_arity() + extra;

    let args: Vec<&str> = match arguments {
        Some(arguments) if arity > 0 => arguments.splitn(arity, ';').collect(),
        Some(_) => vec![""],
        None => Vec::new(),
    };

    let args_given = if arity == 0 && args == [""] { 0 } else { args.len() };
    if args_given != arity {
        return Err(CommandError::WrongArity {
            command: name.to_string(),
            expected: arity,
            found: args_given,
        });
    }

    let target = match kind {
        Kind::Host => Some(Target::Host(args[0].trim().to_string())),
        Kind::Service => Some(Target::Service {
            host: args[0].trim().to_string(),
            service: args[1].trim().to_string(),
        }),
        Kind::Global => None,
    };
    let extra_args = &args[kind.target_arity().min(args.len())..];

    let action = build(name, target, extra_args, timestamp)?;

    Ok(ExternalCommand {
        timestamp,
        name: name.to_string(),
        action,
    })
}

fn build(
    name: &str,
    target: Option<Target>,
    args: &[&str],
    timestamp: DateTime<Utc>,
) -> Result<Action, CommandError> {
    let invalid = |argument: &str| CommandError::InvalidArgument {
        command: name.to_string(),
        argument: argument.to_string(),
    };
    let target = || target.clone().ok_or_else(|| invalid(""));

    let action = match name {
        "PROCESS_HOST_CHECK_RESULT" | "PROCESS_SERVICE_CHECK_RESULT" => {
            Action::ProcessCheckResult {
                target: target()?,
                return_code: args[0].trim().parse().map_err(|_| invalid(args[0]))?,
                output: args[1].to_string(),
            }
        }
        "START_ACCEPTING_PASSIVE_HOST_CHECKS" | "STOP_ACCEPTING_PASSIVE_HOST_CHECKS" => {
            Action::AcceptPassiveChecks {
                scope: Scope::Hosts,
                enabled: name.starts_with("START"),
            }
        }
        "START_ACCEPTING_PASSIVE_SVC_CHECKS" | "STOP_ACCEPTING_PASSIVE_SVC_CHECKS" => {
            Action::AcceptPassiveChecks {
                scope: Scope::Services,
                enabled: name.starts_with("START"),
            }
        }
        "ENABLE_PASSIVE_HOST_CHECKS"
        | "DISABLE_PASSIVE_HOST_CHECKS"
        | "ENABLE_PASSIVE_SVC_CHECKS"
        | "DISABLE_PASSIVE_SVC_CHECKS" => Action::SetPassiveChecks {
            target: target()?,
            enabled: name.starts_with("ENABLE"),
        },
        "ENABLE_HOST_CHECK" | "DISABLE_HOST_CHECK" | "ENABLE_SVC_CHECK" | "DISABLE_SVC_CHECK" => {
            Action::SetActiveChecks {
                target: target()?,
                enabled: name.starts_with("ENABLE"),
            }
        }
        "ADD_SIMPLE_HOST_DEPENDENCY" | "DEL_HOST_DEPENDENCY" => {
            let Target::Host(host) = target()? else {
                return Err(invalid(""));
            };
            let parent = args[0].trim().to_string();
            if name.starts_with("ADD") {
                Action::AddSimpleHostDependency { host, parent }
            } else {
                Action::DelHostDependency { host, parent }
            }
        }
        "SCHEDULE_HOST_CHECK"
        | "SCHEDULE_FORCED_HOST_CHECK"
        | "SCHEDULE_SVC_CHECK"
        | "SCHEDULE_FORCED_SVC_CHECK" => {
            let at = match args[0].trim() {
                "" => timestamp,
                value => value
                    .parse::<i64>()
                    .ok()
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
                    .ok_or_else(|| invalid(value))?,
            };
            Action::ScheduleCheck {
                target: target()?,
                at,
                forced: name.contains("FORCED"),
            }
        }
        "CHANGE_CUSTOM_HOST_VAR" | "CHANGE_CUSTOM_SVC_VAR" => Action::ChangeCustomVar {
            target: target()?,
            name: args[0].trim().to_string(),
            value: args[1].to_string(),
        },
        "CHANGE_MAX_HOST_CHECK_ATTEMPTS" | "CHANGE_MAX_SVC_CHECK_ATTEMPTS" => {
            let attempts: u32 = args[0].trim().parse().map_err(|_| invalid(args[0]))?;
            if attempts == 0 {
                return Err(invalid(args[0]));
            }
            Action::ChangeMaxCheckAttempts {
                target: target()?,
                attempts,
            }
        }
        "CHANGE_NORMAL_HOST_CHECK_INTERVAL"
        | "CHANGE_NORMAL_SVC_CHECK_INTERVAL"
        | "CHANGE_RETRY_HOST_CHECK_INTERVAL"
        | "CHANGE_RETRY_SVC_CHECK_INTERVAL" => {
            let interval: f64 = args[0].trim().parse().map_err(|_| invalid(args[0]))?;
            if !interval.is_finite() || interval <= 0.0 || interval > MAX_INTERVAL_SECONDS as f64 {
                return Err(invalid(args[0]));
            }
            Action::ChangeCheckInterval {
                target: target()?,
                interval,
                retry: name.contains("RETRY"),
            }
        }
        _ => return Err(CommandError::UnknownCommand(name.to_string())),
    };

    Ok(action)
}
