//! Check scheduling and state correlation engine
//!
//! Decides when hosts and services are checked, turns raw results into
//! SOFT/HARD states, suppresses checks behind failed dependencies and
//! computes meta services from business rules.
//!
//! [`scheduler::Scheduler`] is the synchronous core;
//! [`actors::scheduler::SchedulerHandle`] drives it on a fixed cadence.

pub mod actors;
pub mod business_rule;
pub mod check;
pub mod config;
pub mod dependency;
pub mod error;
pub mod external_command;
pub mod item;
pub mod loader;
pub mod macros;
pub mod modulation;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod state_machine;
pub mod stats;
pub mod timeperiod;
pub mod util;
