//! Check records and the messages exchanged with the execution collaborator

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::item::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CheckId(pub u64);

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "check-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Scheduled,
    InProgress,
    Completed,

    /// Superseded by a reload or a forced recheck; its result will be dropped
    Discarded,
}

/// One execution of an item's command
#[derive(Debug, Clone)]
pub struct Check {
    pub id: CheckId,
    pub item: ItemId,

    /// Fully resolved command line
    pub command: String,

    pub status: CheckStatus,
    pub return_code: Option<i32>,
    pub output: Option<String>,

    /// When the item was due
    pub scheduled_at: DateTime<Utc>,

    /// When the job was handed to the executor
    pub launched_at: Option<DateTime<Utc>>,

    pub finished_at: Option<DateTime<Utc>>,

    /// Scheduler generation at creation time
    pub generation: u64,

    /// Item generation at creation time
    pub item_generation: u64,
}

impl Check {
    pub fn active(
        id: CheckId,
        item: ItemId,
        command: String,
        scheduled_at: DateTime<Utc>,
        generation: u64,
        item_generation: u64,
    ) -> Self {
        Self {
            id,
            item,
            command,
            status: CheckStatus::Scheduled,
            return_code: None,
            output: None,
            scheduled_at,
            launched_at: None,
            finished_at: None,
            generation,
            item_generation,
        }
    }

    /// Seconds between the planned and the actual launch of the check
    pub fn latency(&self) -> f64 {
        match self.launched_at {
            Some(launched) => {
                let millis = (launched - self.scheduled_at).num_milliseconds().max(0);
                millis as f64 / 1000.0
            }
            None => 0.0,
        }
    }

    /// A check is stale once either generation it was created under moved on
    pub fn is_stale(&self, generation: u64, item_generation: u64) -> bool {
        self.status == CheckStatus::Discarded
            || self.generation != generation
            || self.item_generation != item_generation
    }
}

/// Job handed to the execution collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckJob {
    pub check_id: CheckId,
    pub item: String,
    pub command: String,
    pub scheduled_at: DateTime<Utc>,
}

/// Result returned by the execution collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_id: CheckId,
    pub return_code: i32,

    #[serde(default)]
    pub output: String,

    /// Execution time; defaults to the arrival time
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CheckResult {
    pub fn new(check_id: CheckId, return_code: i32, output: impl Into<String>) -> Self {
        Self {
            check_id,
            return_code,
            output: output.into(),
            timestamp: None,
        }
    }

    /// Result reported when the job could not be started at all
    pub fn launch_failure(check_id: CheckId, reason: &str) -> Self {
        Self::new(check_id, 3, format!("UNKNOWN: check could not be launched: {reason}"))
    }
}
