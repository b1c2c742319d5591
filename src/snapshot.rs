//! Event snapshots
//!
//! A snapshot is a flat, serializable view of one item taken when something
//! about it changed. Downstream consumers (status retention, brokers) only
//! ever see snapshots, never the live items.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};

use crate::item::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    /// After a check result was applied
    CheckResult,

    /// Full status, after topology or toggle changes
    Status,

    /// The next planned check
    NextSchedule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub kind: SnapshotKind,
    pub item: String,
    pub fields: BTreeMap<String, Value>,
}

impl Snapshot {
    pub fn of(item: &Item, kind: SnapshotKind) -> Self {
        let mut fields = BTreeMap::new();
        let mut put = |key: &str, value: Value| {
            fields.insert(key.to_string(), value);
        };

        match kind {
            SnapshotKind::CheckResult => {
                put("command_name", json!(item.command_name()));
                put("state", json!(item.state));
                put("state_id", json!(item.state.id()));
                put("state_type", json!(item.state_type));
                put("attempt", json!(item.attempt_count));
                put("max_check_attempts", json!(item.max_check_attempts));
                put("output", json!(item.output));
                put("latency", json!(item.latency));
                put("last_check", json!(item.last_check_time));
                put("last_hard_state", json!(item.last_hard_state));
            }
            SnapshotKind::Status => {
                put("kind", json!(item.kind));
                put("state", json!(item.state));
                put("state_type", json!(item.state_type));
                put("last_hard_state", json!(item.last_hard_state));
                put("attempt", json!(item.attempt_count));
                put("max_check_attempts", json!(item.max_check_attempts));
                put("check_interval", json!(item.check_interval));
                put("retry_interval", json!(item.retry_interval));
                put("active_checks_enabled", json!(item.active_checks_enabled));
                put("passive_checks_enabled", json!(item.passive_checks_enabled));
                put("business_impact", json!(item.business_impact));
                put("output", json!(item.output));
                put("customs", json!(item.customs));
                put("depends_on", json!(item.act_depend_of.len()));
                put("dependents", json!(item.act_depend_of_me.len()));
                put("topology_change", json!(item.topology_change));
            }
            SnapshotKind::NextSchedule => {
                put("next_check", json!(item.next_check));
                put("in_progress", json!(!item.checks_in_progress.is_empty()));
            }
        }

        Self {
            kind,
            item: item.name.clone(),
            fields,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}
