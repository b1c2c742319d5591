//! Helper functions for integration tests

use chrono::{DateTime, TimeZone, Utc};
use guardia::config::Config;
use guardia::scheduler::Scheduler;

/// 2024-01-01 12:00:00 UTC, a Monday
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn create_test_config(json: serde_json::Value) -> Config {
    serde_json::from_value(json).unwrap()
}

pub fn create_test_scheduler(json: serde_json::Value) -> Scheduler {
    Scheduler::new(&create_test_config(json), test_now()).unwrap()
}

/// Two hosts with one service each, every check confirming on the first attempt
pub fn create_two_host_config() -> serde_json::Value {
    serde_json::json!({
        "scheduler": { "cycle_interval_ms": 3_600_000 },
        "hosts": [
            { "name": "router", "check_command": "check_ping", "max_check_attempts": 1 },
            { "name": "web1", "check_command": "check_ping", "max_check_attempts": 1,
              "parents": ["router"] }
        ],
        "services": [
            { "host": "web1", "description": "http", "check_command": "check_http",
              "max_check_attempts": 1 }
        ]
    })
}

/// Build an external command line stamped with `test_now()`
pub fn command(body: &str) -> String {
    format!("[{}] {body}", test_now().timestamp())
}
