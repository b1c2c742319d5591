//! Integration tests for full scheduling cycles
//!
//! These tests drive the engine through `run_cycle` the way the actor does:
//! - due checks become jobs, results become states
//! - dependencies suppress checks and turn DOWN into UNREACHABLE
//! - reloads keep state and drop stale results

use chrono::Duration;
use guardia::check::CheckResult;
use guardia::item::{State, StateType};
use guardia::scheduler::{DiscardReason, EngineEvent, ResultDisposition};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[test]
fn test_cycle_emits_jobs_and_applies_results() {
    let mut scheduler = create_test_scheduler(create_two_host_config());
    let now = test_now();

    let report = scheduler.run_cycle(now, vec![], vec![]);
    assert_eq!(report.cycle, 1);
    assert_eq!(report.jobs.len(), 3);

    let results = report
        .jobs
        .iter()
        .map(|job| CheckResult::new(job.check_id, 0, "all good"))
        .collect();
    let report = scheduler.run_cycle(now + Duration::seconds(1), results, vec![]);
    assert_eq!(report.results_applied, 3);
    assert!(report.jobs.is_empty());

    let state = scheduler.get_state("web1/http").unwrap();
    assert_eq!(state.state, State::Ok);
    assert_eq!(state.output, "all good");
    assert_eq!(scheduler.stats().checks_in_progress, 0);
}

#[test]
fn test_down_host_suppresses_its_service() {
    let mut scheduler = create_test_scheduler(create_two_host_config());
    let now = test_now();

    assert!(scheduler.handle_command_line(&command("PROCESS_HOST_CHECK_RESULT;web1;1;down"), now));
    assert_eq!(scheduler.get_state("web1").unwrap().state, State::Down);

    let jobs = scheduler.schedule_due_checks(now);
    let items: Vec<&str> = jobs.iter().map(|job| job.item.as_str()).collect();
    assert_eq!(items, vec!["router", "web1"]);

    // still due, picked up once the host recovers
    assert!(scheduler.handle_command_line(&command("PROCESS_HOST_CHECK_RESULT;web1;0;up"), now));
    let jobs = scheduler.schedule_due_checks(now);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].item, "web1/http");
}

#[test]
fn test_down_behind_down_parent_becomes_unreachable() {
    let mut scheduler = create_test_scheduler(create_two_host_config());
    let now = test_now();
    let jobs = scheduler.run_cycle(now, vec![], vec![]).jobs;

    let router = jobs.iter().find(|job| job.item == "router").unwrap().check_id;
    scheduler.run_cycle(now, vec![CheckResult::new(router, 1, "no reply")], vec![]);
    assert_eq!(scheduler.get_state("router").unwrap().state, State::Down);

    let web1 = jobs.iter().find(|job| job.item == "web1").unwrap().check_id;
    scheduler.run_cycle(now, vec![CheckResult::new(web1, 1, "no reply")], vec![]);

    let state = scheduler.get_state("web1").unwrap();
    assert_eq!(state.state, State::Unreachable);
    assert_eq!(state.state_type, StateType::Hard);
}

#[test]
fn test_soft_states_until_attempts_exhausted() {
    let mut scheduler = create_test_scheduler(serde_json::json!({
        "hosts": [{ "name": "db1", "check_command": "check_ping", "max_check_attempts": 3 }]
    }));
    let mut now = test_now();

    let mut types = Vec::new();
    for _ in 0..3 {
        let jobs = scheduler.schedule_due_checks(now);
        assert_eq!(jobs.len(), 1);
        scheduler.submit_check_result(CheckResult::new(jobs[0].check_id, 1, "timeout"), now);
        types.push(scheduler.get_state("db1").unwrap().state_type);

        // retry interval defaults to one minute
        now += Duration::seconds(60);
    }

    assert_eq!(types, vec![StateType::Soft, StateType::Soft, StateType::Hard]);
    let events = scheduler.drain_events();
    let hard_changes = events
        .iter()
        .filter(|event| matches!(event, EngineEvent::HardStateChange { .. }))
        .count();
    assert_eq!(hard_changes, 1);
}

#[test]
fn test_reload_keeps_state_and_discards_in_flight_results() {
    let json = create_two_host_config();
    let mut scheduler = create_test_scheduler(json.clone());
    let now = test_now();

    let jobs = scheduler.schedule_due_checks(now);
    let web1 = jobs.iter().find(|job| job.item == "web1").unwrap().check_id;
    assert!(scheduler.handle_command_line(&command("PROCESS_HOST_CHECK_RESULT;router;1;down"), now));

    scheduler.reload(&create_test_config(json), now).unwrap();
    assert_eq!(scheduler.generation(), 1);
    assert_eq!(scheduler.get_state("router").unwrap().state, State::Down);

    let disposition = scheduler.submit_check_result(CheckResult::new(web1, 1, "late"), now);
    assert_eq!(disposition, ResultDisposition::Discarded(DiscardReason::Stale));
    assert_eq!(scheduler.get_state("web1").unwrap().state, State::Up);
}

#[test]
fn test_invalid_reload_keeps_running_topology() {
    let mut scheduler = create_test_scheduler(create_two_host_config());

    let broken = create_test_config(serde_json::json!({
        "hosts": [{ "name": "a" }, { "name": "a" }]
    }));
    let invalid = scheduler.reload(&broken, test_now()).unwrap_err();

    assert!(!invalid.errors.is_empty());
    assert_eq!(scheduler.generation(), 0);
    assert!(scheduler.get_state("web1/http").is_some());
}

#[test]
fn test_check_period_defers_checks() {
    let mut scheduler = create_test_scheduler(serde_json::json!({
        "timeperiods": [{ "name": "weekend", "ranges": ["saturday 00:00-24:00", "sunday 00:00-24:00"] }],
        "hosts": [{ "name": "batch", "check_command": "check_batch", "check_period": "weekend" }]
    }));

    assert!(scheduler.schedule_due_checks(test_now()).is_empty());

    // Monday noon, next active instant is Saturday midnight
    let snapshot = scheduler
        .snapshot("batch", guardia::snapshot::SnapshotKind::NextSchedule)
        .unwrap();
    assert!(snapshot.get("next_check").is_some_and(|next| !next.is_null()));
    let saturday = test_now() + Duration::days(4) + Duration::hours(12);
    assert_eq!(scheduler.schedule_due_checks(saturday).len(), 1);
}

fn create_modulated_scheduler(order: [&str; 2]) -> guardia::scheduler::Scheduler {
    create_test_scheduler(serde_json::json!({
        "timeperiods": [{ "name": "always", "ranges": ["day 00:00-24:00"] }],
        "macro_modulations": [
            { "name": "M1", "period": "always", "customs": { "_VALUE": "M1" } },
            { "name": "M2", "period": "always", "customs": { "_VALUE": "M2" } }
        ],
        "hosts": [{ "name": "web1", "check_command": "check_value -v $_HOSTVALUE$",
                    "macro_modulations": order, "customs": { "_VALUE": "base" } }]
    }))
}

#[test]
fn test_first_active_macro_modulation_wins() {
    let mut scheduler = create_modulated_scheduler(["M1", "M2"]);
    let jobs = scheduler.schedule_due_checks(test_now());
    assert_eq!(jobs[0].command, "check_value -v M1");

    // attachment order decides, not declaration order
    let mut scheduler = create_modulated_scheduler(["M2", "M1"]);
    let jobs = scheduler.schedule_due_checks(test_now());
    assert_eq!(jobs[0].command, "check_value -v M2");
}

#[test]
fn test_latency_is_recorded() {
    let mut scheduler = create_test_scheduler(serde_json::json!({
        "hosts": [{ "name": "web1", "check_command": "check_ping" }]
    }));

    // planned at test_now(), launched two seconds late
    let launched = test_now() + Duration::seconds(2);
    let jobs = scheduler.schedule_due_checks(launched);
    scheduler.submit_check_result(CheckResult::new(jobs[0].check_id, 0, "ok"), launched);

    let latency = scheduler.stats().latency.unwrap();
    assert_eq!(latency.avg, 2.0);
}
