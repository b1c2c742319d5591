//! Integration tests for the external command channel
//!
//! Commands are fed as raw lines, exactly as they arrive on the wire.

use guardia::external_command::Scope;
use guardia::item::State;
use guardia::scheduler::Scheduler;
use guardia::snapshot::SnapshotKind;
use pretty_assertions::assert_eq;

use crate::helpers::*;

fn create_passive_scheduler() -> Scheduler {
    create_test_scheduler(serde_json::json!({
        "hosts": [
            { "name": "web1", "check_command": "check_ping -p $_HOSTPORT$", "customs": { "_PORT": "80" } },
            { "name": "db1", "check_command": "check_ping" }
        ],
        "services": [
            { "host": "web1", "description": "http", "check_command": "check_http",
              "max_check_attempts": 1 }
        ]
    }))
}

fn apply(scheduler: &mut Scheduler, body: &str) -> bool {
    scheduler.handle_command_line(&command(body), test_now())
}

#[test]
fn test_passive_results_ignored_once_acceptance_stops() {
    let mut scheduler = create_passive_scheduler();

    assert!(apply(&mut scheduler, "PROCESS_SERVICE_CHECK_RESULT;web1;http;0;bobo"));
    assert_eq!(scheduler.get_state("web1/http").unwrap().output, "bobo");

    assert!(apply(&mut scheduler, "STOP_ACCEPTING_PASSIVE_SVC_CHECKS"));
    assert!(!scheduler.accepts_passive_checks(Scope::Services));

    assert!(apply(&mut scheduler, "PROCESS_SERVICE_CHECK_RESULT;web1;http;2;bobo2"));
    let state = scheduler.get_state("web1/http").unwrap();
    assert_eq!(state.output, "bobo");
    assert_eq!(state.state, State::Ok);

    // host results are still accepted
    assert!(scheduler.accepts_passive_checks(Scope::Hosts));
    assert!(apply(&mut scheduler, "PROCESS_HOST_CHECK_RESULT;db1;0;pong"));
    assert_eq!(scheduler.get_state("db1").unwrap().output, "pong");
}

#[test]
fn test_disabled_passive_checks_on_one_item() {
    let mut scheduler = create_passive_scheduler();

    assert!(apply(&mut scheduler, "DISABLE_PASSIVE_HOST_CHECKS;db1"));
    assert!(apply(&mut scheduler, "PROCESS_HOST_CHECK_RESULT;db1;1;down"));
    assert_eq!(scheduler.get_state("db1").unwrap().state, State::Up);
}

#[test]
fn test_add_and_delete_host_dependency() {
    let mut scheduler = create_passive_scheduler();
    assert!(!scheduler.is_linked_with("web1", "db1"));

    assert!(apply(&mut scheduler, "ADD_SIMPLE_HOST_DEPENDENCY;web1;db1"));
    assert!(scheduler.is_linked_with("web1", "db1"));
    assert!(!scheduler.is_linked_with("db1", "web1"));

    let snapshot = scheduler.snapshot("web1", SnapshotKind::Status).unwrap();
    assert_eq!(snapshot.get("depends_on"), Some(&serde_json::json!(1)));

    assert!(apply(&mut scheduler, "DEL_HOST_DEPENDENCY;web1;db1"));
    assert!(!scheduler.is_linked_with("web1", "db1"));

    // second delete is a no-op
    assert!(apply(&mut scheduler, "DEL_HOST_DEPENDENCY;web1;db1"));
    assert!(!scheduler.is_linked_with("web1", "db1"));
}

#[test]
fn test_added_dependency_suppresses_checks() {
    let mut scheduler = create_passive_scheduler();

    assert!(apply(&mut scheduler, "ADD_SIMPLE_HOST_DEPENDENCY;web1;db1"));
    assert!(apply(&mut scheduler, "PROCESS_HOST_CHECK_RESULT;db1;1;down"));
    assert!(apply(&mut scheduler, "PROCESS_HOST_CHECK_RESULT;db1;1;down"));
    assert!(apply(&mut scheduler, "PROCESS_HOST_CHECK_RESULT;db1;1;down"));
    assert_eq!(scheduler.get_state("db1").unwrap().state_type, guardia::item::StateType::Hard);

    let jobs = scheduler.schedule_due_checks(test_now());
    assert!(jobs.iter().all(|job| job.item != "web1"));
}

#[test]
fn test_unknown_target_and_command_are_rejected() {
    let mut scheduler = create_passive_scheduler();

    assert!(!apply(&mut scheduler, "PROCESS_HOST_CHECK_RESULT;ghost;0;ok"));
    assert!(!apply(&mut scheduler, "ADD_SIMPLE_HOST_DEPENDENCY;web1;ghost"));
    assert!(!apply(&mut scheduler, "LAUNCH_THE_MISSILES;web1"));
    assert!(!scheduler.handle_command_line("PROCESS_HOST_CHECK_RESULT;web1;0;ok", test_now()));
}

#[test]
fn test_commands_are_applied_at_end_of_cycle() {
    let mut scheduler = create_passive_scheduler();

    let report = scheduler.run_cycle(
        test_now(),
        vec![],
        vec![
            command("DISABLE_HOST_CHECK;db1"),
            command("NOT_A_COMMAND"),
            command("CHANGE_CUSTOM_HOST_VAR;web1;_PORT;8080"),
        ],
    );

    // jobs were planned before the commands ran
    assert_eq!(report.jobs.len(), 3);
    assert_eq!(report.commands_applied, 2);
    assert_eq!(report.commands_rejected, 1);

    let snapshot = scheduler.snapshot("db1", SnapshotKind::Status).unwrap();
    assert_eq!(snapshot.get("active_checks_enabled"), Some(&serde_json::json!(false)));
}

#[test]
fn test_custom_variable_change_reaches_next_command() {
    let mut scheduler = create_passive_scheduler();

    assert!(apply(&mut scheduler, "CHANGE_CUSTOM_HOST_VAR;web1;_PORT;8080"));
    let jobs = scheduler.schedule_due_checks(test_now());
    let web1 = jobs.iter().find(|job| job.item == "web1").unwrap();
    assert_eq!(web1.command, "check_ping -p 8080");
}

#[test]
fn test_interval_and_attempt_changes() {
    let mut scheduler = create_passive_scheduler();

    assert!(apply(&mut scheduler, "CHANGE_NORMAL_HOST_CHECK_INTERVAL;web1;10"));
    assert!(apply(&mut scheduler, "CHANGE_MAX_HOST_CHECK_ATTEMPTS;web1;1"));
    assert!(!apply(&mut scheduler, "CHANGE_MAX_HOST_CHECK_ATTEMPTS;web1;0"));

    let snapshot = scheduler.snapshot("web1", SnapshotKind::Status).unwrap();
    assert_eq!(snapshot.get("check_interval"), Some(&serde_json::json!(600)));
    assert_eq!(snapshot.get("max_check_attempts"), Some(&serde_json::json!(1)));
}

#[test]
fn test_schedule_check_moves_next_check_earlier_only() {
    let mut scheduler = create_passive_scheduler();
    let later = test_now().timestamp() + 3600;

    assert!(apply(&mut scheduler, &format!("SCHEDULE_HOST_CHECK;db1;{later}")));
    let snapshot = scheduler.snapshot("db1", SnapshotKind::NextSchedule).unwrap();
    assert_eq!(snapshot.get("next_check"), Some(&serde_json::json!(test_now())));
}
