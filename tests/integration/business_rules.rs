//! Integration tests for meta services computed from business rules

use guardia::item::{State, StateType};
use guardia::scheduler::Scheduler;
use pretty_assertions::assert_eq;

use crate::helpers::*;

fn create_rule_scheduler(rule: &str, propagate_impacts: bool) -> Scheduler {
    create_test_scheduler(serde_json::json!({
        "hosts": [
            { "name": "h1", "check_command": "check_ping", "max_check_attempts": 1 },
            { "name": "h2", "check_command": "check_ping", "max_check_attempts": 1 },
            { "name": "h3", "check_command": "check_ping", "max_check_attempts": 1 }
        ],
        "services": [
            { "host": "h1", "description": "bp", "business_rule": rule,
              "propagate_impacts": propagate_impacts, "max_check_attempts": 1 }
        ]
    }))
}

fn host_down(scheduler: &mut Scheduler, host: &str) {
    let line = command(&format!("PROCESS_HOST_CHECK_RESULT;{host};1;down"));
    assert!(scheduler.handle_command_line(&line, test_now()));
}

#[test]
fn test_meta_items_never_emit_jobs() {
    let mut scheduler = create_rule_scheduler("h1 & h2", true);

    let report = scheduler.run_cycle(test_now(), vec![], vec![]);
    assert!(report.jobs.iter().all(|job| job.item != "h1/bp"));
    assert_eq!(scheduler.get_state("h1/bp").unwrap().state, State::Ok);
}

#[test]
fn test_and_over_two_down_hosts_without_propagation_is_undetermined() {
    let mut scheduler = create_rule_scheduler("h1 & h2", false);

    host_down(&mut scheduler, "h1");
    host_down(&mut scheduler, "h2");
    scheduler.run_cycle(test_now(), vec![], vec![]);

    let state = scheduler.get_state("h1/bp").unwrap();
    assert_eq!(state.state, State::Undetermined);
    assert_eq!(state.state.id(), 4);
    assert_eq!(state.state_type, StateType::Hard);
}

#[test]
fn test_and_over_two_down_hosts_with_propagation_is_critical() {
    let mut scheduler = create_rule_scheduler("h1 & h2", true);

    host_down(&mut scheduler, "h1");
    host_down(&mut scheduler, "h2");
    scheduler.run_cycle(test_now(), vec![], vec![]);

    let state = scheduler.get_state("h1/bp").unwrap();
    assert_eq!(state.state, State::Critical);
    assert!(state.output.contains("h1"));
}

#[test]
fn test_or_tolerates_one_failure() {
    let mut scheduler = create_rule_scheduler("h1 | h2", true);

    host_down(&mut scheduler, "h1");
    scheduler.run_cycle(test_now(), vec![], vec![]);
    assert_eq!(scheduler.get_state("h1/bp").unwrap().state, State::Ok);

    host_down(&mut scheduler, "h2");
    scheduler.run_cycle(test_now(), vec![], vec![]);
    assert_eq!(scheduler.get_state("h1/bp").unwrap().state, State::Critical);
}

#[test]
fn test_of_threshold_over_hosts() {
    let mut scheduler = create_rule_scheduler("2 of: h1 | h2 | h3", true);

    host_down(&mut scheduler, "h3");
    scheduler.run_cycle(test_now(), vec![], vec![]);
    assert_eq!(scheduler.get_state("h1/bp").unwrap().state, State::Ok);

    host_down(&mut scheduler, "h2");
    scheduler.run_cycle(test_now(), vec![], vec![]);
    assert_eq!(scheduler.get_state("h1/bp").unwrap().state, State::Critical);
}

#[test]
fn test_recovery_flows_back_into_meta_item() {
    let mut scheduler = create_rule_scheduler("h1 & h2", true);

    host_down(&mut scheduler, "h2");
    scheduler.run_cycle(test_now(), vec![], vec![]);
    assert_eq!(scheduler.get_state("h1/bp").unwrap().state, State::Critical);

    let line = command("PROCESS_HOST_CHECK_RESULT;h2;0;up");
    assert!(scheduler.handle_command_line(&line, test_now()));
    scheduler.run_cycle(test_now(), vec![], vec![]);
    assert_eq!(scheduler.get_state("h1/bp").unwrap().state, State::Ok);
}

#[test]
fn test_passive_results_for_meta_items_are_refused() {
    let mut scheduler = create_rule_scheduler("h1 & h2", true);

    let line = command("PROCESS_SERVICE_CHECK_RESULT;h1;bp;2;forced");
    assert!(scheduler.handle_command_line(&line, test_now()));
    assert_eq!(scheduler.get_state("h1/bp").unwrap().state, State::Ok);
}
