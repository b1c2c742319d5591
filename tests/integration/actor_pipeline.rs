//! Integration tests for the full actor pipeline
//!
//! These tests verify that the pieces work together:
//! - SchedulerActor → ChannelExecutor → worker → results back
//! - events reach every broadcast subscriber
//! - graceful shutdown

use std::sync::Arc;

use chrono::Utc;
use guardia::actors::executor::ChannelExecutor;
use guardia::actors::messages::EngineEvent;
use guardia::actors::scheduler::SchedulerHandle;
use guardia::check::{CheckJob, CheckResult};
use guardia::item::State;
use guardia::scheduler::Scheduler;
use guardia::snapshot::SnapshotKind;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, timeout};

use crate::helpers::*;

fn spawn_pipeline() -> (SchedulerHandle, mpsc::Receiver<CheckJob>, broadcast::Sender<EngineEvent>) {
    let config = create_test_config(create_two_host_config());
    let scheduler = Scheduler::new(&config, Utc::now()).unwrap();

    let (executor, jobs) = ChannelExecutor::channel(32);
    let (event_tx, _event_rx) = broadcast::channel(256);
    let handle = SchedulerHandle::spawn(scheduler, Arc::new(executor), event_tx.clone());

    (handle, jobs, event_tx)
}

/// Answers every job with the given code, like an external worker would
fn spawn_worker(handle: SchedulerHandle, mut jobs: mpsc::Receiver<CheckJob>, code: i32) {
    tokio::spawn(async move {
        while let Some(job) = jobs.recv().await {
            let output = format!("{} answered {code}", job.command);
            if handle.submit_result(CheckResult::new(job.check_id, code, output)).await.is_err() {
                break;
            }
        }
    });
}

#[tokio::test]
async fn test_jobs_flow_to_worker_and_results_back() {
    let (handle, jobs, _event_tx) = spawn_pipeline();
    spawn_worker(handle.clone(), jobs, 2);

    let report = handle.run_cycle().await.unwrap();
    assert_eq!(report.jobs.len(), 3);

    // results arrive asynchronously; keep cycling until all are in
    let mut applied = 0;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        applied += handle.run_cycle().await.unwrap().results_applied;
        if applied == 3 {
            break;
        }
    }
    assert_eq!(applied, 3);

    let http = handle.get_state("web1/http").await.unwrap().unwrap();
    assert_eq!(http.state, State::Critical);
    assert_eq!(http.output, "check_http answered 2");

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.checks_in_progress, 0);
    assert!(stats.latency.is_some());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_every_subscriber_sees_hard_changes() {
    let (handle, _jobs, event_tx) = spawn_pipeline();
    let mut first = event_tx.subscribe();
    let mut second = event_tx.subscribe();

    handle
        .send_external_command(command("PROCESS_HOST_CHECK_RESULT;router;1;down"))
        .await
        .unwrap();
    handle.run_cycle().await.unwrap();

    for receiver in [&mut first, &mut second] {
        let mut found = false;
        while let Ok(Ok(event)) = timeout(Duration::from_millis(200), receiver.recv()).await {
            if let EngineEvent::HardStateChange { item, state, .. } = event {
                assert_eq!(item, "router");
                assert_eq!(state, State::Down);
                found = true;
                break;
            }
        }
        assert!(found);
    }

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dependency_commands_through_actor() {
    let (handle, _jobs, _event_tx) = spawn_pipeline();

    assert!(handle.is_linked_with("web1", "router").await.unwrap());
    assert!(!handle.is_linked_with("router", "web1").await.unwrap());

    handle
        .send_external_command(command("ADD_SIMPLE_HOST_DEPENDENCY;router;web1"))
        .await
        .unwrap();
    handle.run_cycle().await.unwrap();
    assert!(handle.is_linked_with("router", "web1").await.unwrap());

    handle
        .send_external_command(command("DEL_HOST_DEPENDENCY;router;web1"))
        .await
        .unwrap();
    handle.run_cycle().await.unwrap();
    assert!(!handle.is_linked_with("router", "web1").await.unwrap());

    let snapshot = handle.snapshot("router", SnapshotKind::Status).await.unwrap().unwrap();
    assert_eq!(snapshot.get("dependents"), Some(&serde_json::json!(1)));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reload_through_actor() {
    let (handle, _jobs, _event_tx) = spawn_pipeline();

    let mut json = create_two_host_config();
    json["hosts"][0]["name"] = serde_json::json!("gateway");
    json["hosts"][1]["parents"] = serde_json::json!(["gateway"]);
    handle.reload(create_test_config(json)).await.unwrap();

    assert!(handle.get_state("router").await.unwrap().is_none());
    assert!(handle.get_state("gateway").await.unwrap().is_some());
    assert_eq!(handle.stats().await.unwrap().generation, 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dropping_every_handle_stops_actor() {
    let (handle, mut jobs, _event_tx) = spawn_pipeline();
    handle.run_cycle().await.unwrap();
    drop(handle);

    // the executor is dropped with the actor, closing the job queue
    let drained = timeout(Duration::from_secs(1), async {
        while jobs.recv().await.is_some() {}
    })
    .await;
    assert!(drained.is_ok());
}
