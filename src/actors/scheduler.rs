//! SchedulerActor - Drives the engine on a fixed cadence
//!
//! The actor owns the [`Scheduler`] exclusively. Nothing else touches the
//! engine state; everything goes through [`SchedulerHandle`].
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → run cycle → CheckJobs → CheckExecutor
//!     ↑            │
//!     │            └─── EngineEvents → broadcast → [subscribers]
//!     │
//!     └─── Commands (SubmitResult, ExternalCommand, queries, Reload, Shutdown)
//! ```
//!
//! Results and external command lines are buffered between ticks and handed
//! to the engine together, so a cycle always sees a consistent batch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, instrument, trace, warn};

use crate::check::{CheckJob, CheckResult};
use crate::config::Config;
use crate::scheduler::{CycleReport, ItemState, Scheduler};
use crate::snapshot::{Snapshot, SnapshotKind};
use crate::stats::SchedulerStats;

use super::executor::CheckExecutor;
use super::messages::{EngineEvent, SchedulerCommand};

/// Actor wrapping one [`Scheduler`]
pub struct SchedulerActor {
    /// The engine itself
    scheduler: Scheduler,

    /// Collaborator that starts the emitted checks
    executor: Arc<dyn CheckExecutor>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<SchedulerCommand>,

    /// Weak sender used to feed launch failures back as results
    ///
    /// Weak so that dropping every handle still closes the channel.
    feedback_tx: mpsc::WeakSender<SchedulerCommand>,

    /// Broadcast sender for engine events
    event_tx: broadcast::Sender<EngineEvent>,

    /// Results received since the last cycle
    pending_results: Vec<CheckResult>,

    /// External command lines received since the last cycle
    pending_commands: Vec<String>,

    interval_duration: Duration,
}

impl SchedulerActor {
    pub fn new(
        scheduler: Scheduler,
        executor: Arc<dyn CheckExecutor>,
        command_rx: mpsc::Receiver<SchedulerCommand>,
        feedback_tx: mpsc::WeakSender<SchedulerCommand>,
        event_tx: broadcast::Sender<EngineEvent>,
    ) -> Self {
        let interval_duration = Duration::from_millis(scheduler.settings().cycle_interval_ms.max(1));

        Self {
            scheduler,
            executor,
            command_rx,
            feedback_tx,
            event_tx,
            pending_results: Vec::new(),
            pending_commands: Vec::new(),
            interval_duration,
        }
    }

    /// Run the actor's main loop
    ///
    /// This runs until:
    /// - A Shutdown command is received
    /// - Every handle has been dropped
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting scheduler actor");

        let mut ticker = self.ticker();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.cycle();
                }

                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        warn!("command channel closed, shutting down");
                        break;
                    };

                    match cmd {
                        SchedulerCommand::SubmitResult(result) => {
                            trace!("buffering result for {}", result.check_id);
                            self.pending_results.push(result);
                        }

                        SchedulerCommand::ExternalCommand(line) => {
                            trace!("buffering external command");
                            self.pending_commands.push(line);
                        }

                        SchedulerCommand::RunCycle { respond_to } => {
                            debug!("received RunCycle command");
                            let report = self.cycle();
                            let _ = respond_to.send(report);
                        }

                        SchedulerCommand::GetState { name, respond_to } => {
                            let _ = respond_to.send(self.scheduler.get_state(&name));
                        }

                        SchedulerCommand::IsLinkedWith { source, target, respond_to } => {
                            let _ = respond_to.send(self.scheduler.is_linked_with(&source, &target));
                        }

                        SchedulerCommand::Snapshot { name, kind, respond_to } => {
                            let _ = respond_to.send(self.scheduler.snapshot(&name, kind));
                        }

                        SchedulerCommand::GetStats { respond_to } => {
                            let _ = respond_to.send(self.scheduler.stats());
                        }

                        SchedulerCommand::Reload { config, respond_to } => {
                            debug!("received Reload command");
                            let result = self.scheduler.reload(&config, Utc::now());
                            if result.is_ok() {
                                self.interval_duration = Duration::from_millis(
                                    self.scheduler.settings().cycle_interval_ms.max(1),
                                );
                                ticker = self.ticker();
                            }
                            let _ = respond_to.send(result);
                        }

                        SchedulerCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }
            }
        }

        debug!("scheduler actor stopped");
    }

    /// First tick one interval from now, late ticks are skipped
    fn ticker(&self) -> tokio::time::Interval {
        let mut ticker = interval_at(Instant::now() + self.interval_duration, self.interval_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    /// Run one engine cycle, dispatch its jobs and publish its events
    fn cycle(&mut self) -> CycleReport {
        let results = std::mem::take(&mut self.pending_results);
        let commands = std::mem::take(&mut self.pending_commands);

        let report = self.scheduler.run_cycle(Utc::now(), results, commands);

        for job in &report.jobs {
            self.launch(job.clone());
        }

        for event in self.scheduler.drain_events() {
            // No subscribers is fine.
            match self.event_tx.send(event) {
                Ok(receivers) => trace!("published engine event to {receivers} receivers"),
                Err(_) => trace!("no receivers for engine event"),
            }
        }

        report
    }

    /// Hand a job to the executor without blocking the loop
    ///
    /// A failed launch comes back as an UNKNOWN result on the next cycle.
    fn launch(&self, job: CheckJob) {
        let executor = Arc::clone(&self.executor);
        let feedback_tx = self.feedback_tx.clone();

        tokio::spawn(async move {
            let check_id = job.check_id;
            if let Err(e) = executor.launch(job).await {
                error!("failed to launch {check_id}: {e:#}");

                let Some(sender) = feedback_tx.upgrade() else {
                    return;
                };
                let result = CheckResult::launch_failure(check_id, &format!("{e:#}"));
                if sender.send(SchedulerCommand::SubmitResult(result)).await.is_err() {
                    warn!("scheduler gone, dropping launch failure for {check_id}");
                }
            }
        });
    }
}

/// Handle for controlling a SchedulerActor
///
/// Cheap to clone; every clone talks to the same actor.
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Spawn the actor as a tokio task and return a handle to it
    pub fn spawn(
        scheduler: Scheduler,
        executor: Arc<dyn CheckExecutor>,
        event_tx: broadcast::Sender<EngineEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = SchedulerActor::new(scheduler, executor, cmd_rx, cmd_tx.downgrade(), event_tx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Queue a check result for the next cycle
    pub async fn submit_result(&self, result: CheckResult) -> Result<()> {
        self.sender
            .send(SchedulerCommand::SubmitResult(result))
            .await
            .context("failed to send SubmitResult command")?;
        Ok(())
    }

    /// Queue a raw external command line for the next cycle
    pub async fn send_external_command(&self, line: impl Into<String>) -> Result<()> {
        self.sender
            .send(SchedulerCommand::ExternalCommand(line.into()))
            .await
            .context("failed to send ExternalCommand command")?;
        Ok(())
    }

    /// Run a cycle immediately, bypassing the interval timer
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::RunCycle { respond_to: tx })
            .await
            .context("failed to send RunCycle command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn get_state(&self, name: &str) -> Result<Option<ItemState>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::GetState {
                name: name.to_string(),
                respond_to: tx,
            })
            .await
            .context("failed to send GetState command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn is_linked_with(&self, source: &str, target: &str) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::IsLinkedWith {
                source: source.to_string(),
                target: target.to_string(),
                respond_to: tx,
            })
            .await
            .context("failed to send IsLinkedWith command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn snapshot(&self, name: &str, kind: SnapshotKind) -> Result<Option<Snapshot>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::Snapshot {
                name: name.to_string(),
                kind,
                respond_to: tx,
            })
            .await
            .context("failed to send Snapshot command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn stats(&self) -> Result<SchedulerStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::GetStats { respond_to: tx })
            .await
            .context("failed to send GetStats command")?;

        rx.await.context("failed to receive response")
    }

    /// Replace the running configuration
    ///
    /// Fails, keeping the old configuration, when the new one does not load.
    pub async fn reload(&self, config: Config) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::Reload {
                config: Box::new(config),
                respond_to: tx,
            })
            .await
            .context("failed to send Reload command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    /// Gracefully shut down the scheduler
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SchedulerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
