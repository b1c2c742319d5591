//! Check scheduler
//!
//! The [`Scheduler`] owns one topology (items, dependency edges, business
//! rules, time periods, modulations) and drives it one cycle at a time.
//! It never blocks and never performs I/O; the actor in
//! [`crate::actors::scheduler`] feeds it results and commands and hands the
//! emitted jobs to an executor.
//!
//! ## Cycle
//!
//! ```text
//! due selection ──▶ CheckJobs ──▶ (executor)
//!      │
//! result intake ──▶ state machine ──▶ dirty business rules
//!      │
//! ticks: business rules · impact modulation · stats
//!      │
//! external commands (edges, toggles, passive results, forced checks)
//! ```
//!
//! Two generation counters protect against stale results: a global one bumped
//! on reload and a per-item one bumped by forced rechecks.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::business_rule::RuleSet;
use crate::check::{Check, CheckId, CheckJob, CheckResult, CheckStatus};
use crate::config::{Config, SchedulerSettings};
use crate::dependency::{self, DependencyEdge, DependencyKind, Suppression};
use crate::error::{CommandError, InvalidConfig};
use crate::external_command::{self, Action, ExternalCommand, Scope, Target};
use crate::item::{Item, ItemId, ItemKind, MAX_INTERVAL_SECONDS, Monitored, State, StateType, Transition};
use crate::loader::{self, Topology};
use crate::macros::MacroContext;
use crate::registry::Registry;
use crate::snapshot::{Snapshot, SnapshotKind};
use crate::stats::{LatencyStats, SchedulerStats};

/// Something downstream consumers should know about
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    CheckResult(Snapshot),
    Status(Snapshot),
    NextSchedule(Snapshot),

    /// The confirmed state changed; the item is eligible for notification
    HardStateChange {
        item: String,
        previous: State,
        state: State,
        attempt: u32,
        output: String,
    },

    Stats(SchedulerStats),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    UnknownCheck,

    /// Superseded by a reload or a forced recheck
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultDisposition {
    Applied(Transition),
    Discarded(DiscardReason),
}

/// Compact state view returned by queries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemState {
    pub name: String,
    pub state: State,
    pub state_type: StateType,
    pub last_hard_state: State,
    pub attempt: u32,
    pub output: String,
}

impl From<&Item> for ItemState {
    fn from(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            state: item.state,
            state_type: item.state_type,
            last_hard_state: item.last_hard_state,
            attempt: item.attempt_count,
            output: item.output.clone(),
        }
    }
}

/// What one cycle did
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: u64,
    pub jobs: Vec<CheckJob>,
    pub results_applied: usize,
    pub results_discarded: usize,
    pub commands_applied: usize,
    pub commands_rejected: usize,
}

pub struct Scheduler {
    settings: SchedulerSettings,
    topology: Topology,

    /// Launched checks that were not answered yet
    checks: HashMap<CheckId, Check>,
    next_check_id: u64,

    /// Bumped on every reload
    generation: u64,
    cycle: u64,

    accept_passive_host_checks: bool,
    accept_passive_service_checks: bool,

    latency: LatencyStats,

    /// Meta items whose business rule must be recomputed
    dirty_rules: BTreeSet<ItemId>,

    events: Vec<EngineEvent>,

    /// Time zone time periods are evaluated in
    offset: FixedOffset,
}

impl Scheduler {
    pub fn new(config: &Config, now: DateTime<Utc>) -> Result<Self, InvalidConfig> {
        let topology = loader::build(config)?;

        let mut scheduler = Self {
            settings: config.scheduler.clone(),
            topology,
            checks: HashMap::new(),
            next_check_id: 0,
            generation: 0,
            cycle: 0,
            accept_passive_host_checks: config.scheduler.accept_passive_host_checks,
            accept_passive_service_checks: config.scheduler.accept_passive_service_checks,
            latency: LatencyStats::new(config.scheduler.latency_window),
            dirty_rules: BTreeSet::new(),
            events: Vec::new(),
            offset: offset(&config.scheduler),
        };
        scheduler.start(now);

        debug!(
            "scheduler ready with {} items",
            scheduler.topology.registry.len()
        );
        Ok(scheduler)
    }

    /// Plan the first check of every item and queue every rule
    fn start(&mut self, now: DateTime<Utc>) {
        for item in self.topology.registry.iter_mut() {
            if item.next_check.is_none() {
                item.next_check = Some(now);
            }
            if item.is_meta() {
                self.dirty_rules.insert(item.id);
            }
        }
    }

    /// Replace the topology, carrying runtime state across by unique name
    ///
    /// An invalid configuration leaves the running topology untouched.
    /// Checks still in flight are discarded.
    #[instrument(skip(self, config))]
    pub fn reload(&mut self, config: &Config, now: DateTime<Utc>) -> Result<(), InvalidConfig> {
        let mut topology = loader::build(config)?;

        for item in topology.registry.iter_mut() {
            let Some(old) = self
                .topology
                .registry
                .resolve(&item.name)
                .and_then(|id| self.topology.registry.get(id))
            else {
                continue;
            };
            if old.kind != item.kind {
                continue;
            }

            item.state = old.state;
            item.state_type = old.state_type;
            item.last_state = old.last_state;
            item.last_hard_state = old.last_hard_state;
            item.attempt_count = old.attempt_count;
            item.output = old.output.clone();
            item.latency = old.latency;
            item.has_been_checked = old.has_been_checked;
            item.last_check_time = old.last_check_time;
            item.last_state_change = old.last_state_change;
            item.last_hard_state_change = old.last_hard_state_change;
            item.next_check = old.next_check;
        }

        self.generation += 1;
        for check in self.checks.values_mut() {
            check.status = CheckStatus::Discarded;
        }

        self.topology = topology;
        self.settings = config.scheduler.clone();
        self.offset = offset(&config.scheduler);
        self.accept_passive_host_checks = config.scheduler.accept_passive_host_checks;
        self.accept_passive_service_checks = config.scheduler.accept_passive_service_checks;
        if self.settings.latency_window != self.latency.capacity() {
            self.latency = LatencyStats::new(self.settings.latency_window);
        }
        self.dirty_rules.clear();
        self.start(now);

        for id in self.topology.registry.ids() {
            self.emit(id, SnapshotKind::Status);
        }

        debug!(
            "reloaded configuration, generation {}, {} items",
            self.generation,
            self.topology.registry.len()
        );
        Ok(())
    }

    /// Run one full scheduling cycle
    #[instrument(skip_all)]
    pub fn run_cycle(
        &mut self,
        now: DateTime<Utc>,
        results: Vec<CheckResult>,
        commands: Vec<String>,
    ) -> CycleReport {
        self.cycle += 1;
        let mut report = CycleReport {
            cycle: self.cycle,
            jobs: self.schedule_due_checks(now),
            ..CycleReport::default()
        };

        for result in results {
            match self.submit_check_result(result, now) {
                ResultDisposition::Applied(_) => report.results_applied += 1,
                ResultDisposition::Discarded(_) => report.results_discarded += 1,
            }
        }

        if self.is_tick(self.settings.business_rule_tick) {
            self.refresh_business_rules(now);
        }
        if self.is_tick(self.settings.impact_modulation_tick) {
            self.apply_impact_modulations(now);
        }
        if self.is_tick(self.settings.stats_tick) {
            self.purge_discarded_checks();
            let stats = self.stats();
            self.events.push(EngineEvent::Stats(stats));
        }

        for line in commands {
            if self.handle_command_line(&line, now) {
                report.commands_applied += 1;
            } else {
                report.commands_rejected += 1;
            }
        }

        trace!(
            "cycle done: {} jobs, {} results, {} commands",
            report.jobs.len(),
            report.results_applied,
            report.commands_applied
        );
        report
    }

    fn is_tick(&self, every: u64) -> bool {
        self.cycle % every.max(1) == 0
    }

    /// Select due items and turn them into check jobs
    ///
    /// At most one active check per item is in flight. Suppressed items stay
    /// due and are retried on the next cycle.
    pub fn schedule_due_checks(&mut self, now: DateTime<Utc>) -> Vec<CheckJob> {
        let local = now.with_timezone(&self.offset);
        let mut jobs = Vec::new();

        for id in self.topology.registry.ids() {
            let Some(item) = self.topology.registry.get(id) else {
                continue;
            };
            let Some(due) = item.next_check.filter(|due| *due <= now) else {
                continue;
            };
            if !item.checks_in_progress.is_empty() {
                continue;
            }

            if item.is_meta() {
                self.dirty_rules.insert(id);
                self.reschedule(id, now);
                continue;
            }

            let forced = item.force_next_check;
            let Some(command) = item.check_command.clone() else {
                continue;
            };
            if !forced && !item.active_checks_enabled {
                continue;
            }
            if !forced && !self.topology.periods.is_active(item.check_period, &local) {
                let next = item
                    .check_period
                    .and_then(|period| self.topology.periods.get(period))
                    .and_then(|period| period.next_active_from(now, &self.offset));
                trace!("{} outside of its check period, next at {next:?}", item.name);
                if let Some(item) = self.topology.registry.get_mut(id) {
                    item.next_check = next;
                }
                continue;
            }

            match dependency::check_suppression(&self.topology.registry, &self.topology.periods, id, &local) {
                Suppression::BlockedBy(blocker) => {
                    trace!("{} suppressed by dependency {blocker}", item.name);
                    continue;
                }
                Suppression::Clear | Suppression::Cycle(_) => {}
            }

            let command = self.resolve_command(item, &command, &now);
            let check_id = CheckId(self.next_check_id);
            self.next_check_id += 1;

            let mut check = Check::active(check_id, id, command, due, self.generation, item.generation);
            check.status = CheckStatus::InProgress;
            check.launched_at = Some(now);

            jobs.push(CheckJob {
                check_id,
                item: item.name.clone(),
                command: check.command.clone(),
                scheduled_at: due,
            });
            self.checks.insert(check_id, check);

            if let Some(item) = self.topology.registry.get_mut(id) {
                item.checks_in_progress.insert(check_id);
                item.force_next_check = false;
            }
        }

        if !jobs.is_empty() {
            debug!("{} checks due", jobs.len());
        }
        jobs
    }

    fn resolve_command(&self, item: &Item, command: &str, now: &DateTime<Utc>) -> String {
        let context = MacroContext {
            item,
            host: item.host.and_then(|host| self.topology.registry.get(host)),
            modulations: &self.topology.modulations,
            periods: &self.topology.periods,
            now,
        };
        context.resolve(command)
    }

    /// Plan the next regular check of `id` after `now`
    fn reschedule(&mut self, id: ItemId, now: DateTime<Utc>) {
        let Some(item) = self.topology.registry.get(id) else {
            return;
        };

        let interval = if item.state_type == StateType::Soft && item.state.is_problem() {
            item.retry_interval
        } else {
            item.check_interval
        };
        let candidate = i64::try_from(interval.max(1))
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|delta| now.checked_add_signed(delta));
        let Some(candidate) = candidate else {
            warn!("{} has an interval of {interval}s, out of range; not rescheduled", item.name);
            return;
        };

        let next = match item
            .check_period
            .and_then(|period| self.topology.periods.get(period))
        {
            Some(period) => period.next_active_from(candidate, &self.offset),
            None => Some(candidate),
        };

        if let Some(item) = self.topology.registry.get_mut(id) {
            item.next_check = next;
        }
    }

    /// Apply the result of an active check
    ///
    /// Unknown check ids and stale checks are discarded, never errors.
    pub fn submit_check_result(&mut self, result: CheckResult, now: DateTime<Utc>) -> ResultDisposition {
        let Some(mut check) = self.checks.remove(&result.check_id) else {
            trace!("discarding result of unknown {}", result.check_id);
            return ResultDisposition::Discarded(DiscardReason::UnknownCheck);
        };

        let item_generation = self
            .topology
            .registry
            .get(check.item)
            .map_or(u64::MAX, |item| item.generation);

        if check.is_stale(self.generation, item_generation) {
            debug!("discarding stale result of {}", check.id);
            return ResultDisposition::Discarded(DiscardReason::Stale);
        }

        let at = result.timestamp.unwrap_or(now);
        check.status = CheckStatus::Completed;
        check.return_code = Some(result.return_code);
        check.output = Some(result.output.clone());
        check.finished_at = Some(at);

        let latency = check.latency();
        self.latency.record(latency);
        if let Some(item) = self.topology.registry.get_mut(check.item) {
            item.checks_in_progress.remove(&check.id);
            item.latency = latency;
        }

        let Some(transition) = self.apply_result(check.item, result.return_code, &result.output, at) else {
            return ResultDisposition::Discarded(DiscardReason::UnknownCheck);
        };
        self.reschedule(check.item, now);

        ResultDisposition::Applied(transition)
    }

    /// The path shared by active, passive and business rule results
    fn apply_result(&mut self, id: ItemId, return_code: i32, output: &str, at: DateTime<Utc>) -> Option<Transition> {
        let item = self.topology.registry.get(id)?;

        let mut state = item.policy.state_for_code(return_code);
        if item.kind == ItemKind::Host
            && state == State::Down
            && dependency::has_unreachable_parent(&self.topology.registry, id)
        {
            state = State::Unreachable;
        }

        let item = self.topology.registry.get_mut(id)?;
        let transition = item.apply_check_result(state, output, at);

        if transition.hard_change {
            item.notification_pending = true;
            self.dirty_rules.extend(item.business_rule_parents.iter().copied());
            self.events.push(EngineEvent::HardStateChange {
                item: item.name.clone(),
                previous: transition.previous,
                state: transition.state,
                attempt: transition.attempt,
                output: item.output.clone(),
            });
            debug!("{} is now HARD {}", item.name, transition.state);
        }

        self.emit(id, SnapshotKind::CheckResult);
        Some(transition)
    }

    /// Apply a passive result unless passive checks are refused for it
    ///
    /// Returns whether the result was applied.
    pub fn process_passive_result(
        &mut self,
        target: &Target,
        return_code: i32,
        output: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, CommandError> {
        let id = self.resolve_target(target)?;
        let Some(item) = self.topology.registry.get(id) else {
            return Err(CommandError::UnknownItem(target.name()));
        };

        let accepted = match item.kind {
            ItemKind::Host => self.accept_passive_host_checks,
            ItemKind::Service => self.accept_passive_service_checks,
            ItemKind::Meta => false,
        };
        if !accepted || !item.passive_checks_enabled {
            debug!("passive result for {} ignored, passive checks refused", item.name);
            return Ok(false);
        }

        Ok(self.apply_result(id, return_code, output, at).is_some())
    }

    /// Recompute every dirty business rule
    ///
    /// All rules of one round are evaluated against the same state before
    /// any result is applied. Meta items whose confirmed state changed queue
    /// their own parents for the next round.
    pub fn refresh_business_rules(&mut self, now: DateTime<Utc>) {
        let mut rounds = 0;

        while !self.dirty_rules.is_empty() && rounds <= self.topology.registry.len() {
            rounds += 1;
            let dirty = std::mem::take(&mut self.dirty_rules);

            let evaluated: Vec<(ItemId, i32, String)> = dirty
                .into_iter()
                .filter_map(|id| {
                    let item = self.topology.registry.get(id)?;
                    let severity = item.evaluate_business_rule(&self.topology.rules, &self.topology.registry)?;
                    let rule = self.topology.rules.get(item.business_rule?)?;
                    let output = rule.output(&self.topology.registry, severity);
                    Some((id, i32::from(severity.value()), output))
                })
                .collect();

            for (id, code, output) in evaluated {
                self.apply_result(id, code, &output, now);
            }
        }

        if !self.dirty_rules.is_empty() {
            warn!("business rules did not settle, {} left for next tick", self.dirty_rules.len());
        }
    }

    /// Set every item's business impact from its first active modulation
    pub fn apply_impact_modulations(&mut self, now: DateTime<Utc>) {
        let local = now.with_timezone(&self.offset);
        let mut changed = Vec::new();

        for item in self.topology.registry.iter_mut() {
            let impact = self
                .topology
                .modulations
                .select_business_impact(&self.topology.periods, &item.impact_modulations, &local)
                .unwrap_or(item.configured_business_impact);

            if impact != item.business_impact {
                trace!("{} business impact {} -> {impact}", item.name, item.business_impact);
                item.business_impact = impact;
                changed.push(item.id);
            }
        }

        for id in changed {
            self.emit(id, SnapshotKind::Status);
        }
    }

    fn purge_discarded_checks(&mut self) {
        let generation = self.generation;
        let before = self.checks.len();
        self.checks
            .retain(|_, check| check.status != CheckStatus::Discarded && check.generation == generation);

        let purged = before - self.checks.len();
        if purged > 0 {
            debug!("purged {purged} discarded checks");
        }
    }

    /// Parse and apply one external command line
    ///
    /// Malformed or unknown commands are logged and skipped. Returns whether
    /// the command was applied.
    pub fn handle_command_line(&mut self, line: &str, now: DateTime<Utc>) -> bool {
        let result = external_command::parse(line)
            .and_then(|command| self.apply_external_command(command, now));

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("ignoring external command {line:?}: {e}");
                false
            }
        }
    }

    pub fn apply_external_command(&mut self, command: ExternalCommand, now: DateTime<Utc>) -> Result<(), CommandError> {
        trace!("applying {}", command.name);

        match command.action {
            Action::ProcessCheckResult {
                target,
                return_code,
                output,
            } => {
                self.process_passive_result(&target, return_code, &output, command.timestamp)?;
            }

            Action::AcceptPassiveChecks { scope, enabled } => match scope {
                Scope::Hosts => self.accept_passive_host_checks = enabled,
                Scope::Services => self.accept_passive_service_checks = enabled,
            },

            Action::SetPassiveChecks { target, enabled } => {
                let id = self.resolve_target(&target)?;
                self.update(id, |item| item.passive_checks_enabled = enabled);
            }

            Action::SetActiveChecks { target, enabled } => {
                let id = self.resolve_target(&target)?;
                self.update(id, |item| {
                    item.active_checks_enabled = enabled;
                    if enabled && item.next_check.is_none() {
                        item.next_check = Some(now);
                    }
                });
            }

            Action::AddSimpleHostDependency { host, parent } => {
                let (source, target) = self.resolve_hosts(&host, &parent)?;
                let edge = DependencyEdge::simple(source, target, DependencyKind::Logical);
                if self.topology.registry.add_dependency(edge) {
                    self.emit(source, SnapshotKind::Status);
                    self.emit(target, SnapshotKind::Status);
                }
            }

            Action::DelHostDependency { host, parent } => {
                let (source, target) = self.resolve_hosts(&host, &parent)?;
                if self.topology.registry.remove_dependency(source, target) {
                    self.emit(source, SnapshotKind::Status);
                    self.emit(target, SnapshotKind::Status);
                }
            }

            Action::ScheduleCheck { target, at, forced } => {
                let id = self.resolve_target(&target)?;
                if forced {
                    self.force_check(id, at);
                } else {
                    self.update(id, |item| {
                        item.next_check = Some(item.next_check.map_or(at, |next| next.min(at)));
                    });
                }
                self.emit(id, SnapshotKind::NextSchedule);
            }

            Action::ChangeCustomVar {
                target,
                name,
                value,
            } => {
                let id = self.resolve_target(&target)?;
                self.update(id, |item| {
                    item.customs.insert(Item::custom_key(&name), value);
                });
            }

            Action::ChangeMaxCheckAttempts { target, attempts } => {
                let id = self.resolve_target(&target)?;
                self.update(id, |item| item.max_check_attempts = attempts);
            }

            Action::ChangeCheckInterval {
                target,
                interval,
                retry,
            } => {
                let id = self.resolve_target(&target)?;
                let seconds = (interval * self.settings.interval_length as f64).round();
                if seconds > MAX_INTERVAL_SECONDS as f64 {
                    return Err(CommandError::InvalidArgument {
                        command: command.name,
                        argument: interval.to_string(),
                    });
                }
                let seconds = (seconds as u64).max(1);
                self.update(id, |item| {
                    if retry {
                        item.retry_interval = seconds;
                    } else {
                        item.check_interval = seconds;
                    }
                });
            }
        }

        Ok(())
    }

    /// Invalidate in-flight checks of `id` and plan a check at `at`
    fn force_check(&mut self, id: ItemId, at: DateTime<Utc>) {
        let Some(item) = self.topology.registry.get_mut(id) else {
            return;
        };

        item.generation += 1;
        item.force_next_check = true;
        item.next_check = Some(at);

        for check_id in std::mem::take(&mut item.checks_in_progress) {
            if let Some(check) = self.checks.get_mut(&check_id) {
                check.status = CheckStatus::Discarded;
            }
        }
        debug!("forced check of {} at {at}, generation {}", item.name, item.generation);
    }

    /// Mutate one item and publish its status
    fn update<F>(&mut self, id: ItemId, change: F)
    where
        F: FnOnce(&mut Item),
    {
        if let Some(item) = self.topology.registry.get_mut(id) {
            change(item);
            self.emit(id, SnapshotKind::Status);
        }
    }

    fn emit(&mut self, id: ItemId, kind: SnapshotKind) {
        let Some(item) = self.topology.registry.get_mut(id) else {
            return;
        };

        let snapshot = Snapshot::of(item, kind);
        let event = match kind {
            SnapshotKind::CheckResult => EngineEvent::CheckResult(snapshot),
            SnapshotKind::Status => {
                item.topology_change = false;
                EngineEvent::Status(snapshot)
            }
            SnapshotKind::NextSchedule => EngineEvent::NextSchedule(snapshot),
        };
        self.events.push(event);
    }

    fn resolve_target(&self, target: &Target) -> Result<ItemId, CommandError> {
        let id = match target {
            Target::Host(host) => self.topology.registry.find_host(host),
            Target::Service { host, service } => self.topology.registry.find_service(host, service),
        };
        id.ok_or_else(|| CommandError::UnknownItem(target.name()))
    }

    fn resolve_hosts(&self, host: &str, parent: &str) -> Result<(ItemId, ItemId), CommandError> {
        let resolve = |name: &str| {
            self.topology
                .registry
                .find_host(name)
                .ok_or_else(|| CommandError::UnknownItem(name.to_string()))
        };
        Ok((resolve(host)?, resolve(parent)?))
    }

    pub fn get_state(&self, name: &str) -> Option<ItemState> {
        let id = self.topology.registry.resolve(name)?;
        self.topology.registry.get(id).map(ItemState::from)
    }

    /// Does item `source` directly depend on item `target`? (unique names)
    pub fn is_linked_with(&self, source: &str, target: &str) -> bool {
        let registry = &self.topology.registry;
        match (registry.resolve(source), registry.resolve(target)) {
            (Some(source), Some(target)) => registry.is_linked_with(source, target),
            _ => false,
        }
    }

    pub fn snapshot(&self, name: &str, kind: SnapshotKind) -> Option<Snapshot> {
        let id = self.topology.registry.resolve(name)?;
        self.topology
            .registry
            .get(id)
            .map(|item| Snapshot::of(item, kind))
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            latency: self.latency.summary(),
            checks_in_progress: self
                .checks
                .values()
                .filter(|check| check.status == CheckStatus::InProgress)
                .count(),
            cycle: self.cycle,
            generation: self.generation,
            items: self.topology.registry.len(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn registry(&self) -> &Registry {
        &self.topology.registry
    }

    pub fn rules(&self) -> &RuleSet {
        &self.topology.rules
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn accepts_passive_checks(&self, scope: Scope) -> bool {
        match scope {
            Scope::Hosts => self.accept_passive_host_checks,
            Scope::Services => self.accept_passive_service_checks,
        }
    }
}

fn offset(settings: &SchedulerSettings) -> FixedOffset {
    FixedOffset::east_opt(settings.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
}
