//! Dependency resolver
//!
//! Every item keeps an ordered list of edges to the items it depends on
//! (`act_depend_of`) and the reverse list of items depending on it
//! (`act_depend_of_me`).
//!
//! ```text
//! web1/http ──network──▶ web1 ──network──▶ router
//!     │
//!     └──logical──▶ db1          (ADD_SIMPLE_HOST_DEPENDENCY / config)
//! ```
//!
//! Before an active check of an item runs, its edges are scanned. An edge
//! whose period is active and whose target is in one of the edge's failure
//! states suppresses the check. Edges marked `inherits_parent` continue the
//! scan at their target.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use tracing::{trace, warn};

use crate::item::{ItemId, State};
use crate::registry::Registry;
use crate::timeperiod::{TimePeriodId, TimePeriods};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Reachability: host parents and the implicit host → service link
    Network,

    /// Explicit dependency from configuration or external commands
    Logical,
}

/// `source` depends on `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub source: ItemId,
    pub target: ItemId,

    /// Target states that suppress checks of the source
    pub failure_states: Vec<State>,

    pub kind: DependencyKind,

    /// The edge only counts while this period is active
    pub period: Option<TimePeriodId>,

    pub inherits_parent: bool,
}

impl DependencyEdge {
    /// Host-to-host edge blocking on DOWN/UNREACHABLE
    pub fn simple(source: ItemId, target: ItemId, kind: DependencyKind) -> Self {
        Self {
            source,
            target,
            failure_states: host_failure_states(),
            kind,
            period: None,
            inherits_parent: false,
        }
    }
}

pub fn host_failure_states() -> Vec<State> {
    vec![State::Down, State::Unreachable]
}

pub fn service_failure_states() -> Vec<State> {
    vec![State::Critical, State::Unknown]
}

/// Outcome of scanning an item's dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    Clear,

    /// A failed dependency blocks the check
    BlockedBy(ItemId),

    /// The walk met a cycle; the check is not suppressed
    Cycle(ItemId),
}

impl Suppression {
    pub fn is_blocked(self) -> bool {
        matches!(self, Suppression::BlockedBy(_))
    }
}

impl Registry {
    /// Insert `edge` unless source and target are already linked
    ///
    /// Both ends are flagged with `topology_change`. Returns whether the edge
    /// was inserted.
    pub fn add_dependency(&mut self, edge: DependencyEdge) -> bool {
        let (source, target) = (edge.source, edge.target);
        if source == target || self.get(target).is_none() || self.is_linked_with(source, target) {
            return false;
        }

        let Some(item) = self.get_mut(source) else {
            return false;
        };
        item.act_depend_of.push(edge);
        item.topology_change = true;

        if let Some(target) = self.get_mut(target) {
            if !target.act_depend_of_me.contains(&source) {
                target.act_depend_of_me.push(source);
            }
            target.topology_change = true;
        }

        trace!("added dependency {source} -> {target}");
        true
    }

    /// Remove every edge from `source` to `target`
    ///
    /// Returns whether anything was removed.
    pub fn remove_dependency(&mut self, source: ItemId, target: ItemId) -> bool {
        if !self.is_linked_with(source, target) {
            return false;
        }

        if let Some(item) = self.get_mut(source) {
            item.act_depend_of.retain(|edge| edge.target != target);
            item.topology_change = true;
        }

        if let Some(item) = self.get_mut(target) {
            item.act_depend_of_me.retain(|id| *id != source);
            item.topology_change = true;
        }

        trace!("removed dependency {source} -> {target}");
        true
    }

    /// Does `source` directly depend on `target`?
    pub fn is_linked_with(&self, source: ItemId, target: ItemId) -> bool {
        self.get(source)
            .is_some_and(|item| item.act_depend_of.iter().any(|edge| edge.target == target))
    }
}

/// Scan the dependencies of `item` at time `t`
pub fn check_suppression<Tz: TimeZone>(
    registry: &Registry,
    periods: &TimePeriods,
    item: ItemId,
    t: &DateTime<Tz>,
) -> Suppression {
    let mut on_path = HashSet::new();
    let result = scan(registry, periods, item, t, &mut on_path);

    if let Suppression::Cycle(at) = result {
        let name = registry.get(at).map_or("?", |item| item.name.as_str());
        warn!("dependency cycle through {name}, not suppressing check");
    }

    result
}

fn scan<Tz: TimeZone>(
    registry: &Registry,
    periods: &TimePeriods,
    id: ItemId,
    t: &DateTime<Tz>,
    on_path: &mut HashSet<ItemId>,
) -> Suppression {
    if !on_path.insert(id) {
        return Suppression::Cycle(id);
    }

    let Some(item) = registry.get(id) else {
        return Suppression::Clear;
    };

    for edge in &item.act_depend_of {
        if !periods.is_active(edge.period, t) {
            continue;
        }
        let Some(target) = registry.get(edge.target) else {
            continue;
        };

        if edge.failure_states.contains(&target.state) {
            return Suppression::BlockedBy(edge.target);
        }

        if edge.inherits_parent {
            match scan(registry, periods, edge.target, t, on_path) {
                Suppression::Clear => {}
                other => return other,
            }
        }
    }

    on_path.remove(&id);
    Suppression::Clear
}

/// Is one of the item's network parents DOWN or UNREACHABLE?
pub fn has_unreachable_parent(registry: &Registry, item: ItemId) -> bool {
    let Some(item) = registry.get(item) else {
        return false;
    };

    item.act_depend_of
        .iter()
        .filter(|edge| edge.kind == DependencyKind::Network)
        .filter_map(|edge| registry.get(edge.target))
        .filter(|target| target.is_host())
        .any(|target| matches!(target.state, State::Down | State::Unreachable))
}

/// Find dependency cycles, each reported as the walk that closes it
pub fn find_cycles(registry: &Registry) -> Vec<Vec<ItemId>> {
    find_cycles_by(registry.len(), |id| {
        registry
            .get(id)
            .map(|item| item.act_depend_of.iter().map(|edge| edge.target).collect())
            .unwrap_or_default()
    })
}

/// Cycles of any graph over `0..len` given its successor function
pub fn find_cycles_by<F>(len: usize, successors: F) -> Vec<Vec<ItemId>>
where
    F: Fn(ItemId) -> Vec<ItemId>,
{
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; len];
    let mut cycles = Vec::new();

    for start in (0..len).map(ItemId) {
        if marks[start.0] != Mark::New {
            continue;
        }

        // (node, its successors, index of the next one to visit)
        let mut stack = vec![(start, successors(start), 0usize)];
        marks[start.0] = Mark::Active;

        while let Some((node, next, index)) = stack.last_mut() {
            let Some(target) = next.get(*index).copied() else {
                marks[node.0] = Mark::Done;
                stack.pop();
                continue;
            };
            *index += 1;

            match marks.get(target.0).copied() {
                Some(Mark::New) => {
                    marks[target.0] = Mark::Active;
                    stack.push((target, successors(target), 0));
                }
                Some(Mark::Active) => {
                    let from = stack.iter().position(|(id, _, _)| *id == target).unwrap_or(0);
                    let mut cycle: Vec<ItemId> = stack[from..].iter().map(|(id, _, _)| *id).collect();
                    cycle.push(target);
                    cycles.push(cycle);
                }
                _ => {}
            }
        }
    }

    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;
    use crate::timeperiod::TimePeriod;
    use chrono::Utc;

    fn hosts(names: &[&str]) -> (Registry, Vec<ItemId>) {
        let mut registry = Registry::new();
        let ids = names
            .iter()
            .map(|name| registry.create(ItemKind::Host, name, None).unwrap())
            .collect();
        (registry, ids)
    }

    #[test]
    fn test_add_and_remove_dependency() {
        let (mut registry, ids) = hosts(&["a", "b"]);
        let (a, b) = (ids[0], ids[1]);

        assert!(!registry.is_linked_with(a, b));
        assert!(registry.add_dependency(DependencyEdge::simple(a, b, DependencyKind::Logical)));
        assert!(registry.is_linked_with(a, b));
        assert!(!registry.is_linked_with(b, a));
        assert_eq!(registry.get(b).unwrap().act_depend_of_me, vec![a]);
        assert!(registry.get(a).unwrap().topology_change);

        // already linked
        assert!(!registry.add_dependency(DependencyEdge::simple(a, b, DependencyKind::Logical)));
        assert_eq!(registry.get(a).unwrap().act_depend_of.len(), 1);

        assert!(registry.remove_dependency(a, b));
        assert!(!registry.is_linked_with(a, b));
        assert!(registry.get(b).unwrap().act_depend_of_me.is_empty());

        // double delete is a no-op
        assert!(!registry.remove_dependency(a, b));
    }

    #[test]
    fn test_self_dependency_is_refused() {
        let (mut registry, ids) = hosts(&["a"]);
        assert!(!registry.add_dependency(DependencyEdge::simple(ids[0], ids[0], DependencyKind::Logical)));
    }

    #[test]
    fn test_failed_target_suppresses() {
        let (mut registry, ids) = hosts(&["a", "b"]);
        let (a, b) = (ids[0], ids[1]);
        registry.add_dependency(DependencyEdge::simple(a, b, DependencyKind::Network));
        let periods = TimePeriods::new();

        assert_eq!(check_suppression(&registry, &periods, a, &Utc::now()), Suppression::Clear);

        registry.get_mut(b).unwrap().state = State::Down;
        assert_eq!(
            check_suppression(&registry, &periods, a, &Utc::now()),
            Suppression::BlockedBy(b)
        );
    }

    #[test]
    fn test_inactive_period_ignores_edge() {
        let (mut registry, ids) = hosts(&["a", "b"]);
        let (a, b) = (ids[0], ids[1]);
        let mut periods = TimePeriods::new();
        let never = periods.insert(TimePeriod::new("never"));

        let mut edge = DependencyEdge::simple(a, b, DependencyKind::Logical);
        edge.period = Some(never);
        registry.add_dependency(edge);
        registry.get_mut(b).unwrap().state = State::Down;

        assert_eq!(check_suppression(&registry, &periods, a, &Utc::now()), Suppression::Clear);
    }

    #[test]
    fn test_inherits_parent_walks_further() {
        let (mut registry, ids) = hosts(&["a", "b", "c"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        let mut edge = DependencyEdge::simple(a, b, DependencyKind::Logical);
        edge.inherits_parent = true;
        registry.add_dependency(edge);
        registry.add_dependency(DependencyEdge::simple(b, c, DependencyKind::Logical));
        registry.get_mut(c).unwrap().state = State::Unreachable;

        let periods = TimePeriods::new();
        assert_eq!(
            check_suppression(&registry, &periods, a, &Utc::now()),
            Suppression::BlockedBy(c)
        );
    }

    #[test]
    fn test_runtime_cycle_fails_closed() {
        let (mut registry, ids) = hosts(&["a", "b"]);
        let (a, b) = (ids[0], ids[1]);

        for (source, target) in [(a, b), (b, a)] {
            let mut edge = DependencyEdge::simple(source, target, DependencyKind::Logical);
            edge.inherits_parent = true;
            registry.add_dependency(edge);
        }

        let periods = TimePeriods::new();
        let result = check_suppression(&registry, &periods, a, &Utc::now());
        assert_eq!(result, Suppression::Cycle(a));
        assert!(!result.is_blocked());
    }

    #[test]
    fn test_unreachable_parent() {
        let (mut registry, ids) = hosts(&["leaf", "router"]);
        let (leaf, router) = (ids[0], ids[1]);
        registry.add_dependency(DependencyEdge::simple(leaf, router, DependencyKind::Network));

        assert!(!has_unreachable_parent(&registry, leaf));
        registry.get_mut(router).unwrap().state = State::Down;
        assert!(has_unreachable_parent(&registry, leaf));
    }

    #[test]
    fn test_logical_edge_is_not_a_parent() {
        let (mut registry, ids) = hosts(&["a", "b"]);
        registry.add_dependency(DependencyEdge::simple(ids[0], ids[1], DependencyKind::Logical));
        registry.get_mut(ids[1]).unwrap().state = State::Down;
        assert!(!has_unreachable_parent(&registry, ids[0]));
    }

    #[test]
    fn test_find_cycles() {
        let (mut registry, ids) = hosts(&["a", "b", "c", "d"]);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        registry.add_dependency(DependencyEdge::simple(a, b, DependencyKind::Logical));
        registry.add_dependency(DependencyEdge::simple(b, c, DependencyKind::Logical));
        registry.add_dependency(DependencyEdge::simple(d, c, DependencyKind::Logical));
        assert!(find_cycles(&registry).is_empty());

        registry.add_dependency(DependencyEdge::simple(c, a, DependencyKind::Logical));
        let cycles = find_cycles(&registry);
        assert_eq!(cycles, vec![vec![a, b, c, a]]);
    }
}
