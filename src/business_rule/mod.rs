//! Business rule engine
//!
//! A business rule aggregates the confirmed states of many items into the
//! state of one meta item. Rules are compiled into an arena of nodes where
//! every child index is lower than its parent index, so evaluation is a single
//! forward pass over the arena.
//!
//! ## Evaluation
//!
//! ```text
//! 1. snapshot every leaf:  last HARD state → severity (unresolved → UNDETERMINED)
//! 2. combine in arena order:
//!        AND    max(children)
//!        OR     min(children)
//!        OF(m)  ok >= m → OK, ok + warn >= m → WARNING, else worst child
//!        NOT    OK ↔ CRITICAL
//! 3. root with impact propagation disabled: non-OK → UNDETERMINED
//! ```

pub mod parser;

use serde::Serialize;

use crate::item::{ItemId, Severity};
use crate::registry::Registry;

pub use parser::{RuleExpr, Threshold, parse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleNode {
    /// A referenced item; `None` when the name did not resolve
    Leaf { name: String, item: Option<ItemId> },
    And(Vec<usize>),
    Or(Vec<usize>),
    Of { threshold: Threshold, children: Vec<usize> },
    Not(usize),
}

#[derive(Debug, Clone)]
pub struct BusinessRule {
    /// The meta item this rule feeds
    pub owner: ItemId,

    /// Source text, for diagnostics
    pub expression: String,

    nodes: Vec<RuleNode>,

    /// With `false`, a non-OK result is reported as UNDETERMINED
    pub propagate_impacts: bool,
}

impl BusinessRule {
    /// Compile a parsed expression, resolving leaves through `resolve`
    pub fn compile<F>(
        owner: ItemId,
        expression: &str,
        expr: &RuleExpr,
        propagate_impacts: bool,
        resolve: F,
    ) -> Self
    where
        F: Fn(&str, Option<&str>) -> Option<ItemId>,
    {
        let mut nodes = Vec::new();
        push_node(&mut nodes, expr, &resolve);

        Self {
            owner,
            expression: expression.to_string(),
            nodes,
            propagate_impacts,
        }
    }

    pub fn nodes(&self) -> &[RuleNode] {
        &self.nodes
    }

    /// Items referenced by resolved leaves
    pub fn referenced_items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            RuleNode::Leaf { item, .. } => *item,
            _ => None,
        })
    }

    /// Names of leaves that did not resolve to an item
    pub fn unresolved(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            RuleNode::Leaf { name, item: None } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Combined severity of the rule against the current registry state
    pub fn get_state(&self, registry: &Registry) -> Severity {
        let leaves: Vec<Option<Severity>> = self
            .nodes
            .iter()
            .map(|node| match node {
                RuleNode::Leaf { item, .. } => Some(
                    item.and_then(|id| registry.get(id))
                        .map_or(Severity::Undetermined, |item| item.last_hard_state.severity()),
                ),
                _ => None,
            })
            .collect();

        let combined = combine(&self.nodes, &leaves);

        if !self.propagate_impacts && combined != Severity::Ok {
            Severity::Undetermined
        } else {
            combined
        }
    }

    /// Human readable output for the owning meta item
    pub fn output(&self, registry: &Registry, severity: Severity) -> String {
        let problems: Vec<String> = self
            .nodes
            .iter()
            .filter_map(|node| match node {
                RuleNode::Leaf { name, item } => Some((name, item.and_then(|id| registry.get(id)))),
                _ => None,
            })
            .filter_map(|(name, item)| match item {
                Some(item) if item.last_hard_state.is_problem() => {
                    Some(format!("{name} is {}", item.last_hard_state))
                }
                Some(_) => None,
                None => Some(format!("{name} is unknown")),
            })
            .collect();

        if problems.is_empty() {
            format!("{severity}: all rule members are fine")
        } else {
            format!("{severity}: {}", problems.join(", "))
        }
    }
}

fn push_node<F>(nodes: &mut Vec<RuleNode>, expr: &RuleExpr, resolve: &F) -> usize
where
    F: Fn(&str, Option<&str>) -> Option<ItemId>,
{
    let node = match expr {
        RuleExpr::Host(host) => RuleNode::Leaf {
            name: host.clone(),
            item: resolve(host, None),
        },
        RuleExpr::Service(host, service) => RuleNode::Leaf {
            name: format!("{host}/{service}"),
            item: resolve(host, Some(service)),
        },
        RuleExpr::And(children) => RuleNode::And(push_all(nodes, children, resolve)),
        RuleExpr::Or(children) => RuleNode::Or(push_all(nodes, children, resolve)),
        RuleExpr::Of(threshold, children) => RuleNode::Of {
            threshold: *threshold,
            children: push_all(nodes, children, resolve),
        },
        RuleExpr::Not(child) => RuleNode::Not(push_node(nodes, child, resolve)),
    };

    nodes.push(node);
    nodes.len() - 1
}

fn push_all<F>(nodes: &mut Vec<RuleNode>, children: &[RuleExpr], resolve: &F) -> Vec<usize>
where
    F: Fn(&str, Option<&str>) -> Option<ItemId>,
{
    children
        .iter()
        .map(|child| push_node(nodes, child, resolve))
        .collect()
}

/// Combine leaf severities bottom-up; the root is the last node
fn combine(nodes: &[RuleNode], leaves: &[Option<Severity>]) -> Severity {
    let mut values = vec![Severity::Undetermined; nodes.len()];

    for (index, node) in nodes.iter().enumerate() {
        values[index] = match node {
            RuleNode::Leaf { .. } => leaves[index].unwrap_or(Severity::Undetermined),
            RuleNode::And(children) => children
                .iter()
                .map(|child| values[*child])
                .max()
                .unwrap_or(Severity::Ok),
            RuleNode::Or(children) => children
                .iter()
                .map(|child| values[*child])
                .min()
                .unwrap_or(Severity::Ok),
            RuleNode::Of {
                threshold,
                children,
            } => {
                let required = threshold.required(children.len());
                let states: Vec<Severity> = children.iter().map(|child| values[*child]).collect();
                let ok = states.iter().filter(|s| **s == Severity::Ok).count();
                let warning = states.iter().filter(|s| **s == Severity::Warning).count();

                if ok >= required {
                    Severity::Ok
                } else if ok + warning >= required {
                    Severity::Warning
                } else {
                    states.into_iter().max().unwrap_or(Severity::Ok)
                }
            }
            RuleNode::Not(child) => values[*child].reversed(),
        };
    }

    values.last().copied().unwrap_or(Severity::Undetermined)
}

/// All compiled rules of one configuration
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<BusinessRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rule: BusinessRule) -> RuleId {
        self.rules.push(rule);
        RuleId(self.rules.len() - 1)
    }

    pub fn get(&self, id: RuleId) -> Option<&BusinessRule> {
        self.rules.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &BusinessRule)> {
        self.rules.iter().enumerate().map(|(index, rule)| (RuleId(index), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
