//! Configuration to topology
//!
//! Builds the registry, time periods, modulations, dependency edges and
//! business rules out of a resolved [`Config`]. Every problem found is
//! collected; a configuration with at least one diagnostic is rejected as a
//! whole.
//!
//! ```text
//! time periods → modulations → hosts → services → host parents
//!              → explicit dependencies → business rules → cycle checks
//! ```

use tracing::{debug, warn};

use crate::business_rule::{self, BusinessRule, RuleSet};
use crate::config::{CheckSettings, Config, DependencyConfig, ServiceConfig};
use crate::dependency::{self, DependencyEdge, DependencyKind};
use crate::error::{ConfigError, InvalidConfig};
use crate::item::{Item, ItemId, ItemKind, MAX_INTERVAL_SECONDS, State};
use crate::modulation::{BusinessImpactModulation, MacroModulation, Modulations};
use crate::registry::Registry;
use crate::timeperiod::{TimePeriod, TimePeriods};

/// Everything the scheduler needs from one configuration
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub registry: Registry,
    pub periods: TimePeriods,
    pub modulations: Modulations,
    pub rules: RuleSet,
}

pub fn build(config: &Config) -> Result<Topology, InvalidConfig> {
    let mut builder = Builder {
        topology: Topology::default(),
        errors: Vec::new(),
        interval_length: config.scheduler.interval_length.max(1),
    };

    builder.timeperiods(config);
    builder.modulations(config);
    builder.hosts(config);
    builder.services(config);
    builder.parents(config);
    for dependency in &config.dependencies {
        builder.dependency(dependency);
    }
    builder.business_rules(config);
    builder.cycles();

    if builder.errors.is_empty() {
        let topology = builder.topology;
        debug!(
            "built topology: {} items, {} rules, {} periods",
            topology.registry.len(),
            topology.rules.len(),
            config.timeperiods.len()
        );
        Ok(topology)
    } else {
        Err(InvalidConfig {
            errors: builder.errors,
        })
    }
}

struct Builder {
    topology: Topology,
    errors: Vec<ConfigError>,
    interval_length: u64,
}

impl Builder {
    fn timeperiods(&mut self, config: &Config) {
        for period_config in &config.timeperiods {
            if self.topology.periods.find(&period_config.name).is_some() {
                self.errors
                    .push(ConfigError::DuplicateName(period_config.name.clone()));
                continue;
            }

            let mut period = TimePeriod::new(&period_config.name);
            for line in &period_config.ranges {
                if let Err(line) = period.add_line(line) {
                    self.errors.push(ConfigError::InvalidTimeRange {
                        period: period_config.name.clone(),
                        line,
                    });
                }
            }
            self.topology.periods.insert(period);
        }
    }

    fn modulations(&mut self, config: &Config) {
        for modulation in &config.macro_modulations {
            if self.topology.modulations.find_macro(&modulation.name).is_some() {
                self.errors
                    .push(ConfigError::DuplicateName(modulation.name.clone()));
                continue;
            }
            let period = self.period(&modulation.name, &modulation.period);
            self.topology.modulations.insert_macro(MacroModulation {
                name: modulation.name.clone(),
                period,
                customs: modulation.customs.clone(),
            });
        }

        for modulation in &config.business_impact_modulations {
            if self.topology.modulations.find_impact(&modulation.name).is_some() {
                self.errors
                    .push(ConfigError::DuplicateName(modulation.name.clone()));
                continue;
            }
            let period = self.period(&modulation.name, &modulation.period);
            self.topology
                .modulations
                .insert_impact(BusinessImpactModulation {
                    name: modulation.name.clone(),
                    period,
                    business_impact: modulation.business_impact,
                });
        }
    }

    fn period(&mut self, item: &str, name: &str) -> Option<crate::timeperiod::TimePeriodId> {
        let found = self.topology.periods.find(name);
        if found.is_none() {
            self.errors.push(ConfigError::UnknownTimePeriod {
                item: item.to_string(),
                period: name.to_string(),
            });
        }
        found
    }

    fn hosts(&mut self, config: &Config) {
        for host in &config.hosts {
            let Some(id) = self.topology.registry.create(ItemKind::Host, &host.name, None) else {
                self.errors.push(ConfigError::DuplicateName(host.name.clone()));
                continue;
            };

            self.apply_settings(id, &host.check);
            if let Some(item) = self.topology.registry.get_mut(id) {
                item.address = host.address.clone();
            }
        }
    }

    fn services(&mut self, config: &Config) {
        for service in &config.services {
            self.service(service);
        }
    }

    fn service(&mut self, service: &ServiceConfig) {
        let name = match &service.host {
            Some(host) => format!("{host}/{}", service.description),
            None => service.description.clone(),
        };

        let Some(host_name) = &service.host else {
            self.errors.push(ConfigError::MissingHost(name));
            return;
        };
        let Some(host) = self.topology.registry.find_host(host_name) else {
            self.errors.push(ConfigError::UnknownHost {
                item: name,
                host: host_name.clone(),
            });
            return;
        };

        let kind = if service.business_rule.is_some() {
            ItemKind::Meta
        } else {
            ItemKind::Service
        };

        let Some(id) = self
            .topology
            .registry
            .create(kind, host_name, Some(&service.description))
        else {
            self.errors.push(ConfigError::DuplicateName(name));
            return;
        };

        self.apply_settings(id, &service.check);
        if let Some(item) = self.topology.registry.get_mut(id) {
            item.host = Some(host);
        }

        self.topology
            .registry
            .add_dependency(DependencyEdge::simple(id, host, DependencyKind::Network));
    }

    /// Configured interval units in seconds, or a diagnostic when out of range
    fn interval_seconds(&mut self, item: &str, units: u64) -> u64 {
        match units.checked_mul(self.interval_length) {
            Some(seconds) if seconds <= MAX_INTERVAL_SECONDS => seconds,
            _ => {
                self.errors.push(ConfigError::InvalidInterval {
                    item: item.to_string(),
                    interval: units,
                });
                MAX_INTERVAL_SECONDS
            }
        }
    }

    fn apply_settings(&mut self, id: ItemId, settings: &CheckSettings) {
        let Some(name) = self.topology.registry.get(id).map(|item| item.name.clone()) else {
            return;
        };
        let kind = self.topology.registry.get(id).map_or(ItemKind::Host, |item| item.kind);

        let check_period = settings
            .check_period
            .as_ref()
            .and_then(|period| self.period(&name, period));

        let macro_modulations = settings
            .macro_modulations
            .iter()
            .filter_map(|modulation| {
                let found = self.topology.modulations.find_macro(modulation);
                if found.is_none() {
                    self.errors.push(ConfigError::UnknownModulation {
                        item: name.clone(),
                        modulation: modulation.clone(),
                    });
                }
                found
            })
            .collect();

        let impact_modulations = settings
            .business_impact_modulations
            .iter()
            .filter_map(|modulation| {
                let found = self.topology.modulations.find_impact(modulation);
                if found.is_none() {
                    self.errors.push(ConfigError::UnknownModulation {
                        item: name.clone(),
                        modulation: modulation.clone(),
                    });
                }
                found
            })
            .collect();

        let initial_state = match &settings.initial_state {
            Some(value) => {
                let state = State::parse_for(kind, value);
                if state.is_none() {
                    self.errors.push(ConfigError::InvalidInitialState {
                        item: name.clone(),
                        state: value.clone(),
                    });
                }
                state
            }
            None => None,
        };

        if settings.max_check_attempts == 0 {
            self.errors.push(ConfigError::InvalidAttempts(name.clone()));
        }

        let check_interval = self.interval_seconds(&name, settings.check_interval);
        let retry_interval = self.interval_seconds(&name, settings.retry_interval);
        let Some(item) = self.topology.registry.get_mut(id) else {
            return;
        };

        item.check_command = settings.check_command.clone();
        item.max_check_attempts = settings.max_check_attempts.max(1);
        item.check_interval = check_interval;
        item.retry_interval = retry_interval;
        item.check_period = check_period;
        item.active_checks_enabled = settings.active_checks_enabled;
        item.passive_checks_enabled = settings.passive_checks_enabled;
        item.business_impact = settings.business_impact;
        item.configured_business_impact = settings.business_impact;
        item.macro_modulations = macro_modulations;
        item.impact_modulations = impact_modulations;
        item.customs = settings
            .customs
            .iter()
            .map(|(key, value)| (Item::custom_key(key), value.clone()))
            .collect();

        if let Some(state) = initial_state {
            item.set_initial_state(state);
        }
    }

    fn parents(&mut self, config: &Config) {
        for host in &config.hosts {
            let Some(id) = self.topology.registry.find_host(&host.name) else {
                continue;
            };

            for parent in &host.parents {
                match self.topology.registry.find_host(parent) {
                    Some(parent) => {
                        self.topology.registry.add_dependency(DependencyEdge::simple(
                            id,
                            parent,
                            DependencyKind::Network,
                        ));
                    }
                    None => self.errors.push(ConfigError::UnknownHost {
                        item: host.name.clone(),
                        host: parent.clone(),
                    }),
                }
            }
        }
    }

    fn resolve(&self, host: &str, service: Option<&str>) -> Option<ItemId> {
        match service {
            Some(service) => self.topology.registry.find_service(host, service),
            None => self.topology.registry.find_host(host),
        }
    }

    fn dependency(&mut self, dependency: &DependencyConfig) {
        let source_name = full_name(&dependency.dependent_host, dependency.dependent_service.as_deref());
        let target_name = full_name(&dependency.host, dependency.service.as_deref());

        let source = self.resolve(&dependency.dependent_host, dependency.dependent_service.as_deref());
        let target = self.resolve(&dependency.host, dependency.service.as_deref());

        let (source, target) = match (source, target) {
            (Some(source), Some(target)) => (source, target),
            (None, _) => {
                self.errors.push(ConfigError::UnknownDependencyTarget(source_name));
                return;
            }
            (_, None) => {
                self.errors.push(ConfigError::UnknownDependencyTarget(target_name));
                return;
            }
        };

        let target_kind = self
            .topology
            .registry
            .get(target)
            .map_or(ItemKind::Host, |item| item.kind);
        let label = format!("{source_name} -> {target_name}");

        let failure_states = if dependency.failure_states.is_empty() {
            match target_kind {
                ItemKind::Host => dependency::host_failure_states(),
                _ => dependency::service_failure_states(),
            }
        } else {
            dependency
                .failure_states
                .iter()
                .filter_map(|value| {
                    let state = State::parse_for(target_kind, value);
                    if state.is_none() {
                        self.errors.push(ConfigError::InvalidFailureState {
                            dependency: label.clone(),
                            state: value.clone(),
                        });
                    }
                    state
                })
                .collect()
        };

        let period = dependency
            .period
            .as_ref()
            .and_then(|period| self.period(&label, period));

        let inserted = self.topology.registry.add_dependency(DependencyEdge {
            source,
            target,
            failure_states,
            kind: DependencyKind::Logical,
            period,
            inherits_parent: dependency.inherits_parent,
        });

        if !inserted {
            warn!("dependency {label} ignored, items already linked");
        }
    }

    fn business_rules(&mut self, config: &Config) {
        for service in config.services.iter().filter(|s| s.business_rule.is_some()) {
            let (Some(host), Some(text)) = (&service.host, &service.business_rule) else {
                continue;
            };
            let Some(owner) = self.topology.registry.find_service(host, &service.description) else {
                continue;
            };
            let name = format!("{host}/{}", service.description);

            let expr = match business_rule::parse(text) {
                Ok(expr) => expr,
                Err(reason) => {
                    self.errors
                        .push(ConfigError::InvalidBusinessRule { item: name, reason });
                    continue;
                }
            };

            let rule = BusinessRule::compile(owner, text, &expr, service.propagate_impacts, |h, s| {
                self.resolve(h, s)
            });

            for unresolved in rule.unresolved() {
                warn!("business rule of {name} references unknown item {unresolved}");
            }

            let referenced: Vec<ItemId> = rule.referenced_items().collect();
            let rule_id = self.topology.rules.insert(rule);

            if let Some(item) = self.topology.registry.get_mut(owner) {
                item.business_rule = Some(rule_id);
            }
            for id in referenced {
                if let Some(item) = self.topology.registry.get_mut(id)
                    && !item.business_rule_parents.contains(&owner)
                {
                    item.business_rule_parents.push(owner);
                }
            }
        }
    }

    fn cycles(&mut self) {
        let registry = &self.topology.registry;
        let names = |cycle: Vec<ItemId>| -> Vec<String> {
            cycle
                .into_iter()
                .filter_map(|id| registry.get(id).map(|item| item.name.clone()))
                .collect()
        };

        for cycle in dependency::find_cycles(registry) {
            self.errors.push(ConfigError::DependencyCycle(names(cycle)));
        }

        let rules = &self.topology.rules;
        let rule_cycles = dependency::find_cycles_by(registry.len(), |id| {
            registry
                .get(id)
                .and_then(|item| item.business_rule)
                .and_then(|rule| rules.get(rule))
                .map(|rule| rule.referenced_items().collect())
                .unwrap_or_default()
        });

        for cycle in rule_cycles {
            self.errors.push(ConfigError::BusinessRuleCycle(names(cycle)));
        }
    }
}

fn full_name(host: &str, service: Option<&str>) -> String {
    match service {
        Some(service) => format!("{host}/{service}"),
        None => host.to_string(),
    }
}
