//! Time-bound overrides
//!
//! Macro modulations override custom macro values of the items they are
//! attached to, business impact modulations override their business impact.
//! In both cases the first attached modulation that applies wins.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeZone};

use crate::item::Item;
use crate::timeperiod::{TimePeriodId, TimePeriods};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulationId(pub usize);

#[derive(Debug, Clone)]
pub struct MacroModulation {
    pub name: String,
    pub period: Option<TimePeriodId>,

    /// Overridden custom macros, keys normalized to `_UPPERCASE`
    pub customs: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct BusinessImpactModulation {
    pub name: String,
    pub period: Option<TimePeriodId>,
    pub business_impact: u8,
}

#[derive(Debug, Clone, Default)]
pub struct Modulations {
    macros: Vec<MacroModulation>,
    impacts: Vec<BusinessImpactModulation>,
    macro_index: HashMap<String, ModulationId>,
    impact_index: HashMap<String, ModulationId>,
}

impl Modulations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_macro(&mut self, mut modulation: MacroModulation) -> ModulationId {
        modulation.customs = modulation
            .customs
            .into_iter()
            .map(|(key, value)| (Item::custom_key(&key), value))
            .collect();

        let id = ModulationId(self.macros.len());
        self.macro_index.insert(modulation.name.clone(), id);
        self.macros.push(modulation);
        id
    }

    pub fn insert_impact(&mut self, modulation: BusinessImpactModulation) -> ModulationId {
        let id = ModulationId(self.impacts.len());
        self.impact_index.insert(modulation.name.clone(), id);
        self.impacts.push(modulation);
        id
    }

    pub fn find_macro(&self, name: &str) -> Option<ModulationId> {
        self.macro_index.get(name).copied()
    }

    pub fn find_impact(&self, name: &str) -> Option<ModulationId> {
        self.impact_index.get(name).copied()
    }

    /// Value of custom macro `key` from the first attached modulation whose
    /// period is active and which defines the key
    pub fn select_macro<'a, Tz: TimeZone>(
        &'a self,
        periods: &TimePeriods,
        attached: &[ModulationId],
        key: &str,
        t: &DateTime<Tz>,
    ) -> Option<&'a str> {
        let key = Item::custom_key(key);

        attached
            .iter()
            .filter_map(|id| self.macros.get(id.0))
            .filter(|modulation| periods.is_active(modulation.period, t))
            .find_map(|modulation| modulation.customs.get(&key))
            .map(String::as_str)
    }

    /// Business impact of the first attached modulation whose period is active
    pub fn select_business_impact<Tz: TimeZone>(
        &self,
        periods: &TimePeriods,
        attached: &[ModulationId],
        t: &DateTime<Tz>,
    ) -> Option<u8> {
        attached
            .iter()
            .filter_map(|id| self.impacts.get(id.0))
            .find(|modulation| periods.is_active(modulation.period, t))
            .map(|modulation| modulation.business_impact)
    }

    /// Effective value of a custom macro for `item`
    pub fn custom_value<'a, Tz: TimeZone>(
        &'a self,
        periods: &TimePeriods,
        item: &'a Item,
        key: &str,
        t: &DateTime<Tz>,
    ) -> Option<&'a str> {
        self.select_macro(periods, &item.macro_modulations, key, t)
            .or_else(|| item.customs.get(&Item::custom_key(key)).map(String::as_str))
    }
}
