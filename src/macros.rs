//! Command line macro resolution
//!
//! A command is configured as `name!arg1!arg2`. The part before the first `!`
//! is the command line template; `$ARGn$` refers to the n-th argument.
//! Supported macros: `$HOSTNAME$`, `$HOSTADDRESS$`, `$SERVICEDESC$`,
//! `$HOSTSTATE$`, `$SERVICESTATE$`, `$ARGn$`, `$_HOSTxxx$` and
//! `$_SERVICExxx$`. Unknown macros resolve to empty text.

use std::sync::LazyLock;

use chrono::{DateTime, TimeZone};
use regex::{Captures, Regex};

use crate::item::Item;
use crate::modulation::Modulations;
use crate::timeperiod::TimePeriods;

static MACRO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z0-9_]+)\$").expect("macro pattern is valid"));

/// Everything needed to resolve the command line of one item
pub struct MacroContext<'a, Tz: TimeZone> {
    pub item: &'a Item,

    /// Owning host of a service; the item itself for hosts
    pub host: Option<&'a Item>,

    pub modulations: &'a Modulations,
    pub periods: &'a TimePeriods,
    pub now: &'a DateTime<Tz>,
}

impl<Tz: TimeZone> MacroContext<'_, Tz> {
    pub fn resolve(&self, command: &str) -> String {
        let mut parts = command.split('!');
        let template = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        MACRO
            .replace_all(template, |captures: &Captures| self.value(&captures[1], &args))
            .into_owned()
    }

    fn value(&self, name: &str, args: &[&str]) -> String {
        let host = self.host.unwrap_or(self.item);
        let service = (!self.item.is_host()).then_some(self.item);

        let value = match name {
            "HOSTNAME" => Some(host.host_name.clone()),
            "HOSTADDRESS" => Some(host.address.clone().unwrap_or_else(|| host.host_name.clone())),
            "HOSTSTATE" => Some(host.state.to_string()),
            "SERVICEDESC" => service.and_then(|service| service.description.clone()),
            "SERVICESTATE" => service.map(|service| service.state.to_string()),
            _ => {
                if let Some(index) = name.strip_prefix("ARG") {
                    index
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|n| args.get(n))
                        .map(|arg| self.resolve(arg))
                } else if let Some(key) = name.strip_prefix("_HOST") {
                    self.custom(host, key)
                } else if let Some(key) = name.strip_prefix("_SERVICE") {
                    service.and_then(|service| self.custom(service, key))
                } else {
                    None
                }
            }
        };

        value.unwrap_or_default()
    }

    fn custom(&self, item: &Item, key: &str) -> Option<String> {
        self.modulations
            .custom_value(self.periods, item, key, self.now)
            .map(str::to_string)
    }
}
