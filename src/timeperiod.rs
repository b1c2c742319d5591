//! Time periods
//!
//! A time period is a named set of weekly ranges, e.g.
//!
//! ```text
//! monday    09:00-17:00,18:00-20:00
//! day       00:00-24:00        (every day)
//! ```
//!
//! Evaluation is a pure predicate on a point in time. Ranges are half-open
//! (`start <= t < end`) at minute resolution.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};
use regex::Regex;

static RANGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z]+)\s+(.+?)\s*$").expect("range line pattern is valid")
});

static TIME_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2}):(\d{2})\s*-\s*(\d{1,2}):(\d{2})\s*$")
        .expect("time span pattern is valid")
});

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimePeriodId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySpec {
    Every,
    On(Weekday),
}

impl DaySpec {
    fn matches(self, weekday: Weekday) -> bool {
        match self {
            DaySpec::Every => true,
            DaySpec::On(day) => day == weekday,
        }
    }
}

/// One active range within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub day: DaySpec,

    /// Minute of the day the range starts at (inclusive)
    pub start: u32,

    /// Minute of the day the range ends at (exclusive, up to 1440)
    pub end: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePeriod {
    pub name: String,
    pub ranges: Vec<DayRange>,
}

impl TimePeriod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ranges: Vec::new(),
        }
    }

    /// A period that is always active
    pub fn always(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ranges: vec![DayRange {
                day: DaySpec::Every,
                start: 0,
                end: MINUTES_PER_DAY,
            }],
        }
    }

    /// Add the ranges of one configuration line (`monday 09:00-17:00,...`)
    ///
    /// Returns the offending line on error.
    pub fn add_line(&mut self, line: &str) -> Result<(), String> {
        let captures = RANGE_LINE.captures(line).ok_or_else(|| line.to_string())?;
        let day = parse_day(&captures[1]).ok_or_else(|| line.to_string())?;

        for span in captures[2].split(',') {
            let (start, end) = parse_span(span).ok_or_else(|| line.to_string())?;
            self.ranges.push(DayRange { day, start, end });
        }

        Ok(())
    }

    pub fn is_active<Tz: TimeZone>(&self, t: &DateTime<Tz>) -> bool {
        let weekday = t.weekday();
        let minute = t.hour() * 60 + t.minute();

        self.ranges
            .iter()
            .any(|range| range.day.matches(weekday) && range.start <= minute && minute < range.end)
    }

    /// Earliest instant at or after `t` where the period is active
    ///
    /// Looks at most eight days ahead; a period without any range never
    /// becomes active.
    pub fn next_active_from<Tz: TimeZone>(&self, t: DateTime<Utc>, tz: &Tz) -> Option<DateTime<Utc>> {
        let local = t.with_timezone(tz);
        if self.is_active(&local) {
            return Some(t);
        }

        let now_minute = local.hour() * 60 + local.minute();
        let today = local.date_naive();

        for offset in 0..8 {
            let date = today + Duration::days(offset);
            let weekday = date.weekday();

            let start = self
                .ranges
                .iter()
                .filter(|range| range.day.matches(weekday) && range.start < range.end)
                .map(|range| range.start)
                .filter(|start| offset > 0 || *start > now_minute)
                .min();

            let Some(start) = start else {
                continue;
            };

            let naive = date.and_hms_opt(start / 60, start % 60, 0)?;
            if let Some(at) = tz.from_local_datetime(&naive).earliest() {
                return Some(at.with_timezone(&Utc));
            }
        }

        None
    }
}

fn parse_day(value: &str) -> Option<DaySpec> {
    let day = match value.to_ascii_lowercase().as_str() {
        "day" | "everyday" | "daily" => return Some(DaySpec::Every),
        "monday" => Weekday::Mon,
        "tuesday" => Weekday::Tue,
        "wednesday" => Weekday::Wed,
        "thursday" => Weekday::Thu,
        "friday" => Weekday::Fri,
        "saturday" => Weekday::Sat,
        "sunday" => Weekday::Sun,
        _ => return None,
    };
    Some(DaySpec::On(day))
}

fn parse_span(value: &str) -> Option<(u32, u32)> {
    let captures = TIME_SPAN.captures(value)?;
    let number = |index: usize| captures[index].parse::<u32>().ok();

    let (start_h, start_m, end_h, end_m) = (number(1)?, number(2)?, number(3)?, number(4)?);
    if start_m > 59 || end_m > 59 {
        return None;
    }

    let start = start_h * 60 + start_m;
    let end = end_h * 60 + end_m;
    if start > MINUTES_PER_DAY || end > MINUTES_PER_DAY || start > end {
        return None;
    }

    Some((start, end))
}

/// All time periods of one configuration, addressed by id or name
#[derive(Debug, Clone, Default)]
pub struct TimePeriods {
    periods: Vec<TimePeriod>,
    index: HashMap<String, TimePeriodId>,
}

impl TimePeriods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, period: TimePeriod) -> TimePeriodId {
        let id = TimePeriodId(self.periods.len());
        self.index.insert(period.name.clone(), id);
        self.periods.push(period);
        id
    }

    pub fn get(&self, id: TimePeriodId) -> Option<&TimePeriod> {
        self.periods.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<TimePeriodId> {
        self.index.get(name).copied()
    }

    /// An unknown or missing period counts as always active
    pub fn is_active<Tz: TimeZone>(&self, id: Option<TimePeriodId>, t: &DateTime<Tz>) -> bool {
        match id.and_then(|id| self.get(id)) {
            Some(period) => period.is_active(t),
            None => true,
        }
    }
}
