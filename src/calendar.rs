//! Calendar-day arithmetic behind the dashboard figures.
//!
//! Every date here is a `NaiveDate` interpreted in the local timezone of
//! the process; there is no time-of-day anywhere in the model.

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::types::{DailyLog, SprintConfig};

/// Length of a freshly synthesized sprint.
pub const DEFAULT_SPRINT_DAYS: i64 = 90;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of "today". Mutations are gated on it, so tests pin it.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The local calendar day of the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid ISO week key: {0}")]
pub struct InvalidWeekKey(String);

/// ISO-8601 week identifier, rendered as `YYYY-Www`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekKey {
    year: i32,
    week: u32,
}

impl WeekKey {
    pub fn new(year: i32, week: u32) -> Option<Self> {
        (1..=53).contains(&week).then_some(Self { year, week })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = InvalidWeekKey;

    /// Accepts the unpadded form (`2024-W1`) written by older documents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidWeekKey(s.to_string());
        let (year, week) = s
            .trim()
            .split_once("-W")
            .or_else(|| s.trim().split_once("-w"))
            .ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let week = week.parse::<u32>().map_err(|_| invalid())?;
        WeekKey::new(year, week).ok_or_else(invalid)
    }
}

impl Serialize for WeekKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Week containing `date` under ISO-8601: weeks start on Monday and week 1
/// is the one holding the year's first Thursday.
pub fn week_key_of(date: NaiveDate) -> WeekKey {
    let iso = date.iso_week();
    WeekKey {
        year: iso.year(),
        week: iso.week(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintProgress {
    pub total_days: i64,
    pub elapsed_days: i64,
    pub remaining_days: i64,
    pub percent: u8,
}

/// Day counts and completion for the sprint as of `today`.
///
/// The current day counts as elapsed as soon as it begins, so the first
/// day of the sprint reports `elapsed_days == 1`.
pub fn progress(config: &SprintConfig, today: NaiveDate) -> SprintProgress {
    let total_days = config
        .end_date
        .signed_duration_since(config.start_date)
        .num_days()
        .max(1);
    let elapsed_days = (today.signed_duration_since(config.start_date).num_days() + 1).max(0);
    let remaining_days = (total_days - elapsed_days).max(0);
    // round half up on 100 * elapsed / total
    let percent = ((elapsed_days * 200 + total_days) / (2 * total_days)).min(100) as u8;
    SprintProgress {
        total_days,
        elapsed_days,
        remaining_days,
        percent,
    }
}

/// Most recent Sunday on or before `today`.
pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.weekday().num_days_from_sunday()))
}

pub fn week_total_minutes(logs: &[DailyLog], today: NaiveDate) -> i64 {
    let start = week_start(today);
    logs.iter()
        .filter(|log| log.date >= start && log.date <= today)
        .map(|log| log.time_spent.total_minutes())
        .sum()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekTotal {
    pub total_minutes: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl WeekTotal {
    /// Hours are floored, so `minutes` is always in `0..60`.
    pub fn from_minutes(total_minutes: i64) -> Self {
        Self {
            total_minutes,
            hours: total_minutes.div_euclid(60),
            minutes: total_minutes.rem_euclid(60),
        }
    }
}

impl fmt::Display for WeekTotal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.hours, self.minutes)
    }
}

pub fn week_total(logs: &[DailyLog], today: NaiveDate) -> WeekTotal {
    WeekTotal::from_minutes(week_total_minutes(logs, today))
}

pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(date)
}

/// The day after `date`, unless that would move past `today`.
pub fn next_day(date: NaiveDate, today: NaiveDate) -> NaiveDate {
    match date.succ_opt() {
        Some(next) if next <= today => next,
        _ => date,
    }
}

/// Days after `today` cannot be selected.
pub fn clamp_selection(requested: NaiveDate, today: NaiveDate) -> NaiveDate {
    requested.min(today)
}
