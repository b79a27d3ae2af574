use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::calendar::{DEFAULT_SPRINT_DAYS, WeekKey};

pub const DEFAULT_SPRINT_NAME: &str = "My Sprint";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Finished,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Finished => "finished",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Finished => "Finished",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "not_started" | "todo" => Ok(TaskStatus::NotStarted),
            "in_progress" | "doing" => Ok(TaskStatus::InProgress),
            "finished" | "done" => Ok(TaskStatus::Finished),
            _ => Err(format!(
                "Unknown task status: {s} (expected not_started, in_progress or finished)"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintConfig {
    pub start_date: NaiveDate,
    /// Advisory only; nothing checks that it falls after `start_date`.
    pub end_date: NaiveDate,
    pub name: String,
}

impl SprintConfig {
    /// A sprint of the default length beginning on `today`.
    pub fn starting(today: NaiveDate) -> Self {
        Self {
            start_date: today,
            end_date: today + chrono::Duration::days(DEFAULT_SPRINT_DAYS),
            name: DEFAULT_SPRINT_NAME.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTask {
    pub id: String,
    #[serde(rename = "task")]
    pub text: String,
    pub status: TaskStatus,
}

/// Stored as entered. Documents written by the browser app can carry
/// negative values, so both fields are signed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpent {
    pub hours: i64,
    pub minutes: i64,
}

impl TimeSpent {
    pub fn total_minutes(&self) -> i64 {
        self.hours * 60 + self.minutes
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub date: NaiveDate,
    pub tasks: Vec<DailyTask>,
    pub time_spent: TimeSpent,
    #[serde(default)]
    pub notes: String,
}

impl DailyLog {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            tasks: Vec::new(),
            time_spent: TimeSpent::default(),
            notes: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyMilestone {
    pub id: String,
    #[serde(rename = "task")]
    pub text: String,
    pub done: bool,
    pub week: WeekKey,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintMilestone {
    pub id: String,
    #[serde(rename = "task")]
    pub text: String,
    pub done: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWins {
    pub date: NaiveDate,
    pub wins: Vec<String>,
}

/// The whole persisted document. Every mutation produces a new value of
/// this type and the entire value is written back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintData {
    pub sprint_config: SprintConfig,
    #[serde(default)]
    pub daily_logs: Vec<DailyLog>,
    #[serde(default)]
    pub weekly_milestones: Vec<WeeklyMilestone>,
    #[serde(default)]
    pub sprint_milestones: Vec<SprintMilestone>,
    #[serde(default)]
    pub todays_wins: Vec<DailyWins>,
}

impl SprintData {
    /// The document synthesized when nothing usable is stored yet.
    pub fn new_default(today: NaiveDate) -> Self {
        Self {
            sprint_config: SprintConfig::starting(today),
            daily_logs: Vec::new(),
            weekly_milestones: Vec::new(),
            sprint_milestones: Vec::new(),
            todays_wins: Vec::new(),
        }
    }
}
