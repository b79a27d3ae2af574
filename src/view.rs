use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::calendar::{
    SprintProgress, WeekKey, WeekTotal, clamp_selection, next_day, previous_day, progress,
    week_key_of, week_total,
};
use crate::types::{
    DailyTask, SprintConfig, SprintData, SprintMilestone, TaskStatus, TimeSpent, WeeklyMilestone,
};

/// `done` of `total` items, shown as `done/total`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub done: usize,
    pub total: usize,
}

impl Tally {
    pub fn count<T>(items: &[T], is_done: impl Fn(&T) -> bool) -> Self {
        Self {
            done: items.iter().filter(|item| is_done(item)).count(),
            total: items.len(),
        }
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.done, self.total)
    }
}

/// One calendar day as the dashboard shows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub date: NaiveDate,
    pub is_today: bool,
    pub is_past: bool,
    pub previous_day: NaiveDate,
    pub next_day: NaiveDate,
    pub tasks: Vec<DailyTask>,
    /// Finished tasks out of all tasks for the day.
    pub task_tally: Tally,
    pub time_spent: TimeSpent,
    pub notes: String,
    pub wins: Vec<String>,
}

impl DayView {
    /// Dates after `today` are clamped to `today`.
    pub fn build(data: &SprintData, today: NaiveDate, selected: NaiveDate) -> Self {
        let date = clamp_selection(selected, today);
        let log = data.log_for(date);
        let tasks = data.tasks_for_date(date).to_vec();
        Self {
            date,
            is_today: date == today,
            is_past: date < today,
            previous_day: previous_day(date),
            next_day: next_day(date, today),
            task_tally: Tally::count(&tasks, |task| task.status == TaskStatus::Finished),
            tasks,
            time_spent: log.map(|log| log.time_spent).unwrap_or_default(),
            notes: log.map(|log| log.notes.clone()).unwrap_or_default(),
            wins: data.wins_for_date(date).to_vec(),
        }
    }
}

/// Everything derived from the document for one render.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub sprint: SprintConfig,
    pub today: NaiveDate,
    pub progress: SprintProgress,
    pub current_week: WeekKey,
    pub week_total: WeekTotal,
    pub day: DayView,
    pub weekly_milestones: Vec<WeeklyMilestone>,
    pub weekly_tally: Tally,
    pub sprint_milestones: Vec<SprintMilestone>,
    pub sprint_tally: Tally,
    pub days_with_data: Vec<NaiveDate>,
}

impl Dashboard {
    pub fn build(data: &SprintData, today: NaiveDate, selected: NaiveDate) -> Self {
        let current_week = week_key_of(today);
        let weekly_milestones: Vec<WeeklyMilestone> = data
            .milestones_for_week(current_week)
            .into_iter()
            .cloned()
            .collect();
        Self {
            sprint: data.sprint_config.clone(),
            today,
            progress: progress(&data.sprint_config, today),
            current_week,
            week_total: week_total(&data.daily_logs, today),
            day: DayView::build(data, today, selected),
            weekly_tally: Tally::count(&weekly_milestones, |m| m.done),
            weekly_milestones,
            sprint_milestones: data.sprint_milestones.clone(),
            sprint_tally: Tally::count(&data.sprint_milestones, |m| m.done),
            days_with_data: data.days_with_data().into_iter().collect(),
        }
    }
}
