//! Operations over a [`SprintData`] document.
//!
//! Each mutation takes the current document and returns the next one.
//! Invalid input (blank text, a day other than today, an unknown id) is
//! ignored and yields an unchanged copy; nothing here fails.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::debug;
use ulid::Ulid;

use crate::calendar::{WeekKey, week_key_of};
use crate::types::{
    DailyLog, DailyTask, DailyWins, SprintData, SprintMilestone, TaskStatus, TimeSpent,
    WeeklyMilestone,
};

fn new_id() -> String {
    Ulid::new().to_string()
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Settings-overlay edit; `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SprintConfigUpdate {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl SprintConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.start_date.is_none() && self.end_date.is_none()
    }
}

impl SprintData {
    pub fn log_for(&self, date: NaiveDate) -> Option<&DailyLog> {
        self.daily_logs.iter().find(|log| log.date == date)
    }

    pub fn tasks_for_date(&self, date: NaiveDate) -> &[DailyTask] {
        self.log_for(date).map(|log| log.tasks.as_slice()).unwrap_or(&[])
    }

    pub fn wins_for_date(&self, date: NaiveDate) -> &[String] {
        self.todays_wins
            .iter()
            .find(|entry| entry.date == date)
            .map(|entry| entry.wins.as_slice())
            .unwrap_or(&[])
    }

    pub fn milestones_for_week(&self, week: WeekKey) -> Vec<&WeeklyMilestone> {
        self.weekly_milestones
            .iter()
            .filter(|m| m.week == week)
            .collect()
    }

    /// Dates that carry a daily log, for the calendar indicator.
    pub fn days_with_data(&self) -> BTreeSet<NaiveDate> {
        self.daily_logs.iter().map(|log| log.date).collect()
    }

    fn log_entry(&mut self, date: NaiveDate) -> &mut DailyLog {
        let idx = match self.daily_logs.iter().position(|log| log.date == date) {
            Some(idx) => idx,
            None => {
                self.daily_logs.push(DailyLog::empty(date));
                self.daily_logs.len() - 1
            }
        };
        &mut self.daily_logs[idx]
    }

    pub fn add_task(&self, today: NaiveDate, date: NaiveDate, text: &str) -> SprintData {
        let Some(text) = non_blank(text) else {
            debug!("ignoring blank task");
            return self.clone();
        };
        if date != today {
            debug!(%date, "ignoring task added to a day other than today");
            return self.clone();
        }
        let mut next = self.clone();
        next.log_entry(date).tasks.push(DailyTask {
            id: new_id(),
            text,
            status: TaskStatus::NotStarted,
        });
        next
    }

    pub fn set_task_status(
        &self,
        today: NaiveDate,
        date: NaiveDate,
        task_id: &str,
        status: TaskStatus,
    ) -> SprintData {
        if date != today {
            debug!(%date, task_id, "ignoring status change on a day other than today");
            return self.clone();
        }
        let mut next = self.clone();
        if let Some(task) = next
            .daily_logs
            .iter_mut()
            .filter(|log| log.date == date)
            .flat_map(|log| log.tasks.iter_mut())
            .find(|task| task.id == task_id)
        {
            task.status = status;
        }
        next
    }

    pub fn remove_task(&self, today: NaiveDate, date: NaiveDate, task_id: &str) -> SprintData {
        if date != today {
            debug!(%date, task_id, "ignoring task removal on a day other than today");
            return self.clone();
        }
        let mut next = self.clone();
        for log in next.daily_logs.iter_mut().filter(|log| log.date == date) {
            log.tasks.retain(|task| task.id != task_id);
        }
        next
    }

    /// No bounds check on either field.
    pub fn save_time(
        &self,
        today: NaiveDate,
        date: NaiveDate,
        hours: i64,
        minutes: i64,
    ) -> SprintData {
        if date != today {
            debug!(%date, "ignoring time saved against a day other than today");
            return self.clone();
        }
        let mut next = self.clone();
        next.log_entry(date).time_spent = TimeSpent { hours, minutes };
        next
    }

    pub fn save_notes(&self, today: NaiveDate, date: NaiveDate, notes: &str) -> SprintData {
        if date != today {
            debug!(%date, "ignoring notes saved against a day other than today");
            return self.clone();
        }
        let mut next = self.clone();
        next.log_entry(date).notes = notes.trim().to_string();
        next
    }

    pub fn add_win(&self, today: NaiveDate, date: NaiveDate, text: &str) -> SprintData {
        let Some(text) = non_blank(text) else {
            debug!("ignoring blank win");
            return self.clone();
        };
        if date != today {
            debug!(%date, "ignoring win added to a day other than today");
            return self.clone();
        }
        let mut next = self.clone();
        match next.todays_wins.iter_mut().find(|entry| entry.date == date) {
            Some(entry) => entry.wins.push(text),
            None => next.todays_wins.push(DailyWins {
                date,
                wins: vec![text],
            }),
        }
        next
    }

    /// Always filed under the week containing `today`.
    pub fn add_weekly_milestone(&self, today: NaiveDate, text: &str) -> SprintData {
        let Some(text) = non_blank(text) else {
            return self.clone();
        };
        let mut next = self.clone();
        next.weekly_milestones.push(WeeklyMilestone {
            id: new_id(),
            text,
            done: false,
            week: week_key_of(today),
        });
        next
    }

    pub fn toggle_weekly_milestone(&self, id: &str) -> SprintData {
        let mut next = self.clone();
        if let Some(milestone) = next.weekly_milestones.iter_mut().find(|m| m.id == id) {
            milestone.done = !milestone.done;
        }
        next
    }

    pub fn add_sprint_milestone(&self, text: &str) -> SprintData {
        let Some(text) = non_blank(text) else {
            return self.clone();
        };
        let mut next = self.clone();
        next.sprint_milestones.push(SprintMilestone {
            id: new_id(),
            text,
            done: false,
        });
        next
    }

    pub fn toggle_sprint_milestone(&self, id: &str) -> SprintData {
        let mut next = self.clone();
        if let Some(milestone) = next.sprint_milestones.iter_mut().find(|m| m.id == id) {
            milestone.done = !milestone.done;
        }
        next
    }

    /// A blank name is ignored; start and end are taken as given.
    pub fn update_sprint_config(&self, update: &SprintConfigUpdate) -> SprintData {
        let mut next = self.clone();
        let config = &mut next.sprint_config;
        if let Some(name) = update.name.as_deref().and_then(non_blank) {
            config.name = name;
        }
        if let Some(start) = update.start_date {
            config.start_date = start;
        }
        if let Some(end) = update.end_date {
            config.end_date = end;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        day(2024, 2, 14)
    }

    fn yesterday() -> NaiveDate {
        day(2024, 2, 13)
    }

    fn seeded() -> SprintData {
        let doc = SprintData::new_default(day(2024, 1, 1));
        let doc = doc.add_task(today(), today(), "review PR");
        let doc = doc.save_time(today(), today(), 1, 30);
        let doc = doc.add_win(today(), today(), "shipped");
        let doc = doc.add_weekly_milestone(today(), "demo");
        let mut doc = doc.add_sprint_milestone("launch");
        // a past day, inserted directly since mutations only reach today
        doc.daily_logs.push(DailyLog {
            tasks: vec![DailyTask {
                id: "old".into(),
                text: "old work".into(),
                status: TaskStatus::InProgress,
            }],
            ..DailyLog::empty(yesterday())
        });
        doc
    }

    #[test]
    fn test_add_task_creates_log_lazily_then_appends() {
        let doc = SprintData::new_default(day(2024, 1, 1));
        let doc = doc.add_task(today(), today(), "  first  ");
        assert_eq!(doc.daily_logs.len(), 1);
        let tasks = doc.tasks_for_date(today());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "first");
        assert_eq!(tasks[0].status, TaskStatus::NotStarted);

        let doc = doc.add_task(today(), today(), "second");
        assert_eq!(doc.daily_logs.len(), 1);
        assert_eq!(doc.tasks_for_date(today()).len(), 2);
        assert_ne!(doc.tasks_for_date(today())[0].id, doc.tasks_for_date(today())[1].id);
    }

    #[test]
    fn test_blank_text_is_ignored_everywhere() {
        let doc = seeded();
        assert_eq!(doc.add_task(today(), today(), "   "), doc);
        assert_eq!(doc.add_win(today(), today(), ""), doc);
        assert_eq!(doc.add_weekly_milestone(today(), "\t"), doc);
        assert_eq!(doc.add_sprint_milestone(" "), doc);
    }

    #[test]
    fn test_mutations_against_other_days_are_noops() {
        let doc = seeded();
        let other = yesterday();
        assert_eq!(doc.add_task(today(), other, "late"), doc);
        assert_eq!(doc.set_task_status(today(), other, "old", TaskStatus::Finished), doc);
        assert_eq!(doc.remove_task(today(), other, "old"), doc);
        assert_eq!(doc.save_time(today(), other, 8, 0), doc);
        assert_eq!(doc.save_notes(today(), other, "notes"), doc);
        assert_eq!(doc.add_win(today(), other, "late win"), doc);
        assert_eq!(doc.add_task(today(), day(2024, 2, 15), "future"), doc);
    }

    #[test]
    fn test_status_changes_in_any_direction() {
        let doc = seeded();
        let id = doc.tasks_for_date(today())[0].id.clone();
        let finished = doc.set_task_status(today(), today(), &id, TaskStatus::Finished);
        assert_eq!(finished.tasks_for_date(today())[0].status, TaskStatus::Finished);
        let reopened = finished.set_task_status(today(), today(), &id, TaskStatus::NotStarted);
        assert_eq!(reopened, doc);
        assert_eq!(doc.set_task_status(today(), today(), "missing", TaskStatus::Finished), doc);
    }

    #[test]
    fn test_remove_task_keeps_the_log() {
        let doc = seeded().add_task(today(), today(), "second");
        let first = doc.tasks_for_date(today())[0].id.clone();
        let doc = doc.remove_task(today(), today(), &first);
        let tasks = doc.tasks_for_date(today());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "second");
        assert_eq!(doc.log_for(today()).unwrap().time_spent.total_minutes(), 90);
    }

    #[test]
    fn test_save_time_creates_log_without_tasks() {
        let doc = SprintData::new_default(day(2024, 1, 1)).save_time(today(), today(), 0, 45);
        let log = doc.log_for(today()).unwrap();
        assert!(log.tasks.is_empty());
        assert_eq!(log.time_spent, TimeSpent { hours: 0, minutes: 45 });
        assert_eq!(doc.days_with_data().into_iter().collect::<Vec<_>>(), vec![today()]);
    }

    #[test]
    fn test_wins_append_to_the_same_entry() {
        let doc = seeded().add_win(today(), today(), "second win");
        assert_eq!(doc.todays_wins.len(), 1);
        assert_eq!(doc.wins_for_date(today()), ["shipped", "second win"]);
        assert!(doc.wins_for_date(yesterday()).is_empty());
    }

    #[test]
    fn test_weekly_milestone_is_filed_under_current_week() {
        let doc = seeded();
        let week = week_key_of(today());
        assert_eq!(doc.milestones_for_week(week).len(), 1);
        assert_eq!(doc.milestones_for_week(week)[0].week.to_string(), "2024-W07");
        assert!(doc.milestones_for_week(week_key_of(day(2024, 3, 1))).is_empty());
    }

    #[test]
    fn test_double_toggle_is_identity() {
        let doc = seeded();
        let weekly = doc.weekly_milestones[0].id.clone();
        let sprint = doc.sprint_milestones[0].id.clone();

        let once = doc.toggle_weekly_milestone(&weekly);
        assert!(once.weekly_milestones[0].done);
        assert_eq!(once.toggle_weekly_milestone(&weekly), doc);
        assert_eq!(doc.toggle_sprint_milestone(&sprint).toggle_sprint_milestone(&sprint), doc);
        assert_eq!(doc.toggle_weekly_milestone("missing"), doc);
    }

    #[test]
    fn test_update_sprint_config_applies_given_fields() {
        let doc = seeded();
        let update = SprintConfigUpdate {
            name: Some("Spring push".into()),
            end_date: Some(day(2023, 12, 1)),
            ..SprintConfigUpdate::default()
        };
        let next = doc.update_sprint_config(&update);
        assert_eq!(next.sprint_config.name, "Spring push");
        assert_eq!(next.sprint_config.start_date, doc.sprint_config.start_date);
        assert_eq!(next.sprint_config.end_date, day(2023, 12, 1));

        let blank = SprintConfigUpdate {
            name: Some("  ".into()),
            ..SprintConfigUpdate::default()
        };
        assert_eq!(doc.update_sprint_config(&blank), doc);
        assert!(SprintConfigUpdate::default().is_empty());
    }
}
