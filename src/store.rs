use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::calendar::Clock;
use crate::sprint::SprintConfigUpdate;
use crate::storage::{self, Storage, StorageError};
use crate::types::{SprintData, TaskStatus};
use crate::view::Dashboard;

/// Owns the canonical document and writes it back after every mutation.
///
/// Mutations return whether the document actually changed; ignored input
/// still triggers the write.
pub struct SprintStore {
    storage: Storage,
    clock: Box<dyn Clock>,
}

impl SprintStore {
    pub fn open(storage_path: impl Into<PathBuf>, clock: Box<dyn Clock>) -> Result<Self, StorageError> {
        let mut storage = Storage::new(storage_path, clock.today());
        storage.initialize()?;
        Ok(Self { storage, clock })
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn data(&self) -> &SprintData {
        self.storage.data()
    }

    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    /// Read model for `selected`, or for today when nothing is selected.
    pub fn dashboard(&self, selected: Option<NaiveDate>) -> Dashboard {
        let today = self.today();
        Dashboard::build(self.data(), today, selected.unwrap_or(today))
    }

    fn next_document<F>(&self, op: &'static str, mutate: F) -> (SprintData, bool)
    where
        F: FnOnce(&SprintData, NaiveDate) -> SprintData,
    {
        let next = mutate(self.storage.data(), self.today());
        let changed = next != *self.storage.data();
        debug!(op, changed, "applied sprint mutation");
        (next, changed)
    }

    fn apply<F>(&mut self, op: &'static str, mutate: F) -> Result<bool, StorageError>
    where
        F: FnOnce(&SprintData, NaiveDate) -> SprintData,
    {
        let (next, changed) = self.next_document(op, mutate);
        self.storage.replace(next)?;
        Ok(changed)
    }

    /// Apply any `(document, today) -> document` operation and persist the
    /// result without blocking the async runtime. Used by the MCP server.
    pub async fn apply_async<F>(&mut self, op: &'static str, mutate: F) -> Result<bool, StorageError>
    where
        F: FnOnce(&SprintData, NaiveDate) -> SprintData,
    {
        let (next, changed) = self.next_document(op, mutate);
        self.storage.replace_async(next).await?;
        Ok(changed)
    }

    pub fn add_task(&mut self, date: NaiveDate, text: &str) -> Result<bool, StorageError> {
        self.apply("add_task", |doc, today| doc.add_task(today, date, text))
    }

    pub fn set_task_status(
        &mut self,
        date: NaiveDate,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<bool, StorageError> {
        self.apply("set_task_status", |doc, today| {
            doc.set_task_status(today, date, task_id, status)
        })
    }

    pub fn remove_task(&mut self, date: NaiveDate, task_id: &str) -> Result<bool, StorageError> {
        self.apply("remove_task", |doc, today| doc.remove_task(today, date, task_id))
    }

    pub fn save_time(
        &mut self,
        date: NaiveDate,
        hours: i64,
        minutes: i64,
    ) -> Result<bool, StorageError> {
        self.apply("save_time", |doc, today| {
            doc.save_time(today, date, hours, minutes)
        })
    }

    pub fn save_notes(&mut self, date: NaiveDate, notes: &str) -> Result<bool, StorageError> {
        self.apply("save_notes", |doc, today| doc.save_notes(today, date, notes))
    }

    pub fn add_win(&mut self, date: NaiveDate, text: &str) -> Result<bool, StorageError> {
        self.apply("add_win", |doc, today| doc.add_win(today, date, text))
    }

    pub fn add_weekly_milestone(&mut self, text: &str) -> Result<bool, StorageError> {
        self.apply("add_weekly_milestone", |doc, today| {
            doc.add_weekly_milestone(today, text)
        })
    }

    pub fn toggle_weekly_milestone(&mut self, id: &str) -> Result<bool, StorageError> {
        self.apply("toggle_weekly_milestone", |doc, _| {
            doc.toggle_weekly_milestone(id)
        })
    }

    pub fn add_sprint_milestone(&mut self, text: &str) -> Result<bool, StorageError> {
        self.apply("add_sprint_milestone", |doc, _| doc.add_sprint_milestone(text))
    }

    pub fn toggle_sprint_milestone(&mut self, id: &str) -> Result<bool, StorageError> {
        self.apply("toggle_sprint_milestone", |doc, _| {
            doc.toggle_sprint_milestone(id)
        })
    }

    pub fn update_sprint_config(
        &mut self,
        update: &SprintConfigUpdate,
    ) -> Result<bool, StorageError> {
        self.apply("update_sprint_config", |doc, _| doc.update_sprint_config(update))
    }

    pub fn export_snapshot(&self) -> Result<Vec<u8>, StorageError> {
        let bytes = storage::export_snapshot(self.data())?;
        info!(bytes = bytes.len(), "exported sprint snapshot");
        Ok(bytes)
    }

    /// Replace the whole document with a parsed snapshot. On
    /// [`StorageError::ParseFailure`] the current document is untouched.
    pub fn import_snapshot(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let imported = storage::import_snapshot(bytes)?;
        self.storage.replace(imported)?;
        info!(path = %self.storage.path().display(), "imported sprint snapshot");
        Ok(())
    }

    pub async fn import_snapshot_async(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let imported = storage::import_snapshot(bytes)?;
        self.storage.replace_async(imported).await?;
        info!(path = %self.storage.path().display(), "imported sprint snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FixedClock;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open_at(path: &Path, today: NaiveDate) -> SprintStore {
        SprintStore::open(path, Box::new(FixedClock(today))).unwrap()
    }

    #[test]
    fn test_every_mutation_is_written_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let today = day(2024, 2, 14);

        let mut store = open_at(&path, today);
        assert!(store.add_task(today, "draft outline").unwrap());
        assert!(store.save_time(today, 2, 5).unwrap());
        assert!(store.add_sprint_milestone("beta").unwrap());

        let reopened = open_at(&path, today);
        assert_eq!(reopened.data(), store.data());
        assert_eq!(reopened.data().tasks_for_date(today)[0].text, "draft outline");
    }

    #[test]
    fn test_ignored_mutations_report_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let today = day(2024, 2, 14);
        let mut store = open_at(&dir.path().join("data.json"), today);
        let before = store.data().clone();

        assert!(!store.add_task(day(2024, 2, 13), "yesterday").unwrap());
        assert!(!store.add_win(today, "   ").unwrap());
        assert!(!store.toggle_sprint_milestone("nope").unwrap());
        assert_eq!(*store.data(), before);
    }

    #[test]
    fn test_failed_import_leaves_document_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let today = day(2024, 2, 14);
        let mut store = open_at(&path, today);
        store.add_win(today, "kept").unwrap();
        let before = store.data().clone();

        let err = store.import_snapshot(b"<html>").unwrap_err();
        assert!(matches!(err, StorageError::ParseFailure(_)));
        assert_eq!(*store.data(), before);
        assert_eq!(*open_at(&path, today).data(), before);
    }

    #[test]
    fn test_failed_write_leaves_document_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let today = day(2024, 2, 14);
        let mut store = open_at(&path, today);
        let before = store.data().clone();
        let incoming = before.add_sprint_milestone("from elsewhere");
        let exported = storage::export_snapshot(&incoming).unwrap();
        std::fs::create_dir(path.with_extension("tmp")).unwrap();

        assert!(store.add_task(today, "x").is_err());
        assert!(store.data().tasks_for_date(today).is_empty());
        assert!(store.import_snapshot(&exported).is_err());
        assert_eq!(*store.data(), before);
        assert_eq!(*open_at(&path, today).data(), before);
    }

    #[tokio::test]
    async fn test_apply_async_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let today = day(2024, 2, 14);
        let mut store = open_at(&path, today);

        let changed = store
            .apply_async("add_task", |doc, today| doc.add_task(today, today, "async task"))
            .await
            .unwrap();
        assert!(changed);
        let unchanged = store
            .apply_async("toggle_sprint_milestone", |doc, _| doc.toggle_sprint_milestone("nope"))
            .await
            .unwrap();
        assert!(!unchanged);
        assert_eq!(open_at(&path, today).data(), store.data());
    }

    #[test]
    fn test_import_replaces_without_merging() {
        let dir = tempfile::tempdir().unwrap();
        let today = day(2024, 2, 14);

        let mut source = open_at(&dir.path().join("a.json"), today);
        source.add_weekly_milestone("from elsewhere").unwrap();
        let bytes = source.export_snapshot().unwrap();

        let mut target = open_at(&dir.path().join("b.json"), today);
        target.add_task(today, "local only").unwrap();
        target.import_snapshot(&bytes).unwrap();
        assert_eq!(target.data(), source.data());
        assert!(target.data().tasks_for_date(today).is_empty());
    }
}
