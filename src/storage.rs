use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::SprintData;

pub const DATA_DIR_NAME: &str = ".sprint-dashboard";
pub const DATA_FILE_NAME: &str = "data.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Error importing data: {0}")]
    ParseFailure(#[source] serde_json::Error),
    #[error("couldn't find home dir for the default data file")]
    HomeDirUnavailable,
}

/// The single local slot holding the serialized [`SprintData`].
pub struct Storage {
    storage_path: PathBuf,
    data: SprintData,
}

impl Storage {
    /// Holds the default document for `today` until `initialize` runs.
    pub fn new(storage_path: impl Into<PathBuf>, today: NaiveDate) -> Self {
        Self {
            storage_path: storage_path.into(),
            data: SprintData::new_default(today),
        }
    }

    /// `~/.sprint-dashboard/data.json`
    pub fn default_path() -> Result<PathBuf, StorageError> {
        let home = dirs::home_dir().ok_or(StorageError::HomeDirUnavailable)?;
        Ok(home.join(DATA_DIR_NAME).join(DATA_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Load the stored document. A missing slot is seeded with the default
    /// document; an unparsable one is left on disk and the default is kept
    /// in memory until the next write.
    pub fn initialize(&mut self) -> Result<(), StorageError> {
        match fs::read(&self.storage_path) {
            Ok(bytes) => match serde_json::from_slice::<SprintData>(&bytes) {
                Ok(data) => {
                    info!(path = %self.storage_path.display(), "loaded sprint data");
                    self.data = data;
                }
                Err(err) => {
                    warn!(
                        path = %self.storage_path.display(),
                        error = %err,
                        "stored sprint data is unreadable, starting from defaults"
                    );
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.storage_path.display(), "no sprint data yet, creating defaults");
                self.save()?;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    pub fn data(&self) -> &SprintData {
        &self.data
    }

    /// Persist `data` and then make it the current document. When the
    /// write fails the current document is kept. The write happens even
    /// when the document did not change.
    pub fn replace(&mut self, data: SprintData) -> Result<(), StorageError> {
        write_document(&self.storage_path, &data)?;
        self.data = data;
        Ok(())
    }

    /// Same as [`Storage::replace`], with the file I/O moved onto a
    /// blocking task so async callers keep their worker thread.
    pub async fn replace_async(&mut self, data: SprintData) -> Result<(), StorageError> {
        let path = self.storage_path.clone();
        let snapshot = data.clone();
        tokio::task::spawn_blocking(move || write_document(&path, &snapshot))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!(
                    "spawn_blocking failed: {}",
                    e
                )))
            })??;
        self.data = data;
        Ok(())
    }

    /// Persist the current document.
    pub fn save(&self) -> Result<(), StorageError> {
        write_document(&self.storage_path, &self.data)
    }
}

/// Write `data` through a temporary file and an atomic rename to avoid
/// partial writes.
fn write_document(storage_path: &Path, data: &SprintData) -> Result<(), StorageError> {
    if let Some(parent) = storage_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp = storage_path.with_extension("tmp");
    let mut f = File::create(&temp)?;
    let content = serde_json::to_string(data)?;
    f.write_all(content.as_bytes())?;
    f.sync_all()?;
    fs::rename(temp, storage_path)?;
    Ok(())
}

/// Pretty-printed JSON of the whole document.
pub fn export_snapshot(data: &SprintData) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec_pretty(data)?)
}

pub fn import_snapshot(bytes: &[u8]) -> Result<SprintData, StorageError> {
    serde_json::from_slice(bytes).map_err(StorageError::ParseFailure)
}

pub fn export_file_name(today: NaiveDate) -> String {
    format!("sprint-dashboard-{}.json", today.format(crate::calendar::DATE_FORMAT))
}
