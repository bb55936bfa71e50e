use chrono::NaiveDate;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{StorageAdapter, StorageError};
use crate::core::day_plan::{DayPlan, storage_key};

/// Stores each day as `timebox-YYYY-MM-DD.json` inside one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.json", storage_key(date)))
    }

    fn temp_path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", storage_key(date)))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl StorageAdapter for JsonFileStorage {
    fn load(&self, date: NaiveDate) -> Result<Option<DayPlan>, StorageError> {
        let path = self.path_for(date);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: storage_key(date),
                source,
            })
    }

    fn save(&self, plan: &DayPlan) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;

        let json = serde_json::to_string_pretty(plan)?;
        let path = self.path_for(plan.date);
        let tmp = self.temp_path_for(plan.date);

        // Write beside the target and rename over it so readers never see
        // a half-written record.
        std::fs::write(&tmp, json).map_err(io_err(&tmp))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&path)(e));
        }

        log::debug!("Saved {} to {}", plan.storage_key(), path.display());
        Ok(())
    }
}
