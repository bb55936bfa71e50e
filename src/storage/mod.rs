//! Per-date persistence of `DayPlan` records.
//!
//! Writes are last-write-wins and replace the whole record; a failed write
//! leaves the previous record in place.

pub mod file;
pub mod memory;

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::day_plan::DayPlan;

pub use file::JsonFileStorage;
pub use memory::MemoryStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize day plan: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("stored record {key} is unreadable: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub trait StorageAdapter {
    /// `Ok(None)` when nothing has been stored for `date` yet.
    fn load(&self, date: NaiveDate) -> Result<Option<DayPlan>, StorageError>;

    /// Replace the record for `plan.date` with `plan`.
    fn save(&self, plan: &DayPlan) -> Result<(), StorageError>;
}
