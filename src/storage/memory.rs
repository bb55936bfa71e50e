use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{StorageAdapter, StorageError};
use crate::core::day_plan::{DayPlan, storage_key};

/// Keeps serialized records in a shared in-process map. Clones share the
/// same map, so a caller can hand one clone to a store and inspect another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // Inspection helpers see the map even after a panicking holder;
    // only the adapter methods report a poisoned lock.
    fn records(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raw serialized record, as it would sit in a key-value store.
    pub fn raw(&self, date: NaiveDate) -> Option<String> {
        self.records().get(&storage_key(date)).cloned()
    }

    pub fn insert_raw(&self, date: NaiveDate, json: impl Into<String>) {
        self.records().insert(storage_key(date), json.into());
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageAdapter for MemoryStorage {
    fn load(&self, date: NaiveDate) -> Result<Option<DayPlan>, StorageError> {
        let key = storage_key(date);
        let records = self
            .records
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        match records.get(&key) {
            Some(json) => serde_json::from_str(json)
                .map(Some)
                .map_err(|source| StorageError::Corrupt { key, source }),
            None => Ok(None),
        }
    }

    fn save(&self, plan: &DayPlan) -> Result<(), StorageError> {
        let json = serde_json::to_string(plan)?;
        self.records
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?
            .insert(plan.storage_key(), json);
        Ok(())
    }
}
