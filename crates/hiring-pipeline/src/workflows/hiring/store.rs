use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::domain::{ApplicationId, ApplicationRecord};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("application already exists: {0}")]
    Conflict(ApplicationId),
    #[error("application not found: {0}")]
    NotFound(ApplicationId),
}

/// Owns every application record, with one lock per application id.
///
/// The outer map lock is only held long enough to find or insert an entry, so
/// mutations of distinct applications never wait on each other. `update` runs the
/// mutation against a copy and commits it only when the closure succeeds.
#[derive(Debug, Default)]
pub struct ApplicationStore {
    records: RwLock<HashMap<ApplicationId, Arc<Mutex<ApplicationRecord>>>>,
}

impl ApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ApplicationRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if records.contains_key(&record.application_id) {
            return Err(StoreError::Conflict(record.application_id));
        }
        records.insert(record.application_id.clone(), Arc::new(Mutex::new(record)));
        Ok(())
    }

    pub fn contains(&self, id: &ApplicationId) -> bool {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn get(&self, id: &ApplicationId) -> Option<ApplicationRecord> {
        let entry = self.entry(id)?;
        let record = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Some(record.clone())
    }

    /// Atomic read-modify-write of a single application.
    pub fn update<T, E, F>(&self, id: &ApplicationId, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut ApplicationRecord) -> Result<T, E>,
        E: From<StoreError>,
    {
        let entry = self
            .entry(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let mut record = entry.lock().unwrap_or_else(PoisonError::into_inner);
        let mut draft = record.clone();
        let value = mutate(&mut draft)?;
        *record = draft;
        Ok(value)
    }

    /// Snapshot of every record, oldest first.
    pub fn snapshot(&self) -> Vec<ApplicationRecord> {
        let entries: Vec<Arc<Mutex<ApplicationRecord>>> = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut records: Vec<ApplicationRecord> = entries
            .iter()
            .map(|entry| entry.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.application_id.cmp(&b.application_id))
        });
        records
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, id: &ApplicationId) -> Option<Arc<Mutex<ApplicationRecord>>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}
