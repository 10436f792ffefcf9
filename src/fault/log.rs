//! Bounded FIFO history of fault records persisted in a [`KeyValueStore`].
//!
//! DESIGN
//! ======
//! The whole history is one JSON array under a single key. Appends are a
//! read-modify-write; a mutex serializes them so boundaries sharing one
//! `FaultLog` never lose each other's entries. Writers in other processes
//! sharing the same medium are not coordinated.
//!
//! ERROR HANDLING
//! ==============
//! Every operation returns its failure. Callers on the fault path log and
//! swallow it: a broken log must never mask the fault being recorded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::{DEFAULT_FAULT_LOG_CAPACITY, DEFAULT_FAULT_LOG_KEY};
use crate::storage::{KeyValueStore, StorageError};

use super::record::FaultRecord;

#[derive(Debug, thiserror::Error)]
pub enum FaultLogError {
    #[error("fault log storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The stored value is not a JSON array of records.
    #[error("fault log is corrupt: {0}")]
    Corrupt(String),

    #[error("fault log encode failed: {0}")]
    Encode(String),
}

pub struct FaultLog {
    store: Arc<dyn KeyValueStore>,
    key: String,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl FaultLog {
    /// Log under the default key with the default capacity.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, DEFAULT_FAULT_LOG_KEY, DEFAULT_FAULT_LOG_CAPACITY)
    }

    /// Log under `key`, retaining at most `capacity` records (minimum 1).
    #[must_use]
    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>, capacity: usize) -> Self {
        Self { store, key: key.into(), capacity: capacity.max(1), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `record`, evicting the oldest entries beyond capacity.
    ///
    /// Returns the number of records retained after the append.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored history cannot be read, decoded or
    /// written back. The stored value is left unchanged in that case.
    pub fn append(&self, record: FaultRecord) -> Result<usize, FaultLogError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records: VecDeque<FaultRecord> = self.read_unlocked()?.into();
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
        let raw = serde_json::to_string(&records).map_err(|e| FaultLogError::Encode(e.to_string()))?;
        self.store.set(&self.key, &raw)?;
        Ok(records.len())
    }

    /// Stored records, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored history cannot be read or decoded.
    pub fn records(&self) -> Result<Vec<FaultRecord>, FaultLogError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_unlocked()
    }

    /// Remove the persisted history.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the removal.
    pub fn clear(&self) -> Result<(), FaultLogError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.remove(&self.key)?;
        Ok(())
    }

    fn read_unlocked(&self) -> Result<Vec<FaultRecord>, FaultLogError> {
        match self.store.get(&self.key)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| FaultLogError::Corrupt(e.to_string())),
            None => Ok(Vec::new()),
        }
    }
}

impl std::fmt::Debug for FaultLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultLog")
            .field("key", &self.key)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "log_test.rs"]
mod tests;
