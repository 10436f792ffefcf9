//! Durable key-value storage used for the fault log and the cached session.
//!
//! SYSTEM CONTEXT
//! ==============
//! The shell never assumes a particular storage medium. Browsers back this with
//! `localStorage` (see the `web` feature), native embedders with [`FileStore`],
//! and tests with [`MemoryStore`]. Values are opaque strings; callers own the
//! encoding (JSON everywhere in this crate).

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors surfaced by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    /// The storage medium is not reachable in this environment.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the operation (quota, security policy, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Minimal string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the removal.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
