//! Shared fixtures for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::fault::{Fault, FaultRecord};
use crate::host::{HostEnvironment, HostError};
use crate::storage::{KeyValueStore, StorageError};

/// Store whose every operation fails, like `localStorage` in a locked-down
/// browser profile.
#[derive(Debug, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("storage disabled".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("quota exceeded".into()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("storage disabled".into()))
    }
}

/// Host whose reload and navigation can be made to fail, recording attempts.
#[derive(Debug, Default)]
pub struct FlakyHost {
    pub fail_reload: AtomicBool,
    pub fail_navigate: AtomicBool,
    pub attempts: Mutex<Vec<String>>,
}

impl FlakyHost {
    pub fn failing(reload: bool, navigate: bool) -> Self {
        Self {
            fail_reload: AtomicBool::new(reload),
            fail_navigate: AtomicBool::new(navigate),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

impl HostEnvironment for FlakyHost {
    fn location_href(&self) -> Option<String> {
        None
    }

    fn user_agent(&self) -> Option<String> {
        None
    }

    fn reload(&self) -> Result<(), HostError> {
        self.attempts.lock().unwrap().push("reload".into());
        if self.fail_reload.load(Ordering::SeqCst) {
            return Err(HostError::Failed("reload blocked".into()));
        }
        Ok(())
    }

    fn navigate(&self, href: &str) -> Result<(), HostError> {
        self.attempts.lock().unwrap().push(format!("navigate:{href}"));
        if self.fail_navigate.load(Ordering::SeqCst) {
            return Err(HostError::Failed("navigation blocked".into()));
        }
        Ok(())
    }
}

/// Host that panics when asked for details, to exercise the capture shell.
#[derive(Debug, Default)]
pub struct PanickingHost;

impl HostEnvironment for PanickingHost {
    fn location_href(&self) -> Option<String> {
        panic!("location unavailable during teardown")
    }

    fn user_agent(&self) -> Option<String> {
        None
    }

    fn reload(&self) -> Result<(), HostError> {
        Ok(())
    }

    fn navigate(&self, _href: &str) -> Result<(), HostError> {
        Ok(())
    }
}

pub fn record(n: usize) -> FaultRecord {
    FaultRecord::capture(
        &format!("error-{n}-test"),
        &Fault::new(format!("fault {n}")),
        None,
        Some("test-agent".into()),
        Some("https://app.test/".into()),
    )
}
