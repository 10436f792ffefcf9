//! Application shell wiring.
//!
//! DESIGN
//! ======
//! `AppShell` owns one of each long-lived piece: the shared fault log, the
//! mounted session sync and the connectivity monitor. Boundaries handed out by
//! [`AppShell::boundary`] all append to the same `Arc<FaultLog>`, so their
//! writes are serialized within the process.

use std::sync::Arc;

use tracing::info;

use crate::config::{AuthConfig, ConfigError, ShellConfig};
use crate::connectivity::ConnectivityMonitor;
use crate::fault::{FaultBoundary, FaultLog};
use crate::host::{HeadlessHost, HostEnvironment};
use crate::session::{AuthBackend, AuthError, GoTrueBackend, SessionSync, SessionSyncOptions};
use crate::storage::{FileStore, KeyValueStore, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub struct AppShell {
    config: ShellConfig,
    store: Arc<dyn KeyValueStore>,
    host: Arc<dyn HostEnvironment>,
    fault_log: Arc<FaultLog>,
    session: SessionSync,
    connectivity: ConnectivityMonitor,
}

impl AppShell {
    /// Wire the shell and mount session sync against `backend`.
    ///
    /// # Panics
    ///
    /// On native targets, panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(
        config: ShellConfig,
        store: Arc<dyn KeyValueStore>,
        host: Arc<dyn HostEnvironment>,
        backend: Arc<dyn AuthBackend>,
    ) -> Self {
        let fault_log = Arc::new(FaultLog::with_key(
            store.clone(),
            config.fault_log_key.clone(),
            config.fault_log_capacity,
        ));
        let session = SessionSync::mount(backend, SessionSyncOptions { redirect_to: config.app_origin.clone() });
        info!(
            build_mode = ?config.build_mode,
            fault_log_key = %config.fault_log_key,
            "app shell started"
        );
        Self { config, store, host, fault_log, session, connectivity: ConnectivityMonitor::default() }
    }

    /// Native shell from the environment: file-backed storage under
    /// `storage_dir`, a headless host at `app_origin` and the GoTrue backend.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing or invalid, the storage
    /// directory cannot be created, or the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, ShellError> {
        let config = ShellConfig::load()?;
        let auth = AuthConfig::from_env()?;
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.storage_dir)?);
        let host = Arc::new(HeadlessHost::new(format!("{}/", config.app_origin)));
        let backend = Arc::new(GoTrueBackend::new(&auth)?.with_store(store.clone()));
        Ok(Self::new(config, store, host, backend))
    }

    /// A fresh boundary recording into the shared fault log.
    #[must_use]
    pub fn boundary<V: Clone>(&self) -> FaultBoundary<V> {
        FaultBoundary::new(self.fault_log.clone(), self.host.clone(), self.config.build_mode)
    }

    #[must_use]
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    #[must_use]
    pub fn host(&self) -> &Arc<dyn HostEnvironment> {
        &self.host
    }

    #[must_use]
    pub fn fault_log(&self) -> &Arc<FaultLog> {
        &self.fault_log
    }

    #[must_use]
    pub fn session(&self) -> &SessionSync {
        &self.session
    }

    #[must_use]
    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Unmount session sync. Also happens when the shell is dropped.
    pub fn shutdown(&self) {
        self.session.unmount();
        info!("app shell stopped");
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "shell_test.rs"]
mod tests;
