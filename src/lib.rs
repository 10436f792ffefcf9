//! # appshell
//!
//! Client application shell for a thin web frontend: keeps the hosted auth
//! backend's session mirrored into local reactive state, contains render-time
//! faults behind a boundary that keeps a persisted fault log, and tracks the
//! host's connectivity.
//!
//! The crate is UI-framework agnostic. Collaborators the shell cannot own (the
//! auth backend, durable key-value storage, the host page) are traits injected
//! at construction. The `web` feature adds browser implementations of them
//! when building for `wasm32`.

pub mod bootstrap;
pub mod config;
pub mod connectivity;
pub mod fault;
pub mod host;
pub mod logging;
mod runtime;
pub mod session;
pub mod shell;
pub mod storage;
#[cfg(all(test, not(target_arch = "wasm32")))]
pub(crate) mod test_helpers;
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod web;

pub use config::{AuthConfig, BuildMode, ShellConfig};
pub use connectivity::{Connectivity, ConnectivityEvent, ConnectivityMonitor};
pub use fault::{FaultBoundary, FaultLog, FaultRecord, Rendered, RecoveryView};
pub use host::{HeadlessHost, HostEnvironment, HostError};
pub use session::{AuthBackend, AuthError, AuthViewState, Session, SessionSync, User};
pub use shell::AppShell;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
