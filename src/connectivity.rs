//! Online/offline status mirrored from the host.
//!
//! The host pushes [`ConnectivityEvent`]s (browser `online`/`offline` events
//! under the `web` feature); consumers read [`Connectivity`] snapshots or watch
//! for changes. Both flags are derived from one value so they never disagree.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

/// Complementary connectivity flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connectivity {
    pub is_online: bool,
    pub is_offline: bool,
}

impl Connectivity {
    #[must_use]
    pub const fn from_online(online: bool) -> Self {
        Self { is_online: online, is_offline: !online }
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::from_online(true)
    }
}

/// Cloneable handle to one connectivity state. Clones share the state.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<Connectivity>>,
}

impl ConnectivityMonitor {
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(Connectivity::from_online(initially_online));
        Self { state: Arc::new(state) }
    }

    /// Record the host's current signal. Returns whether the status changed.
    pub fn set_online(&self, online: bool) -> bool {
        let next = Connectivity::from_online(online);
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            info!(online, "connectivity changed");
        }
        changed
    }

    pub fn handle(&self, event: ConnectivityEvent) -> bool {
        self.set_online(event == ConnectivityEvent::Online)
    }

    #[must_use]
    pub fn status(&self) -> Connectivity {
        *self.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "connectivity_test.rs"]
mod tests;
