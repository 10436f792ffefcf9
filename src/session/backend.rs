//! Remote auth backend seam and change-notification plumbing.
//!
//! DESIGN
//! ======
//! The backend is a black box exposing session-issuing and session-query calls
//! plus a change-notification subscription. [`AuthEventHub`] is the shared
//! bookkeeping an implementation uses to hand out [`Subscription`]s and fan
//! out changes; releasing a subscription through its [`SubscriptionHandle`]
//! removes the listener so nothing is delivered afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::mpsc;

use super::types::{AuthChange, AuthData, AuthError, Session, SignUpRequest};

// Browser HTTP futures hold JS handles and are not `Send`.
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait AuthBackend: Send + Sync {
    /// Register for session-change notifications.
    fn subscribe(&self) -> Subscription;

    /// Current session, if any.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    async fn sign_up(&self, request: SignUpRequest) -> Result<AuthData, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthData, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

type Listeners = Mutex<HubListeners>;

#[derive(Default)]
struct HubListeners {
    next_id: u64,
    senders: HashMap<u64, mpsc::UnboundedSender<AuthChange>>,
}

/// Receiving end of a change subscription.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<AuthChange>,
    handle: SubscriptionHandle,
}

impl Subscription {
    /// A subscription that never delivers anything.
    #[must_use]
    pub fn detached() -> Self {
        let (_, events) = mpsc::unbounded_channel();
        Self { events, handle: SubscriptionHandle { id: 0, hub: Weak::new() } }
    }

    #[must_use]
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Next notification, `None` once the subscription is released.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        self.events.recv().await
    }

    #[must_use]
    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<AuthChange>, SubscriptionHandle) {
        (self.events, self.handle)
    }
}

/// Disposes a subscription. Cloneable so the owner can release it while the
/// receiver lives in a task.
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: u64,
    hub: Weak<Listeners>,
}

impl SubscriptionHandle {
    /// Stop delivery. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.lock().unwrap_or_else(PoisonError::into_inner).senders.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle").field("id", &self.id).finish_non_exhaustive()
    }
}

// =============================================================================
// HUB
// =============================================================================

/// Fan-out of [`AuthChange`]s to live subscriptions, in emit order.
#[derive(Clone, Default)]
pub struct AuthEventHub {
    listeners: Arc<Listeners>,
}

impl AuthEventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.register(None)
    }

    /// Subscribe with `initial` queued ahead of any later change, so the new
    /// listener learns the current state before anything else.
    #[must_use]
    pub fn subscribe_with(&self, initial: AuthChange) -> Subscription {
        self.register(Some(initial))
    }

    fn register(&self, initial: Option<AuthChange>) -> Subscription {
        let (tx, events) = mpsc::unbounded_channel();
        if let Some(change) = initial {
            // The receiver is alive in this scope.
            let _ = tx.send(change);
        }
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.senders.insert(id, tx);
        Subscription { events, handle: SubscriptionHandle { id, hub: Arc::downgrade(&self.listeners) } }
    }

    /// Deliver `change` to every live subscription. Returns how many received
    /// it; listeners whose receiver is gone are pruned.
    pub fn emit(&self, change: &AuthChange) -> usize {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.senders.retain(|_, tx| tx.send(change.clone()).is_ok());
        listeners.senders.len()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).senders.len()
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "backend_test.rs"]
mod tests;
