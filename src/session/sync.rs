//! Session synchronization: mirror the backend's session into local state.
//!
//! ARCHITECTURE
//! ============
//! `mount` subscribes to change notifications first and only then issues the
//! initial session query, so a change during startup cannot slip between the
//! two. Both run as background tasks (tokio natively, the browser's task
//! queue on `wasm32`) writing into one `watch` channel that consumers
//! observe. `loading` flips to false on whichever resolves first.
//!
//! Every asynchronous write checks the instance's [`MountToken`] inside the
//! channel's write lock. `unmount` cancels the token and then takes that lock
//! once, so when it returns no write can land anymore. In-flight backend calls
//! are not cancelled; their results are simply dropped.
//!
//! TRADE-OFFS
//! ==========
//! A notification is newer truth than the initial query: once one has been
//! applied, a later-resolving initial query only clears `loading`.
//!
//! ERROR HANDLING
//! ==============
//! register/login/logout return `Result`. Backend errors pass through; a panic
//! inside the backend call is caught and returned as
//! [`AuthError::Unexpected`]. Nothing escapes the wrapper.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use crate::fault::panic_message;
use crate::runtime::spawn_task;

use super::backend::{AuthBackend, SubscriptionHandle};
use super::types::{AuthChange, AuthData, AuthError, AuthViewState, SignUpRequest};

// =============================================================================
// MOUNT TOKEN
// =============================================================================

/// Liveness token of one mounted instance. Cancelled exactly once, at unmount.
#[derive(Clone, Debug)]
pub struct MountToken {
    cancelled: Arc<watch::Sender<bool>>,
}

impl MountToken {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { cancelled: Arc::new(tx) }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        !*self.cancelled.borrow()
    }

    pub fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.cancelled.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for MountToken {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SESSION SYNC
// =============================================================================

#[derive(Debug, Clone)]
pub struct SessionSyncOptions {
    /// Post-registration redirect target passed to sign-up.
    pub redirect_to: String,
}

pub struct SessionSync {
    backend: Arc<dyn AuthBackend>,
    state: Arc<watch::Sender<AuthViewState>>,
    token: MountToken,
    subscription: SubscriptionHandle,
    redirect_to: String,
}

impl SessionSync {
    /// Subscribe to `backend`, then start the initial session query.
    ///
    /// # Panics
    ///
    /// On native targets, panics if called outside a tokio runtime.
    #[must_use]
    pub fn mount(backend: Arc<dyn AuthBackend>, options: SessionSyncOptions) -> Self {
        let (state, _) = watch::channel(AuthViewState::default());
        let state = Arc::new(state);
        let token = MountToken::new();
        let notified = Arc::new(AtomicBool::new(false));

        let (events, subscription) = backend.subscribe().into_parts();
        spawn_task(listen(events, state.clone(), token.clone(), notified.clone()));
        spawn_task(initialize(backend.clone(), state.clone(), token.clone(), notified));
        debug!("session sync mounted");

        Self { backend, state, token, subscription, redirect_to: options.redirect_to }
    }

    /// Snapshot of the current view state.
    #[must_use]
    pub fn state(&self) -> AuthViewState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every committed state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthViewState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.token.is_live()
    }

    /// Stop mirroring: no state write happens after this returns. Idempotent.
    pub fn unmount(&self) {
        if !self.token.is_live() {
            return;
        }
        self.token.cancel();
        // Barrier: waits out a write that passed its liveness check.
        self.state.send_if_modified(|_| false);
        self.subscription.unsubscribe();
        debug!("session sync unmounted");
    }

    pub async fn register(&self, email: &str, password: &str, display_name: Option<&str>) -> Result<AuthData, AuthError> {
        info!(%email, "attempting sign up");
        let mut metadata = serde_json::Map::new();
        if let Some(name) = display_name {
            metadata.insert("full_name".into(), serde_json::Value::String(name.to_owned()));
        }
        let request = SignUpRequest {
            email: email.to_owned(),
            password: password.to_owned(),
            redirect_to: self.redirect_to.clone(),
            metadata,
        };

        let result = shielded(self.backend.sign_up(request)).await;
        match &result {
            Ok(data) => info!(has_user = data.user.is_some(), has_session = data.session.is_some(), "sign up succeeded"),
            Err(e) => error!(error = %e, "sign up failed"),
        }
        result
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthData, AuthError> {
        info!(%email, "attempting sign in");
        let result = shielded(self.backend.sign_in_with_password(email, password)).await;
        match &result {
            Ok(data) => info!(user_id = ?data.user.as_ref().map(|u| u.id.as_str()), "sign in succeeded"),
            Err(e) => error!(error = %e, "sign in failed"),
        }
        result
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        info!("attempting sign out");
        let result = shielded(self.backend.sign_out()).await;
        match &result {
            Ok(()) => info!("sign out succeeded"),
            Err(e) => error!(error = %e, "sign out failed"),
        }
        result
    }
}

impl Drop for SessionSync {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Run a backend call, turning a panic into [`AuthError::Unexpected`].
async fn shielded<T, F>(call: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>>,
{
    AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(AuthError::Unexpected(panic_message(&*payload))))
}

/// Apply `update` unless the instance has been unmounted.
fn commit(
    state: &watch::Sender<AuthViewState>,
    token: &MountToken,
    update: impl FnOnce(&mut AuthViewState) -> bool,
) -> bool {
    state.send_if_modified(|view| token.is_live() && update(view))
}

async fn listen(
    mut events: mpsc::UnboundedReceiver<AuthChange>,
    state: Arc<watch::Sender<AuthViewState>>,
    token: MountToken,
    notified: Arc<AtomicBool>,
) {
    loop {
        let change = tokio::select! {
            () = token.cancelled() => break,
            change = events.recv() => match change {
                Some(change) => change,
                None => break,
            },
        };

        info!(
            event = ?change.event,
            has_session = change.session.is_some(),
            user_id = ?change.session.as_ref().map(|s| s.user.id.as_str()),
            "auth state changed"
        );
        let applied = commit(&state, &token, |view| {
            notified.store(true, Ordering::SeqCst);
            view.apply_session(change.session);
            true
        });
        if !applied {
            debug!(event = ?change.event, "auth change dropped after unmount");
        }
    }
}

async fn initialize(
    backend: Arc<dyn AuthBackend>,
    state: Arc<watch::Sender<AuthViewState>>,
    token: MountToken,
    notified: Arc<AtomicBool>,
) {
    let result = AssertUnwindSafe(backend.get_session()).catch_unwind().await;
    if !token.is_live() {
        debug!("initial session dropped after unmount");
        return;
    }

    let session = match result {
        Ok(Ok(session)) => {
            info!(
                has_session = session.is_some(),
                user_id = ?session.as_ref().map(|s| s.user.id.as_str()),
                "initial session check"
            );
            Some(session)
        }
        Ok(Err(e)) => {
            error!(error = %e, "error getting session");
            None
        }
        Err(payload) => {
            error!(panic = %panic_message(&*payload), "auth initialization error");
            None
        }
    };

    commit(&state, &token, |view| {
        let was_loading = view.loading;
        match session {
            Some(session) if !notified.load(Ordering::SeqCst) => {
                view.apply_session(session);
                true
            }
            _ => {
                view.loading = false;
                was_loading
            }
        }
    });
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "sync_test.rs"]
mod tests;
