use super::*;
use crate::session::backend::{AuthEventHub, Subscription};
use crate::session::types::{AuthEvent, Session, User};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;

// =============================================================================
// MockBackend
// =============================================================================

type SessionResult = Result<Option<Session>, AuthError>;

#[derive(Default)]
struct MockBackend {
    hub: AuthEventHub,
    calls: Mutex<Vec<&'static str>>,
    initial_gate: Mutex<Option<oneshot::Receiver<SessionResult>>>,
    initial_panics: bool,
    sign_in_result: Mutex<Option<Result<AuthData, AuthError>>>,
    sign_out_panics: bool,
    sign_up_requests: Mutex<Vec<SignUpRequest>>,
    announce: Mutex<Option<AuthChange>>,
}

impl MockBackend {
    /// Backend whose initial query blocks until the returned sender fires.
    fn gated() -> (Self, oneshot::Sender<SessionResult>) {
        let (tx, rx) = oneshot::channel();
        let backend = Self { initial_gate: Mutex::new(Some(rx)), ..Self::default() };
        (backend, tx)
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AuthBackend for MockBackend {
    fn subscribe(&self) -> Subscription {
        self.calls.lock().unwrap().push("subscribe");
        match self.announce.lock().unwrap().take() {
            Some(initial) => self.hub.subscribe_with(initial),
            None => self.hub.subscribe(),
        }
    }

    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        self.calls.lock().unwrap().push("get_session");
        assert!(!self.initial_panics, "session storage corrupted");
        let gate = self.initial_gate.lock().unwrap().take();
        match gate {
            Some(rx) => rx.await.unwrap_or(Ok(None)),
            None => Ok(None),
        }
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<AuthData, AuthError> {
        self.sign_up_requests.lock().unwrap().push(request);
        Ok(AuthData { user: Some(User::new("new-user")), session: None })
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<AuthData, AuthError> {
        self.calls.lock().unwrap().push("sign_in");
        self.sign_in_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(AuthData::from_session(session_for("u1", email))))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        assert!(!self.sign_out_panics, "transport torn down");
        Ok(())
    }
}

fn session_for(id: &str, email: &str) -> Session {
    Session::new(format!("token-{id}"), User::new(id).with_email(email))
}

fn options() -> SessionSyncOptions {
    SessionSyncOptions { redirect_to: "https://app.test".into() }
}

async fn settled(sync: &SessionSync) -> AuthViewState {
    let mut rx = sync.watch();
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| !s.loading))
        .await
        .expect("state never settled")
        .unwrap()
        .clone()
}

async fn let_tasks_run() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// =============================================================================
// mount / initial query
// =============================================================================

#[tokio::test]
async fn starts_loading_with_no_session() {
    let (backend, _gate) = MockBackend::gated();
    let sync = SessionSync::mount(Arc::new(backend), options());
    assert_eq!(sync.state(), AuthViewState::default());
    assert!(sync.state().loading);
    assert!(sync.is_mounted());
}

#[tokio::test]
async fn subscribes_before_initial_query() {
    let backend = Arc::new(MockBackend::default());
    let sync = SessionSync::mount(backend.clone(), options());
    settled(&sync).await;
    assert_eq!(backend.calls(), vec!["subscribe", "get_session"]);
}

#[tokio::test]
async fn initial_query_populates_session_and_user() {
    let (backend, gate) = MockBackend::gated();
    let sync = SessionSync::mount(Arc::new(backend), options());

    gate.send(Ok(Some(session_for("u1", "a@test")))).unwrap();
    let state = settled(&sync).await;

    assert_eq!(state.session.as_ref().map(|s| s.user.id.as_str()), Some("u1"));
    assert_eq!(state.user.as_ref().map(|u| u.id.as_str()), Some("u1"));
    assert!(state.is_authenticated());
}

#[tokio::test]
async fn initial_query_error_clears_loading_without_session() {
    let (backend, gate) = MockBackend::gated();
    let sync = SessionSync::mount(Arc::new(backend), options());

    gate.send(Err(AuthError::Transport("offline".into()))).unwrap();
    let state = settled(&sync).await;

    assert!(state.session.is_none());
    assert!(state.user.is_none());
}

#[tokio::test]
async fn initial_query_panic_clears_loading() {
    let backend = MockBackend { initial_panics: true, ..MockBackend::default() };
    let sync = SessionSync::mount(Arc::new(backend), options());

    let state = settled(&sync).await;
    assert!(state.session.is_none());
}

// =============================================================================
// notifications
// =============================================================================

#[tokio::test]
async fn notification_before_initial_query_wins() {
    let (backend, gate) = MockBackend::gated();
    let backend = Arc::new(backend);
    let sync = SessionSync::mount(backend.clone(), options());

    backend.hub.emit(&AuthChange::new(AuthEvent::SignedIn, Some(session_for("fresh", "f@test"))));
    let state = settled(&sync).await;
    assert_eq!(state.user.as_ref().map(|u| u.id.as_str()), Some("fresh"));

    gate.send(Ok(Some(session_for("stale", "s@test")))).unwrap();
    let_tasks_run().await;

    let state = sync.state();
    assert_eq!(state.session.as_ref().map(|s| s.user.id.as_str()), Some("fresh"));
    assert_eq!(state.user.as_ref().map(|u| u.id.as_str()), Some("fresh"));
}

#[tokio::test]
async fn initial_session_announcement_resolves_loading() {
    let (backend, _gate) = MockBackend::gated();
    *backend.announce.lock().unwrap() =
        Some(AuthChange::new(AuthEvent::InitialSession, Some(session_for("cached", "c@test"))));
    let sync = SessionSync::mount(Arc::new(backend), options());

    let state = settled(&sync).await;
    assert_eq!(state.user.as_ref().map(|u| u.id.as_str()), Some("cached"));
}

#[tokio::test]
async fn notifications_update_session_and_user_together() {
    let backend = Arc::new(MockBackend::default());
    let sync = SessionSync::mount(backend.clone(), options());
    settled(&sync).await;

    let mut rx = sync.watch();
    backend.hub.emit(&AuthChange::new(AuthEvent::SignedIn, Some(session_for("u2", "b@test"))));
    rx.changed().await.unwrap();
    {
        let state = rx.borrow_and_update();
        assert_eq!(state.session.as_ref().map(|s| s.user.id.as_str()), Some("u2"));
        assert_eq!(state.user.as_ref().map(|u| u.id.as_str()), Some("u2"));
    }

    backend.hub.emit(&AuthChange::new(AuthEvent::SignedOut, None));
    rx.changed().await.unwrap();
    let state = rx.borrow_and_update().clone();
    assert!(state.session.is_none());
    assert!(state.user.is_none());
    assert!(!state.loading);
}

// =============================================================================
// unmount
// =============================================================================

#[tokio::test]
async fn no_state_write_after_unmount() {
    let (backend, gate) = MockBackend::gated();
    let backend = Arc::new(backend);
    let sync = SessionSync::mount(backend.clone(), options());

    sync.unmount();
    assert!(!sync.is_mounted());
    assert_eq!(backend.hub.listener_count(), 0);

    let _ = gate.send(Ok(Some(session_for("late", "l@test"))));
    assert_eq!(backend.hub.emit(&AuthChange::new(AuthEvent::SignedIn, Some(session_for("late", "l@test")))), 0);
    let_tasks_run().await;

    assert_eq!(sync.state(), AuthViewState::default());
}

#[tokio::test]
async fn unmount_is_idempotent_and_runs_on_drop() {
    let backend = Arc::new(MockBackend::default());
    let sync = SessionSync::mount(backend.clone(), options());
    assert_eq!(backend.hub.listener_count(), 1);

    sync.unmount();
    sync.unmount();
    drop(sync);
    assert_eq!(backend.hub.listener_count(), 0);

    let sync = SessionSync::mount(backend.clone(), options());
    assert_eq!(backend.hub.listener_count(), 1);
    drop(sync);
    assert_eq!(backend.hub.listener_count(), 0);
}

#[tokio::test]
async fn mount_token_cancelled_resolves() {
    let token = MountToken::new();
    let waiter = token.clone();
    let handle = tokio::spawn(async move { waiter.cancelled().await });
    token.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    assert!(!token.is_live());
}

// =============================================================================
// operations
// =============================================================================

#[tokio::test]
async fn login_passes_backend_error_through() {
    let backend = MockBackend::default();
    let invalid = AuthError::Api { status: 400, message: "Invalid login credentials".into() };
    *backend.sign_in_result.lock().unwrap() = Some(Err(invalid.clone()));
    let sync = SessionSync::mount(Arc::new(backend), options());

    assert_eq!(sync.login("a@test", "wrong").await, Err(invalid));
}

#[tokio::test]
async fn login_returns_session_data() {
    let sync = SessionSync::mount(Arc::new(MockBackend::default()), options());
    let data = sync.login("a@test", "secret").await.unwrap();
    assert_eq!(data.user.unwrap().email.as_deref(), Some("a@test"));
    assert!(data.session.is_some());
}

#[tokio::test]
async fn logout_panic_becomes_unexpected_error() {
    let backend = MockBackend { sign_out_panics: true, ..MockBackend::default() };
    let sync = SessionSync::mount(Arc::new(backend), options());

    let err = sync.logout().await.unwrap_err();
    assert!(matches!(err, AuthError::Unexpected(ref msg) if msg.contains("transport torn down")));
}

#[tokio::test]
async fn logout_succeeds() {
    let sync = SessionSync::mount(Arc::new(MockBackend::default()), options());
    assert_eq!(sync.logout().await, Ok(()));
}

#[tokio::test]
async fn register_sends_redirect_and_display_name() {
    let backend = Arc::new(MockBackend::default());
    let sync = SessionSync::mount(backend.clone(), options());

    sync.register("n@test", "secret", Some("Ada Lovelace")).await.unwrap();
    sync.register("m@test", "secret", None).await.unwrap();

    let requests = backend.sign_up_requests.lock().unwrap().clone();
    assert_eq!(requests[0].redirect_to, "https://app.test");
    assert_eq!(requests[0].metadata["full_name"], "Ada Lovelace");
    assert!(requests[1].metadata.is_empty());
}
