use super::*;
use crate::config::AuthTimeouts;
use crate::storage::MemoryStore;
use std::collections::HashMap;
use std::sync::Mutex;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};

// =========================================================================
// error_message / parse_auth_response
// =========================================================================

#[test]
fn error_message_prefers_description_fields() {
    assert_eq!(
        error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
        "Invalid login credentials"
    );
    assert_eq!(error_message(r#"{"code":422,"msg":"User already registered"}"#), "User already registered");
    assert_eq!(error_message(r#"{"message":"rate limited"}"#), "rate limited");
    assert_eq!(error_message("  upstream timeout \n"), "upstream timeout");
    assert_eq!(error_message(""), "unknown error");
}

#[test]
fn parse_session_response() {
    let data = parse_auth_response(
        r#"{"access_token":"at","token_type":"bearer","expires_in":3600,"refresh_token":"rt",
            "user":{"id":"u1","email":"a@test","user_metadata":{"full_name":"Ada"}}}"#,
    )
    .unwrap();
    let session = data.session.unwrap();
    assert_eq!(session.access_token, "at");
    assert_eq!(session.refresh_token.as_deref(), Some("rt"));
    assert_eq!(data.user.unwrap().display_name(), Some("Ada"));
}

#[test]
fn parse_bare_user_response() {
    let data = parse_auth_response(r#"{"id":"u2","email":"b@test"}"#).unwrap();
    assert!(data.session.is_none());
    assert_eq!(data.user.unwrap().id, "u2");
}

#[test]
fn parse_nested_user_response() {
    let data = parse_auth_response(r#"{"user":{"id":"u3"},"session":null}"#).unwrap();
    assert_eq!(data.user.unwrap().id, "u3");
}

#[test]
fn parse_rejects_unknown_shapes() {
    assert!(matches!(parse_auth_response(r#"{"hello":1}"#), Err(AuthError::Parse(_))));
    assert!(matches!(parse_auth_response("not json"), Err(AuthError::Parse(_))));
}

#[test]
fn stamp_expiry_derives_expires_at() {
    let mut session = Session::new("at", User::new("u1"));
    session.expires_in = Some(60);
    let stamped = stamp_expiry(session);
    let at = stamped.expires_at.unwrap();
    assert!(at > now_unix() && at <= now_unix() + 60);
}

#[test]
fn stamp_expiry_saturates_on_huge_lifetimes() {
    let mut session = Session::new("at", User::new("u1"));
    session.expires_in = Some(i64::MAX as u64);
    let stamped = stamp_expiry(session);
    assert_eq!(stamped.expires_at, Some(i64::MAX));
    assert!(!stamped.is_expired(now_unix()));
}

#[test]
fn huge_expires_in_from_server_keeps_session_valid() {
    let body = format!(
        r#"{{"access_token":"at","expires_in":{},"user":{{"id":"u1"}}}}"#,
        i64::MAX as u64 - 5
    );
    let session = stamp_expiry(parse_auth_response(&body).unwrap().session.unwrap());
    assert!(!session.is_expired(now_unix()));
}

// =========================================================================
// mock server
// =========================================================================

#[derive(Clone, Default)]
struct MockAuth {
    redirects: Arc<Mutex<Vec<String>>>,
    logouts: Arc<Mutex<Vec<String>>>,
}

fn session_json(token: &str, expires_at: i64) -> serde_json::Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": expires_at,
        "refresh_token": format!("refresh-{token}"),
        "user": { "id": "u1", "email": "a@test" }
    })
}

async fn token(
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    match params.get("grant_type").map(String::as_str) {
        Some("password") if body["password"] == "secret" => (StatusCode::OK, Json(session_json("at-1", now_unix() + 3600))),
        Some("refresh_token") if body["refresh_token"] == "refresh-expired" => {
            (StatusCode::OK, Json(session_json("at-2", now_unix() + 3600)))
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })),
        ),
    }
}

async fn signup(
    State(mock): State<MockAuth>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    mock.redirects
        .lock()
        .unwrap()
        .push(params.get("redirect_to").cloned().unwrap_or_default());
    Json(json!({ "id": "u-new", "email": body["email"], "user_metadata": body["data"] }))
}

async fn logout(State(mock): State<MockAuth>, headers: HeaderMap) -> StatusCode {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    mock.logouts.lock().unwrap().push(auth);
    StatusCode::NO_CONTENT
}

async fn spawn_mock() -> (MockAuth, AuthConfig) {
    let mock = MockAuth::default();
    let app = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/logout", post(logout))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let config = AuthConfig {
        url: format!("http://{addr}"),
        anon_key: "anon".into(),
        timeouts: AuthTimeouts { request_secs: 5, connect_secs: 5 },
    };
    (mock, config)
}

#[tokio::test]
async fn sign_in_caches_session_and_notifies() {
    let (_, config) = spawn_mock().await;
    let backend = GoTrueBackend::new(&config).unwrap();
    let mut sub = backend.subscribe();

    let initial = sub.recv().await.unwrap();
    assert_eq!(initial, AuthChange::new(AuthEvent::InitialSession, None));

    let data = backend.sign_in_with_password("a@test", "secret").await.unwrap();
    assert_eq!(data.user.unwrap().id, "u1");

    let change = sub.recv().await.unwrap();
    assert_eq!(change.event, AuthEvent::SignedIn);
    assert_eq!(change.session.unwrap().access_token, "at-1");
    assert_eq!(backend.get_session().await.unwrap().unwrap().access_token, "at-1");
}

#[tokio::test]
async fn sign_in_failure_maps_error_body() {
    let (_, config) = spawn_mock().await;
    let backend = GoTrueBackend::new(&config).unwrap();

    let err = backend.sign_in_with_password("a@test", "wrong").await.unwrap_err();
    assert_eq!(err, AuthError::Api { status: 400, message: "Invalid login credentials".into() });
    assert!(backend.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn sign_up_passes_redirect_and_returns_user() {
    let (mock, config) = spawn_mock().await;
    let backend = GoTrueBackend::new(&config).unwrap();

    let mut metadata = serde_json::Map::new();
    metadata.insert("full_name".into(), json!("Ada"));
    let data = backend
        .sign_up(SignUpRequest {
            email: "n@test".into(),
            password: "secret".into(),
            redirect_to: "https://app.test".into(),
            metadata,
        })
        .await
        .unwrap();

    assert!(data.session.is_none());
    assert_eq!(data.user.unwrap().display_name(), Some("Ada"));
    assert_eq!(*mock.redirects.lock().unwrap(), vec!["https://app.test".to_owned()]);
}

#[tokio::test]
async fn sign_out_revokes_and_clears_persisted_session() {
    let (mock, config) = spawn_mock().await;
    let store = Arc::new(MemoryStore::new());
    let backend = GoTrueBackend::new(&config).unwrap().with_store(store.clone());

    backend.sign_in_with_password("a@test", "secret").await.unwrap();
    assert!(store.get(SESSION_STORAGE_KEY).unwrap().is_some());

    let mut sub = backend.subscribe();
    let initial = sub.recv().await.unwrap();
    assert_eq!(initial.event, AuthEvent::InitialSession);
    assert_eq!(initial.session.unwrap().access_token, "at-1");

    backend.sign_out().await.unwrap();

    assert_eq!(sub.recv().await.unwrap().event, AuthEvent::SignedOut);
    assert_eq!(*mock.logouts.lock().unwrap(), vec!["Bearer at-1".to_owned()]);
    assert_eq!(store.get(SESSION_STORAGE_KEY).unwrap(), None);
    assert!(backend.cached_session().is_none());
}

#[tokio::test]
async fn persisted_session_is_restored() {
    let (_, config) = spawn_mock().await;
    let store = Arc::new(MemoryStore::new());
    store
        .set(SESSION_STORAGE_KEY, &session_json("at-saved", now_unix() + 3600).to_string())
        .unwrap();

    let backend = GoTrueBackend::new(&config).unwrap().with_store(store);
    assert_eq!(backend.get_session().await.unwrap().unwrap().access_token, "at-saved");

    let mut sub = backend.subscribe();
    let initial = sub.recv().await.unwrap();
    assert_eq!(initial.event, AuthEvent::InitialSession);
    assert_eq!(initial.session.unwrap().access_token, "at-saved");
}

#[tokio::test]
async fn expired_session_is_refreshed() {
    let (_, config) = spawn_mock().await;
    let store = Arc::new(MemoryStore::new());
    store
        .set(SESSION_STORAGE_KEY, &session_json("expired", now_unix() - 10).to_string())
        .unwrap();

    let backend = GoTrueBackend::new(&config).unwrap().with_store(store);
    let mut sub = backend.subscribe();

    assert_eq!(sub.recv().await.unwrap(), AuthChange::new(AuthEvent::InitialSession, None));

    let session = backend.get_session().await.unwrap().unwrap();
    assert_eq!(session.access_token, "at-2");
    assert_eq!(sub.recv().await.unwrap().event, AuthEvent::TokenRefreshed);
}

#[tokio::test]
async fn sign_in_with_unbounded_lifetime_succeeds() {
    let app = Router::new().route(
        "/auth/v1/token",
        post(|| async {
            Json(json!({
                "access_token": "at-forever",
                "expires_in": u64::MAX / 2,
                "user": { "id": "u1" }
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let config = AuthConfig {
        url: format!("http://{addr}"),
        anon_key: "anon".into(),
        timeouts: AuthTimeouts { request_secs: 5, connect_secs: 5 },
    };
    let backend = GoTrueBackend::new(&config).unwrap();

    backend.sign_in_with_password("a@test", "secret").await.unwrap();
    let session = backend.get_session().await.unwrap().unwrap();
    assert_eq!(session.access_token, "at-forever");
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let config = AuthConfig {
        url: "http://127.0.0.1:1".into(),
        anon_key: "anon".into(),
        timeouts: AuthTimeouts { request_secs: 2, connect_secs: 2 },
    };
    let backend = GoTrueBackend::new(&config).unwrap();
    let err = backend.sign_in_with_password("a@test", "secret").await.unwrap_err();
    assert!(matches!(err, AuthError::Transport(_)));
}
