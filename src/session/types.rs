//! Session data model and auth errors.

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors returned by auth operations. Never thrown past the session wrapper.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The backend rejected the request (bad credentials, rate limit, ...).
    #[error("auth api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("auth request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("auth response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The backend call faulted instead of returning.
    #[error("unexpected auth fault: {0}")]
    Unexpected(String),
}

// =============================================================================
// SESSION
// =============================================================================

/// The authenticated principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub app_metadata: serde_json::Map<String, serde_json::Value>,
}

impl User {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            user_metadata: serde_json::Map::new(),
            app_metadata: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// `full_name` from the profile metadata supplied at registration.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.user_metadata.get("full_name").and_then(serde_json::Value::as_str)
    }
}

/// Backend-issued session, in the backend's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

impl Session {
    #[must_use]
    pub fn new(access_token: impl Into<String>, user: User) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            expires_in: None,
            expires_at: None,
            refresh_token: None,
            user,
        }
    }

    /// Whether the session is past `expires_at` at `now` (unix seconds).
    /// Sessions without an expiry never expire locally.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// =============================================================================
// VIEW STATE
// =============================================================================

/// Locally mirrored auth state.
///
/// `user` is always derived from `session` in the same write; `loading` is
/// true only until the first resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthViewState {
    pub session: Option<Session>,
    pub user: Option<User>,
    pub loading: bool,
}

impl Default for AuthViewState {
    fn default() -> Self {
        Self { session: None, user: None, loading: true }
    }
}

impl AuthViewState {
    /// Replace session and user together and mark the state resolved.
    pub(crate) fn apply_session(&mut self, session: Option<Session>) {
        self.user = session.as_ref().map(|s| s.user.clone());
        self.session = session;
        self.loading = false;
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

// =============================================================================
// EVENTS & PAYLOADS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A session-change notification from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl AuthChange {
    #[must_use]
    pub fn new(event: AuthEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }
}

/// Payload of register/login.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthData {
    pub user: Option<User>,
    pub session: Option<Session>,
}

impl AuthData {
    #[must_use]
    pub fn from_session(session: Session) -> Self {
        Self { user: Some(session.user.clone()), session: Some(session) }
    }
}

/// Arguments of a sign-up call.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    /// Where the confirmation link sends the user back to.
    pub redirect_to: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
