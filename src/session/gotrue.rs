//! GoTrue-compatible REST client implementing [`AuthBackend`].
//!
//! Thin HTTP wrapper over `/auth/v1/{signup,token,logout}`. The current session
//! is cached in memory and, when a store is attached, persisted under
//! [`SESSION_STORAGE_KEY`] so a reload starts signed in. Pure parsing lives in
//! `parse_auth_response` / `error_message` for testability.

use std::sync::{Arc, PoisonError, RwLock};
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use serde_json::{Value, json};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::storage::KeyValueStore;

use super::backend::{AuthBackend, AuthEventHub, Subscription};
use super::types::{AuthChange, AuthData, AuthError, AuthEvent, Session, SignUpRequest, User};

pub const SESSION_STORAGE_KEY: &str = "appshell-auth-token";

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoTrueBackend {
    http: reqwest::Client,
    url: String,
    anon_key: String,
    hub: AuthEventHub,
    session: RwLock<Option<Session>>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl GoTrueBackend {
    /// Build a client for the service at `config.url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let http = client_builder(config)
            .build()
            .map_err(|e| AuthError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            url: config.url.trim_end_matches('/').to_owned(),
            anon_key: config.anon_key.clone(),
            hub: AuthEventHub::new(),
            session: RwLock::new(None),
            store: None,
        })
    }

    /// Persist the session in `store`, restoring one saved by a previous run.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        match store.get(SESSION_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => {
                    debug!(user_id = %session.user.id, "restored persisted session");
                    *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
                }
                Err(e) => warn!(error = %e, "discarding unreadable persisted session"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to read persisted session"),
        }
        self.store = Some(store);
        self
    }

    /// Cached session without expiry handling.
    #[must_use]
    pub fn cached_session(&self) -> Option<Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.url)
    }

    fn set_session(&self, session: Option<Session>) {
        let session = session.map(stamp_expiry);
        if let Some(store) = &self.store {
            let persisted = match &session {
                Some(s) => serde_json::to_string(s)
                    .map_err(|e| e.to_string())
                    .and_then(|raw| store.set(SESSION_STORAGE_KEY, &raw).map_err(|e| e.to_string())),
                None => store.remove(SESSION_STORAGE_KEY).map_err(|e| e.to_string()),
            };
            if let Err(e) = persisted {
                warn!(error = %e, "failed to persist session");
            }
        }
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn publish(&self, event: AuthEvent) {
        let delivered = self.hub.emit(&AuthChange::new(event, self.cached_session()));
        debug!(?event, delivered, "auth change published");
    }

    async fn post(&self, path: &str, query: &[(&str, &str)], bearer: Option<&str>, body: &Value) -> Result<String, AuthError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .query(query)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(AuthError::Api { status, message: error_message(&text) });
        }
        Ok(text)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let text = self
            .post("token", &[("grant_type", "refresh_token")], None, &json!({ "refresh_token": refresh_token }))
            .await?;
        parse_auth_response(&text)?
            .session
            .ok_or_else(|| AuthError::Parse("refresh response carried no session".into()))
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
impl AuthBackend for GoTrueBackend {
    /// New subscribers first receive `InitialSession` with the cached session,
    /// or `None` when it has already expired and awaits a refresh.
    fn subscribe(&self) -> Subscription {
        let current = self.cached_session().filter(|s| !s.is_expired(now_unix()));
        self.hub.subscribe_with(AuthChange::new(AuthEvent::InitialSession, current))
    }

    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.cached_session() else {
            return Ok(None);
        };
        if !session.is_expired(now_unix()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            self.set_session(None);
            self.publish(AuthEvent::SignedOut);
            return Ok(None);
        };
        match self.refresh(&refresh_token).await {
            Ok(fresh) => {
                self.set_session(Some(fresh));
                self.publish(AuthEvent::TokenRefreshed);
                Ok(self.cached_session())
            }
            Err(e) => {
                self.set_session(None);
                self.publish(AuthEvent::SignedOut);
                Err(e)
            }
        }
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<AuthData, AuthError> {
        let body = json!({
            "email": request.email,
            "password": request.password,
            "data": request.metadata,
        });
        let text = self
            .post("signup", &[("redirect_to", request.redirect_to.as_str())], None, &body)
            .await?;
        let data = parse_auth_response(&text)?;
        if let Some(session) = &data.session {
            self.set_session(Some(session.clone()));
            self.publish(AuthEvent::SignedIn);
        }
        Ok(data)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthData, AuthError> {
        let body = json!({ "email": email, "password": password });
        let text = self.post("token", &[("grant_type", "password")], None, &body).await?;
        let data = parse_auth_response(&text)?;
        let session = data
            .session
            .clone()
            .ok_or_else(|| AuthError::Parse("sign-in response carried no session".into()))?;
        self.set_session(Some(session));
        self.publish(AuthEvent::SignedIn);
        Ok(data)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.cached_session() {
            match self.post("logout", &[], Some(&session.access_token), &json!({})).await {
                Ok(_) => {}
                // The server already forgot this session; finish locally.
                Err(AuthError::Api { status: 401 | 403 | 404, .. }) => {}
                Err(e) => return Err(e),
            }
        }
        self.set_session(None);
        self.publish(AuthEvent::SignedOut);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn client_builder(config: &AuthConfig) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeouts.request_secs))
        .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
}

/// The browser's fetch owns connection timeouts.
#[cfg(target_arch = "wasm32")]
fn client_builder(_config: &AuthConfig) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
}

// =============================================================================
// PARSING
// =============================================================================

/// Decode a signup/token response: either a full session or a bare user
/// (signup awaiting email confirmation).
pub(crate) fn parse_auth_response(text: &str) -> Result<AuthData, AuthError> {
    let value: Value = serde_json::from_str(text).map_err(|e| AuthError::Parse(e.to_string()))?;
    if value.get("access_token").is_some() {
        let session: Session = serde_json::from_value(value).map_err(|e| AuthError::Parse(e.to_string()))?;
        return Ok(AuthData::from_session(session));
    }
    let user_value = match value.get("user") {
        Some(user) => user.clone(),
        None if value.get("id").is_some() => value,
        None => return Err(AuthError::Parse(format!("unexpected auth response: {text}"))),
    };
    let user: User = serde_json::from_value(user_value).map_err(|e| AuthError::Parse(e.to_string()))?;
    Ok(AuthData { user: Some(user), session: None })
}

/// Human-readable message from an error body.
pub(crate) fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str))
        })
        .map_or_else(
            || {
                let trimmed = body.trim();
                if trimmed.is_empty() { "unknown error".to_owned() } else { trimmed.to_owned() }
            },
            str::to_owned,
        )
}

/// Fill `expires_at` from `expires_in` when the server sent only the latter.
fn stamp_expiry(mut session: Session) -> Session {
    if session.expires_at.is_none() {
        if let Some(secs) = session.expires_in.and_then(|s| i64::try_from(s).ok()) {
            session.expires_at = Some(now_unix().saturating_add(secs));
        }
    }
    session
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "gotrue_test.rs"]
mod tests;
