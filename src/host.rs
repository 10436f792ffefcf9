//! Host environment primitives consumed by the shell.
//!
//! SYSTEM CONTEXT
//! ==============
//! Fault records need the current URL and user agent; recovery actions need to
//! reload or navigate. Browsers provide these through `window` (see the `web`
//! feature). [`HeadlessHost`] stands in everywhere else and records what was
//! asked of it.

use std::sync::{Mutex, PoisonError};

use reqwest::Url;

/// Application root that "go home" navigates to.
pub const HOME_HREF: &str = "/";

#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    /// The host has no such capability (no window, no DOM root, ...).
    #[error("host capability unavailable: {0}")]
    Unavailable(String),

    /// The host refused or failed the request.
    #[error("host call failed: {0}")]
    Failed(String),
}

pub trait HostEnvironment: Send + Sync {
    /// Full URL of the current location, when the host has one.
    fn location_href(&self) -> Option<String>;

    /// Client user-agent string, when the host has one.
    fn user_agent(&self) -> Option<String>;

    /// Full environment reload.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot reload.
    fn reload(&self) -> Result<(), HostError>;

    /// Same-process navigation to `href`.
    ///
    /// # Errors
    ///
    /// Returns an error if navigation is refused.
    fn navigate(&self, href: &str) -> Result<(), HostError>;
}

/// A host action observed by [`HeadlessHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Reload,
    Navigate(String),
}

/// Host without a window. Tracks a location string and records every reload
/// and navigation so embedders (and tests) can act on them.
#[derive(Debug)]
pub struct HeadlessHost {
    location: Mutex<String>,
    user_agent: String,
    calls: Mutex<Vec<HostCall>>,
}

impl HeadlessHost {
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(location.into()),
            user_agent: format!("appshell/{}", env!("CARGO_PKG_VERSION")),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Every reload/navigation requested so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

impl HostEnvironment for HeadlessHost {
    fn location_href(&self) -> Option<String> {
        Some(self.location.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn user_agent(&self) -> Option<String> {
        Some(self.user_agent.clone())
    }

    fn reload(&self) -> Result<(), HostError> {
        tracing::debug!("headless reload requested");
        self.record(HostCall::Reload);
        Ok(())
    }

    fn navigate(&self, href: &str) -> Result<(), HostError> {
        tracing::debug!(%href, "headless navigation requested");
        let mut location = self.location.lock().unwrap_or_else(PoisonError::into_inner);
        *location = resolve_href(&location, href)?;
        drop(location);
        self.record(HostCall::Navigate(href.to_owned()));
        Ok(())
    }
}

/// Resolve `href` against `current` the way a browser follows a link:
/// absolute URLs replace it, anything else is joined onto it.
pub(crate) fn resolve_href(current: &str, href: &str) -> Result<String, HostError> {
    Url::parse(current)
        .and_then(|base| base.join(href))
        .or_else(|_| Url::parse(href))
        .map(String::from)
        .map_err(|e| HostError::Failed(format!("cannot resolve {href:?} against {current:?}: {e}")))
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "host_test.rs"]
mod tests;
