//! Shell configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Mirrors the server-side pattern: typed config structs with documented
//! defaults, an `env_parse` helper for numeric knobs, and a `ConfigError` for
//! values that are present but unusable. `ShellConfig::load` additionally pulls
//! a `.env` file into the process environment before reading.

use std::path::PathBuf;

pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:8080";
pub const DEFAULT_FAULT_LOG_KEY: &str = "app-errors";
pub const DEFAULT_FAULT_LOG_CAPACITY: usize = 10;
pub const DEFAULT_STORAGE_DIR: &str = ".appshell";
pub const DEFAULT_AUTH_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_AUTH_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing config: env var {var} not set")]
    Missing { var: String },

    /// A variable is set but cannot be parsed.
    #[error("config parse failed: {0}")]
    Parse(String),
}

/// Development builds expose raw fault details in the recovery view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    Development,
    #[default]
    Production,
}

impl BuildMode {
    #[must_use]
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub build_mode: BuildMode,
    /// Origin that post-registration confirmation links redirect to.
    pub app_origin: String,
    pub fault_log_key: String,
    pub fault_log_capacity: usize,
    pub storage_dir: PathBuf,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            build_mode: BuildMode::Production,
            app_origin: DEFAULT_APP_ORIGIN.to_owned(),
            fault_log_key: DEFAULT_FAULT_LOG_KEY.to_owned(),
            fault_log_capacity: DEFAULT_FAULT_LOG_CAPACITY,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
        }
    }
}

impl ShellConfig {
    /// Load `.env` (if present) into the environment, then [`Self::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_env()
    }

    /// Build typed shell config from environment variables.
    ///
    /// Optional:
    /// - `APP_ENV`: `production` (default) or `development`
    /// - `APP_ORIGIN`: default `http://localhost:8080`
    /// - `FAULT_LOG_KEY`: default `app-errors`
    /// - `FAULT_LOG_CAPACITY`: default 10, must be at least 1
    /// - `APPSHELL_STORAGE_DIR`: default `.appshell`
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown `APP_ENV` or a zero capacity.
    pub fn from_env() -> Result<Self, ConfigError> {
        let build_mode = parse_build_mode(std::env::var("APP_ENV").ok().as_deref())?;
        let app_origin = std::env::var("APP_ORIGIN")
            .unwrap_or_else(|_| DEFAULT_APP_ORIGIN.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let fault_log_key = std::env::var("FAULT_LOG_KEY").unwrap_or_else(|_| DEFAULT_FAULT_LOG_KEY.to_owned());
        let fault_log_capacity = env_parse("FAULT_LOG_CAPACITY", DEFAULT_FAULT_LOG_CAPACITY);
        if fault_log_capacity == 0 {
            return Err(ConfigError::Parse("FAULT_LOG_CAPACITY must be at least 1".into()));
        }
        let storage_dir = std::env::var("APPSHELL_STORAGE_DIR").map_or_else(|_| PathBuf::from(DEFAULT_STORAGE_DIR), PathBuf::from);

        Ok(Self { build_mode, app_origin, fault_log_key, fault_log_capacity, storage_dir })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Connection settings for the hosted auth backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub url: String,
    pub anon_key: String,
    pub timeouts: AuthTimeouts,
}

impl AuthConfig {
    /// Build auth config from environment variables.
    ///
    /// Required: `AUTH_URL`, `AUTH_ANON_KEY`.
    ///
    /// Optional:
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: default 30
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("AUTH_URL")
            .map_err(|_| ConfigError::Missing { var: "AUTH_URL".into() })?
            .trim_end_matches('/')
            .to_owned();
        let anon_key = std::env::var("AUTH_ANON_KEY").map_err(|_| ConfigError::Missing { var: "AUTH_ANON_KEY".into() })?;
        let timeouts = AuthTimeouts {
            request_secs: env_parse("AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_AUTH_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_AUTH_CONNECT_TIMEOUT_SECS),
        };
        Ok(Self { url, anon_key, timeouts })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_build_mode(raw: Option<&str>) -> Result<BuildMode, ConfigError> {
    match raw.unwrap_or("production") {
        "production" | "prod" => Ok(BuildMode::Production),
        "development" | "dev" => Ok(BuildMode::Development),
        other => Err(ConfigError::Parse(format!("unknown APP_ENV: {other}"))),
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "config_test.rs"]
mod tests;
