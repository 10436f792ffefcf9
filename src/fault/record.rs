//! Fault values and the persisted diagnostic record.

use std::any::Any;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const ID_SUFFIX_LEN: usize = 9;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const UNKNOWN: &str = "unknown";

/// A render-time fault intercepted by a boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub message: String,
    pub stack: Option<String>,
}

impl Fault {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), stack: None }
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Build a fault from a `catch_unwind` payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::new(panic_message(payload))
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.message)
    }
}

/// Extract the message carried by a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// One entry of the persisted fault log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultRecord {
    pub error_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_stack: Option<String>,
    /// RFC 3339 UTC timestamp of capture.
    pub timestamp: String,
    pub user_agent: String,
    pub url: String,
}

impl FaultRecord {
    /// Assemble a record stamped with the current time. Missing host details
    /// are recorded as `"unknown"`.
    #[must_use]
    pub fn capture(
        error_id: &str,
        fault: &Fault,
        component_stack: Option<&str>,
        user_agent: Option<String>,
        url: Option<String>,
    ) -> Self {
        Self {
            error_id: error_id.to_owned(),
            message: fault.message.clone(),
            stack: fault.stack.clone(),
            component_stack: component_stack.map(str::to_owned),
            timestamp: now_rfc3339(),
            user_agent: user_agent.unwrap_or_else(|| UNKNOWN.to_owned()),
            url: url.unwrap_or_else(|| UNKNOWN.to_owned()),
        }
    }
}

/// Fresh fault id: `error-<unix millis>-<9 base-36 chars>`.
///
/// Unique enough to correlate user reports with stored records; not a
/// cryptographic identifier.
#[must_use]
pub fn new_fault_id() -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("error-{millis}-{suffix}")
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| UNKNOWN.to_owned())
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "record_test.rs"]
mod tests;
