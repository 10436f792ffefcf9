//! Built-in recovery view shown in place of a faulted subtree.

use std::fmt;

pub const RECOVERY_TITLE: &str = "Something went wrong";
pub const RECOVERY_MESSAGE: &str =
    "We're sorry, but something unexpected happened. The error has been logged and we'll look into it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    Reload,
    GoHome,
    ClearLog,
}

impl RecoveryAction {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Reload => "Reload Page",
            Self::GoHome => "Go Home",
            Self::ClearLog => "Clear Error Log",
        }
    }
}

/// Raw fault details, only populated in development builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultDetails {
    /// `Error: <message>` as displayed to developers.
    pub message: String,
    pub stack: Option<String>,
    pub component_trace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryView {
    pub title: &'static str,
    pub message: &'static str,
    pub error_id: Option<String>,
    pub details: Option<FaultDetails>,
    pub actions: Vec<RecoveryAction>,
}

impl RecoveryView {
    #[must_use]
    pub fn has_action(&self, action: RecoveryAction) -> bool {
        self.actions.contains(&action)
    }
}

impl fmt::Display for RecoveryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", self.message)?;
        if let Some(id) = &self.error_id {
            writeln!(f, "Error ID: {id}")?;
        }
        if let Some(details) = &self.details {
            writeln!(f, "Error Details (Development Only)")?;
            writeln!(f, "{}", details.message)?;
            for block in [&details.stack, &details.component_trace].into_iter().flatten() {
                writeln!(f, "{block}")?;
            }
        }
        let labels: Vec<&str> = self.actions.iter().map(|a| a.label()).collect();
        write!(f, "[{}]", labels.join("] ["))
    }
}
