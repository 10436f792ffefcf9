//! Fault boundary: contain render-time faults of a wrapped subtree.
//!
//! ARCHITECTURE
//! ============
//! A boundary is a two-state machine, `Clear` and `Faulted`. The host UI runtime
//! renders the wrapped subtree through [`FaultBoundary::render`] (which runs it
//! under `catch_unwind`), or reports a fault it intercepted itself through
//! [`FaultBoundary::capture`]. Either way the boundary:
//!
//! 1. assigns a fresh fault id and flips to `Faulted` before anything else, so
//!    the fallback renders even if the next step breaks;
//! 2. builds a [`FaultRecord`], logs it, and appends it to the shared
//!    [`FaultLog`].
//!
//! A faulted boundary never re-runs its subtree; only a fresh boundary (a full
//! remount) returns to `Clear`.
//!
//! ERROR HANDLING
//! ==============
//! Step 2 runs under `catch_unwind` and swallows storage failures. Recovery
//! actions log host failures instead of propagating them.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::BuildMode;
use crate::host::{HOME_HREF, HostEnvironment};

use super::log::FaultLog;
use super::record::{Fault, FaultRecord, new_fault_id, panic_message};
use super::view::{FaultDetails, RECOVERY_MESSAGE, RECOVERY_TITLE, RecoveryAction, RecoveryView};

// =============================================================================
// COMPONENT TRACE
// =============================================================================

/// Records which components are being rendered so a fault can report the
/// component trace it happened in.
#[derive(Debug, Default)]
pub struct RenderScope {
    frames: RefCell<Vec<String>>,
    frozen: RefCell<Option<String>>,
}

impl RenderScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `component` as rendering until the returned guard drops.
    #[must_use = "the component is popped when the guard drops"]
    pub fn enter(&self, component: impl Into<String>) -> ComponentGuard<'_> {
        self.frames.borrow_mut().push(component.into());
        ComponentGuard { scope: self }
    }

    /// Trace at the moment of the last fault, or the live trace if none.
    #[must_use]
    pub fn trace(&self) -> Option<String> {
        self.frozen.borrow().clone().or_else(|| format_trace(&self.frames.borrow()))
    }

    fn freeze(&self) {
        let mut frozen = self.frozen.borrow_mut();
        if frozen.is_none() {
            *frozen = format_trace(&self.frames.borrow());
        }
    }
}

/// Innermost component first, one `in <name>` line per frame.
fn format_trace(frames: &[String]) -> Option<String> {
    if frames.is_empty() {
        return None;
    }
    let lines: Vec<String> = frames.iter().rev().map(|name| format!("    in {name}")).collect();
    Some(lines.join("\n"))
}

pub struct ComponentGuard<'a> {
    scope: &'a RenderScope,
}

impl Drop for ComponentGuard<'_> {
    fn drop(&mut self) {
        // Unwinding pops frames innermost-first; keep the full trace.
        if std::thread::panicking() {
            self.scope.freeze();
        }
        self.scope.frames.borrow_mut().pop();
    }
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFault {
    pub error_id: String,
    pub fault: Fault,
    pub component_trace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BoundaryState {
    #[default]
    Clear,
    Faulted(CapturedFault),
}

/// Output of [`FaultBoundary::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<V> {
    /// No fault: the wrapped subtree, unmodified.
    Subtree(V),
    /// Faulted with a caller-supplied fallback.
    Fallback(V),
    /// Faulted without a fallback: the built-in recovery view.
    Recovery(RecoveryView),
}

// =============================================================================
// BOUNDARY
// =============================================================================

pub struct FaultBoundary<V> {
    log: Arc<FaultLog>,
    host: Arc<dyn HostEnvironment>,
    build_mode: BuildMode,
    fallback: Option<V>,
    state: BoundaryState,
}

impl<V: Clone> FaultBoundary<V> {
    #[must_use]
    pub fn new(log: Arc<FaultLog>, host: Arc<dyn HostEnvironment>, build_mode: BuildMode) -> Self {
        Self { log, host, build_mode, fallback: None, state: BoundaryState::Clear }
    }

    /// Render `fallback` verbatim instead of the recovery view once faulted.
    #[must_use]
    pub fn with_fallback(mut self, fallback: V) -> Self {
        self.fallback = Some(fallback);
        self
    }

    #[must_use]
    pub fn state(&self) -> &BoundaryState {
        &self.state
    }

    #[must_use]
    pub fn is_faulted(&self) -> bool {
        matches!(self.state, BoundaryState::Faulted(_))
    }

    #[must_use]
    pub fn error_id(&self) -> Option<&str> {
        match &self.state {
            BoundaryState::Faulted(captured) => Some(&captured.error_id),
            BoundaryState::Clear => None,
        }
    }

    /// Render the wrapped subtree, or the fallback once a fault was captured.
    pub fn render<F>(&mut self, subtree: F) -> Rendered<V>
    where
        F: FnOnce(&RenderScope) -> V,
    {
        if self.is_faulted() {
            return self.faulted_view();
        }

        let scope = RenderScope::new();
        match panic::catch_unwind(AssertUnwindSafe(|| subtree(&scope))) {
            Ok(view) => Rendered::Subtree(view),
            Err(payload) => {
                self.capture(Fault::from_panic(&*payload), scope.trace());
                self.faulted_view()
            }
        }
    }

    /// Interception point for a fault raised while rendering the subtree.
    ///
    /// Returns the id assigned to this fault.
    pub fn capture(&mut self, fault: Fault, component_trace: Option<String>) -> String {
        let error_id = new_fault_id();
        self.state = BoundaryState::Faulted(CapturedFault { error_id: error_id.clone(), fault, component_trace });

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.record())) {
            warn!(%error_id, panic = %panic_message(&*payload), "fault capture step failed");
        }
        error_id
    }

    fn record(&self) {
        let BoundaryState::Faulted(captured) = &self.state else {
            return;
        };
        let record = FaultRecord::capture(
            &captured.error_id,
            &captured.fault,
            captured.component_trace.as_deref(),
            self.host.user_agent(),
            self.host.location_href(),
        );

        error!(
            error_id = %record.error_id,
            message = %record.message,
            stack = ?record.stack,
            component_stack = ?record.component_stack,
            timestamp = %record.timestamp,
            user_agent = %record.user_agent,
            url = %record.url,
            "fault boundary caught an error"
        );

        let error_id = record.error_id.clone();
        match self.log.append(record) {
            Ok(retained) => debug!(%error_id, retained, "fault record stored"),
            Err(e) => warn!(%error_id, error = %e, "failed to store fault record"),
        }
    }

    fn faulted_view(&self) -> Rendered<V> {
        if let Some(fallback) = &self.fallback {
            return Rendered::Fallback(fallback.clone());
        }
        Rendered::Recovery(self.recovery_view().unwrap_or_else(|| generic_view(None)))
    }

    /// The built-in recovery view for the captured fault, `None` while clear.
    #[must_use]
    pub fn recovery_view(&self) -> Option<RecoveryView> {
        let BoundaryState::Faulted(captured) = &self.state else {
            return None;
        };
        let mut view = generic_view(Some(captured.error_id.clone()));
        if self.build_mode.is_development() {
            view.details = Some(FaultDetails {
                message: captured.fault.to_string(),
                stack: captured.fault.stack.clone(),
                component_trace: captured.component_trace.clone(),
            });
            view.actions.push(RecoveryAction::ClearLog);
        }
        Some(view)
    }

    /// Dispatch a recovery action chosen in the recovery view.
    pub fn perform(&self, action: RecoveryAction) {
        match action {
            RecoveryAction::Reload => self.reload(),
            RecoveryAction::GoHome => self.go_home(),
            RecoveryAction::ClearLog => self.clear_log(),
        }
    }

    /// Full reload; navigates to the application root if the reload fails.
    pub fn reload(&self) {
        if let Err(e) = self.host.reload() {
            error!(error = %e, "failed to reload page");
            if let Err(e) = self.host.navigate(HOME_HREF) {
                error!(error = %e, "fallback navigation home failed");
            }
        }
    }

    pub fn go_home(&self) {
        if let Err(e) = self.host.navigate(HOME_HREF) {
            error!(error = %e, "failed to navigate home");
        }
    }

    /// Drop the persisted fault history.
    pub fn clear_log(&self) {
        match self.log.clear() {
            Ok(()) => debug!(key = self.log.key(), "fault log cleared"),
            Err(e) => warn!(error = %e, "failed to clear fault log"),
        }
    }
}

fn generic_view(error_id: Option<String>) -> RecoveryView {
    RecoveryView {
        title: RECOVERY_TITLE,
        message: RECOVERY_MESSAGE,
        error_id,
        details: None,
        actions: vec![RecoveryAction::Reload, RecoveryAction::GoHome],
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "boundary_test.rs"]
mod tests;
