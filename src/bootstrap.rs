//! Mount the application into its root handle.
//!
//! A missing root is logged and left alone. A mount that fails or panics is
//! replaced by static fallback markup so the user never faces a blank page.

use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, info};

use crate::fault::panic_message;
use crate::host::HostError;

/// Element id of the application root in the host page.
pub const ROOT_ELEMENT_ID: &str = "root";

/// Markup written into the root when the initial mount fails.
pub const FALLBACK_MARKUP: &str = r#"<div style="padding: 20px; text-align: center; font-family: system-ui;">
  <h1>Application Error</h1>
  <p>Unable to load the application. Please refresh the page.</p>
  <button onclick="window.location.reload()" style="padding: 10px 20px; margin-top: 10px;">Refresh Page</button>
</div>"#;

/// Container the application renders into.
pub trait RenderRoot {
    /// Replace the container's content with `markup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses the write.
    fn set_markup(&mut self, markup: &str) -> Result<(), HostError>;
}

/// In-memory root for headless hosts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferRoot {
    pub markup: String,
}

impl RenderRoot for BufferRoot {
    fn set_markup(&mut self, markup: &str) -> Result<(), HostError> {
        markup.clone_into(&mut self.markup);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    Mounted,
    /// The mount failed and the fallback markup was written instead.
    Fallback,
    RootMissing,
}

/// Run `app` against `root`, falling back to [`FALLBACK_MARKUP`] on failure.
pub fn mount_root<R, E, F>(root: Option<&mut R>, app: F) -> MountOutcome
where
    R: RenderRoot + ?Sized,
    E: Display,
    F: FnOnce(&mut R) -> Result<(), E>,
{
    let Some(root) = root else {
        error!(root_id = ROOT_ELEMENT_ID, "root element not found");
        return MountOutcome::RootMissing;
    };

    let failure = match panic::catch_unwind(AssertUnwindSafe(|| app(&mut *root))) {
        Ok(Ok(())) => {
            info!("application mounted");
            return MountOutcome::Mounted;
        }
        Ok(Err(e)) => e.to_string(),
        Err(payload) => panic_message(&*payload),
    };

    error!(error = %failure, "failed to render application");
    if let Err(e) = root.set_markup(FALLBACK_MARKUP) {
        error!(error = %e, "failed to write fallback markup");
    }
    MountOutcome::Fallback
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "bootstrap_test.rs"]
mod tests;
