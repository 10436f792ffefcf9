//! Render-time fault containment and the persisted fault history.
//!
//! SYSTEM CONTEXT
//! ==============
//! Wrapping a subtree in a [`FaultBoundary`] keeps one faulting component from
//! blanking the whole UI. Every captured fault becomes a [`FaultRecord`] in the
//! bounded [`FaultLog`], keyed by an id the recovery view shows to the user so
//! support reports can be matched to stored records.

mod boundary;
mod log;
mod record;
mod view;

pub use boundary::{BoundaryState, CapturedFault, ComponentGuard, FaultBoundary, RenderScope, Rendered};
pub use log::{FaultLog, FaultLogError};
pub use record::{Fault, FaultRecord, new_fault_id, panic_message};
pub use view::{FaultDetails, RECOVERY_MESSAGE, RECOVERY_TITLE, RecoveryAction, RecoveryView};
