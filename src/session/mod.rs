//! Authentication session state mirrored from a hosted auth backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route guards and user-aware views read [`AuthViewState`] from a mounted
//! [`SessionSync`]; login/registration forms call its operations and display
//! the returned [`AuthError`]s. [`GoTrueBackend`] talks to the hosted service;
//! anything implementing [`AuthBackend`] can stand in for it.

mod backend;
mod gotrue;
mod sync;
mod types;

pub use backend::{AuthBackend, AuthEventHub, Subscription, SubscriptionHandle};
pub use gotrue::{GoTrueBackend, SESSION_STORAGE_KEY};
pub use sync::{MountToken, SessionSync, SessionSyncOptions};
pub use types::{AuthChange, AuthData, AuthError, AuthEvent, AuthViewState, Session, SignUpRequest, User};
