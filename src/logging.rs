//! Log sink installation.
//!
//! Every component emits structured `tracing` events; this module only wires
//! a subscriber for binaries and demos that embed the shell.

/// Install the `fmt` subscriber as the global default.
///
/// Safe to call more than once: later calls are no-ops, so embedding code and
/// tests can both call it.
pub fn init() {
    if tracing_subscriber::fmt().try_init().is_ok() {
        tracing::debug!("tracing subscriber installed");
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "logging_test.rs"]
mod tests;
