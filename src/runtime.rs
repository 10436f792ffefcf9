//! Task spawning across targets.
//!
//! Native builds run on the ambient tokio runtime. Browser builds have no
//! tokio executor, so tasks go to the page's microtask queue through
//! `wasm-bindgen-futures`.

use std::future::Future;

/// Run `task` in the background.
///
/// # Panics
///
/// On native targets, panics if called outside a tokio runtime.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn spawn_task<F>(task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(task);
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn spawn_task<F>(task: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(task);
}

#[cfg(all(test, not(target_arch = "wasm32")))]
#[path = "runtime_test.rs"]
mod tests;
