//! Browser implementations of the host collaborators.
//!
//! SYSTEM CONTEXT
//! ==============
//! Compiled with the `web` feature on `wasm32`. `LocalStorage` and `BrowserHost` look up
//! `window` on every call, so they hold no JS handles and satisfy the
//! `Send + Sync` bounds of the collaborator traits. `BrowserConnectivity` owns
//! its event-listener closures and removes them when dropped.

use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;

use crate::bootstrap::{self, MountOutcome, ROOT_ELEMENT_ID, RenderRoot};
use crate::connectivity::{ConnectivityEvent, ConnectivityMonitor};
use crate::host::{HostEnvironment, HostError};
use crate::storage::{KeyValueStore, StorageError};

fn js_error(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn window() -> Result<web_sys::Window, HostError> {
    web_sys::window().ok_or_else(|| HostError::Unavailable("no window".into()))
}

// =============================================================================
// STORAGE
// =============================================================================

/// `window.localStorage`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Result<web_sys::Storage, StorageError> {
        web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".into()))?
            .local_storage()
            .map_err(|e| StorageError::Unavailable(js_error(&e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".into()))
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StorageError::Backend(js_error(&e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Backend(js_error(&e)))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Backend(js_error(&e)))
    }
}

// =============================================================================
// HOST
// =============================================================================

/// `window.location` and `navigator`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserHost;

impl HostEnvironment for BrowserHost {
    fn location_href(&self) -> Option<String> {
        web_sys::window()?.location().href().ok()
    }

    fn user_agent(&self) -> Option<String> {
        web_sys::window()?.navigator().user_agent().ok()
    }

    fn reload(&self) -> Result<(), HostError> {
        window()?
            .location()
            .reload()
            .map_err(|e| HostError::Failed(js_error(&e)))
    }

    fn navigate(&self, href: &str) -> Result<(), HostError> {
        window()?
            .location()
            .set_href(href)
            .map_err(|e| HostError::Failed(js_error(&e)))
    }
}

// =============================================================================
// CONNECTIVITY
// =============================================================================

type Listener = Closure<dyn FnMut(web_sys::Event)>;

/// `online`/`offline` window listeners feeding a [`ConnectivityMonitor`].
pub struct BrowserConnectivity {
    window: web_sys::Window,
    on_online: Listener,
    on_offline: Listener,
}

impl BrowserConnectivity {
    /// Seed `monitor` from `navigator.onLine` and start listening.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no window or a listener cannot be added.
    pub fn install(monitor: &ConnectivityMonitor) -> Result<Self, HostError> {
        let window = window()?;
        monitor.set_online(window.navigator().on_line());

        let on_online = listener(monitor.clone(), ConnectivityEvent::Online);
        let on_offline = listener(monitor.clone(), ConnectivityEvent::Offline);
        window
            .add_event_listener_with_callback("online", on_online.as_ref().unchecked_ref())
            .map_err(|e| HostError::Failed(js_error(&e)))?;
        if let Err(e) = window.add_event_listener_with_callback("offline", on_offline.as_ref().unchecked_ref()) {
            let _ = window.remove_event_listener_with_callback("online", on_online.as_ref().unchecked_ref());
            return Err(HostError::Failed(js_error(&e)));
        }

        Ok(Self { window, on_online, on_offline })
    }
}

fn listener(monitor: ConnectivityMonitor, event: ConnectivityEvent) -> Listener {
    Closure::new(move |_: web_sys::Event| {
        monitor.handle(event);
    })
}

impl Drop for BrowserConnectivity {
    fn drop(&mut self) {
        let _ = self
            .window
            .remove_event_listener_with_callback("online", self.on_online.as_ref().unchecked_ref());
        let _ = self
            .window
            .remove_event_listener_with_callback("offline", self.on_offline.as_ref().unchecked_ref());
    }
}

// =============================================================================
// ROOT
// =============================================================================

/// The page's `#root` element.
pub struct DomRoot {
    element: web_sys::Element,
}

impl DomRoot {
    #[must_use]
    pub fn find() -> Option<Self> {
        let element = web_sys::window()?.document()?.get_element_by_id(ROOT_ELEMENT_ID)?;
        Some(Self { element })
    }

    #[must_use]
    pub fn element(&self) -> &web_sys::Element {
        &self.element
    }
}

impl RenderRoot for DomRoot {
    fn set_markup(&mut self, markup: &str) -> Result<(), HostError> {
        self.element.set_inner_html(markup);
        Ok(())
    }
}

/// Mount `app` into the page's root element.
pub fn mount<E, F>(app: F) -> MountOutcome
where
    E: std::fmt::Display,
    F: FnOnce(&mut DomRoot) -> Result<(), E>,
{
    let mut root = DomRoot::find();
    bootstrap::mount_root(root.as_mut(), app)
}
