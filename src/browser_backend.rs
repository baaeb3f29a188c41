//! `window.localStorage` backend and `storage`-event notifier for wasm builds.
//!
//! The browser fires the `storage` event only in the *other* tabs of an
//! origin, never in the tab that wrote. [`StorageEventNotifier::publish`]
//! therefore re-broadcasts to the current tab's subscribers by hand, and
//! relies on the platform for everyone else.

use std::sync::Arc;

use log::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{DomException, Storage, StorageEvent, Window};

use crate::change_notifier::{ChangeHandler, LocalNotifier, Notifier, Subscription};
use crate::kv_backend::KeyValueBackend;
use crate::store_error::StoreError;

fn local_storage() -> Result<Storage, StoreError> {
    web_sys::window()
        .and_then(|w| w.local_storage().ok().flatten())
        .ok_or_else(|| StoreError::StorageUnavailable("localStorage unavailable".to_string()))
}

fn is_quota_error(err: &wasm_bindgen::JsValue) -> bool {
    err.dyn_ref::<DomException>()
        .map(|e| e.name() == "QuotaExceededError")
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorageBackend;

// SAFETY: wasm32 without threads has a single thread of execution; the
// backend holds no JS handles between calls.
unsafe impl Send for LocalStorageBackend {}
unsafe impl Sync for LocalStorageBackend {}

impl KeyValueBackend for LocalStorageBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        local_storage()?
            .get_item(key)
            .map_err(|e| StoreError::Backend(format!("localStorage get_item failed: {e:?}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        local_storage()?.set_item(key, value).map_err(|e| {
            if is_quota_error(&e) {
                StoreError::QuotaExceeded {
                    key: key.to_string(),
                    bytes: value.len(),
                }
            } else {
                StoreError::Backend(format!("localStorage set_item failed: {e:?}"))
            }
        })
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let storage = local_storage()?;
        let existed = self.get(key)?.is_some();
        storage
            .remove_item(key)
            .map_err(|e| StoreError::Backend(format!("localStorage remove_item failed: {e:?}")))?;
        Ok(existed)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let storage = local_storage()?;
        let len = storage
            .length()
            .map_err(|e| StoreError::Backend(format!("localStorage length failed: {e:?}")))?;
        let mut keys = Vec::with_capacity(len as usize);
        for index in 0..len {
            if let Ok(Some(key)) = storage.key(index) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

struct RegisteredListener {
    window: Window,
    listener: Closure<dyn FnMut(StorageEvent)>,
    local: Subscription,
}

// SAFETY: see `LocalStorageBackend`; JS handles never leave the main thread.
unsafe impl Send for RegisteredListener {}

impl RegisteredListener {
    fn remove(self) {
        if let Err(e) = self
            .window
            .remove_event_listener_with_callback("storage", self.listener.as_ref().unchecked_ref())
        {
            warn!("Could not stop listening for storage events: {e:?}");
        }
        self.local.unsubscribe();
    }
}

/// Same-tab re-publish plus the native cross-tab `storage` event.
#[derive(Clone, Default)]
pub struct StorageEventNotifier {
    local: LocalNotifier,
}

impl StorageEventNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for StorageEventNotifier {
    fn subscribe(&self, key: &str, handler: ChangeHandler) -> Subscription {
        let window = match web_sys::window() {
            Some(window) => window,
            None => {
                warn!("No window; '{}' only receives same-tab changes", key);
                return self.local.subscribe(key, handler);
            }
        };

        let local = self.local.subscribe(key, Arc::clone(&handler));

        let watched = key.to_string();
        let listener = Closure::<dyn FnMut(StorageEvent)>::new(move |event: StorageEvent| {
            // A `None` key means the whole storage area was cleared.
            match event.key() {
                Some(changed) if changed != watched => {}
                _ => handler(),
            }
        });

        if let Err(e) = window
            .add_event_listener_with_callback("storage", listener.as_ref().unchecked_ref())
        {
            warn!("Could not listen for storage events on '{}': {e:?}", key);
            return local;
        }

        let registered = RegisteredListener {
            window,
            listener,
            local,
        };
        Subscription::new(move || registered.remove())
    }

    fn publish(&self, key: &str) {
        self.local.publish(key);
    }
}
