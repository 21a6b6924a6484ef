//! `KeyValueStore` over the browser Storage API.
//!
//! SYSTEM CONTEXT
//! ==============
//! The coordinator and the auth helpers are written against
//! `sessions::KeyValueStore`. This adapter binds them to `localStorage`
//! (shared between tabs) and `sessionStorage` (private to one tab).
//!
//! TRADE-OFFS
//! ==========
//! Outside the browser there is no storage at all: every operation reports
//! `StoreError::Unavailable`, which the callers already treat as "absent".

#[cfg(all(test, not(feature = "hydrate")))]
#[path = "storage_test.rs"]
mod storage_test;

use sessions::{KeyValueStore, StoreError};

#[cfg(feature = "hydrate")]
use sessions::StorageChange;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageArea {
    /// `window.localStorage`, shared by every tab of the origin.
    Local,
    /// `window.sessionStorage`, scoped to the current tab.
    Session,
}

#[derive(Clone)]
pub struct BrowserStore {
    area: StorageArea,
    #[cfg(feature = "hydrate")]
    storage: Option<web_sys::Storage>,
}

impl BrowserStore {
    pub fn local() -> Self {
        Self::open(StorageArea::Local)
    }

    pub fn session() -> Self {
        Self::open(StorageArea::Session)
    }

    /// Bind to `area`. A blocked or missing storage yields an unavailable store.
    pub fn open(area: StorageArea) -> Self {
        #[cfg(feature = "hydrate")]
        {
            let storage = web_sys::window().and_then(|w| {
                let found = match area {
                    StorageArea::Local => w.local_storage(),
                    StorageArea::Session => w.session_storage(),
                };
                found.ok().flatten()
            });
            if storage.is_none() {
                log::warn!("{area:?} storage unavailable");
            }
            Self { area, storage }
        }
        #[cfg(not(feature = "hydrate"))]
        {
            Self { area }
        }
    }

    pub fn area(&self) -> StorageArea {
        self.area
    }

    /// Convert a DOM `storage` event raised against this store.
    ///
    /// Events for other storage areas yield `None`.
    #[cfg(feature = "hydrate")]
    pub fn change_from_event(&self, event: &web_sys::StorageEvent) -> Option<StorageChange> {
        let storage = self.storage.as_ref()?;
        if event.storage_area().as_ref() != Some(storage) {
            return None;
        }
        Some(match event.key() {
            Some(key) => StorageChange::new(&key, event.old_value(), event.new_value()),
            None => StorageChange::cleared(),
        })
    }

    #[cfg(feature = "hydrate")]
    fn storage(&self) -> Result<&web_sys::Storage, StoreError> {
        self.storage.as_ref().ok_or(StoreError::Unavailable)
    }
}

#[cfg(feature = "hydrate")]
fn js_failure(key: &str, err: &wasm_bindgen::JsValue) -> StoreError {
    StoreError::Operation { key: key.to_owned(), message: format!("{err:?}") }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        #[cfg(feature = "hydrate")]
        {
            self.storage()?.get_item(key).map_err(|e| js_failure(key, &e))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = key;
            Err(StoreError::Unavailable)
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        #[cfg(feature = "hydrate")]
        {
            self.storage()?.set_item(key, value).map_err(|e| js_failure(key, &e))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (key, value);
            Err(StoreError::Unavailable)
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        #[cfg(feature = "hydrate")]
        {
            self.storage()?.remove_item(key).map_err(|e| js_failure(key, &e))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = key;
            Err(StoreError::Unavailable)
        }
    }
}
