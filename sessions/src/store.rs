//! Key/value storage abstraction.
//!
//! SYSTEM CONTEXT
//! ==============
//! Browser `localStorage`/`sessionStorage` are the only shared state between
//! tabs. The coordinator talks to them through [`KeyValueStore`] so the same
//! logic runs against the browser Storage API and against
//! [`MemoryStore`] in tests.
//!
//! TRADE-OFFS
//! ==========
//! The trait offers plain get/set/remove with no compare-and-swap, matching
//! what the browser actually provides. Races between tabs are resolved by
//! heartbeat staleness in `lease`, not by the store.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Error returned by [`KeyValueStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing storage could not be obtained (private mode, sandboxed iframe).
    #[error("storage unavailable")]
    Unavailable,
    /// A single operation failed (quota exceeded, security error).
    #[error("storage operation on `{key}` failed: {message}")]
    Operation { key: String, message: String },
}

/// Minimal string key/value store with browser `Storage` semantics.
pub trait KeyValueStore {
    /// Read `key`, returning `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Write `value` under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// A mutation observed on a shared store, shaped like a DOM `StorageEvent`.
///
/// `key == None` means the whole store was cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageChange {
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl StorageChange {
    #[must_use]
    pub fn new(key: &str, old_value: Option<String>, new_value: Option<String>) -> Self {
        Self { key: Some(key.to_owned()), old_value, new_value }
    }

    /// Change notification for a full `clear()` of the store.
    #[must_use]
    pub fn cleared() -> Self {
        Self { key: None, old_value: None, new_value: None }
    }

    #[must_use]
    pub fn is_for(&self, key: &str) -> bool {
        self.key.as_deref() == Some(key)
    }
}

#[derive(Default)]
struct MemoryInner {
    entries: BTreeMap<String, String>,
    journal: Vec<StorageChange>,
    unavailable: bool,
}

/// In-memory [`KeyValueStore`]. Clones share the same contents, so several
/// coordinators built from clones behave like tabs over one `localStorage`.
///
/// Every mutation that changes a value is journaled as a [`StorageChange`];
/// drain it with [`MemoryStore::take_changes`] to replay the notifications a
/// browser would deliver to the other tabs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the mutation journal.
    #[must_use]
    pub fn take_changes(&self) -> Vec<StorageChange> {
        std::mem::take(&mut self.inner.borrow_mut().journal)
    }

    /// Simulate storage becoming unavailable; every operation fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.borrow_mut().unavailable = unavailable;
    }

    /// Remove every entry, journaling a single "cleared" change.
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.entries.clear();
        inner.journal.push(StorageChange::cleared());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let inner = self.inner.borrow();
        if inner.unavailable {
            return Err(StoreError::Unavailable);
        }
        Ok(inner.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        if inner.unavailable {
            return Err(StoreError::Unavailable);
        }
        let old = inner.entries.insert(key.to_owned(), value.to_owned());
        if old.as_deref() != Some(value) {
            inner
                .journal
                .push(StorageChange::new(key, old, Some(value.to_owned())));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        if inner.unavailable {
            return Err(StoreError::Unavailable);
        }
        if let Some(old) = inner.entries.remove(key) {
            inner.journal.push(StorageChange::new(key, Some(old), None));
        }
        Ok(())
    }
}
