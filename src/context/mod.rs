//! Context Container
//!
//! A [`ContextDict`] is a key/value store with two phases. While Mutable it accepts writes
//! and (optionally) refuses reads; `freeze` runs the store through its [`Freezer`] and
//! publishes the result, after which every write is rejected and reads need no locking.
//!
//! A Mutable context is meant to have a single writer at a time. Writes from several
//! threads are serialized by an internal mutex but their relative order is unspecified.

mod types;

pub use types::ContextOptions;

use crate::error::ContextError;
use crate::freezer::Freezer;
use crate::hasher;
use crate::types::{Fingerprint, Key};
use crate::value::{Mapping, Value};
use parking_lot::{Mutex, MutexGuard};
use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Mapping whose read/write legality depends on its phase
pub struct ContextDict {
    /// Store while Mutable; emptied once the frozen store is published
    pending: Mutex<Mapping>,
    /// Frozen store; being set is the phase flag
    frozen: OnceLock<Mapping>,
    fingerprint: OnceLock<Fingerprint>,
    requires_frozen_for_read: bool,
    freezer: Freezer,
}

impl Default for ContextDict {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextDict {
    /// Empty Mutable context with default options
    pub fn new() -> Self {
        Self::with_options(Mapping::new(), ContextOptions::default())
    }

    /// Mutable context seeded with `entries` (repeated keys: last write wins)
    pub fn from_entries(entries: impl Into<Mapping>) -> Self {
        Self::with_options(entries, ContextOptions::default())
    }

    pub fn with_options(entries: impl Into<Mapping>, options: ContextOptions) -> Self {
        ContextDict {
            pending: Mutex::new(entries.into()),
            frozen: OnceLock::new(),
            fingerprint: OnceLock::new(),
            requires_frozen_for_read: options.requires_frozen_for_read,
            freezer: options.freezer,
        }
    }

    /// Mutable context built from a JSON object
    pub fn from_json(
        object: serde_json::Map<String, serde_json::Value>,
        options: ContextOptions,
    ) -> Self {
        Self::with_options(object.into_iter().collect::<Mapping>(), options)
    }

    /// Already-frozen context over an already-frozen store
    pub(crate) fn frozen_from(store: Mapping, freezer: Freezer) -> Self {
        let frozen = OnceLock::new();
        let _ = frozen.set(store);
        ContextDict {
            pending: Mutex::new(Mapping::new()),
            frozen,
            fingerprint: OnceLock::new(),
            requires_frozen_for_read: true,
            freezer,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get().is_some()
    }

    pub fn requires_frozen_for_read(&self) -> bool {
        self.requires_frozen_for_read
    }

    pub fn freezer(&self) -> &Freezer {
        &self.freezer
    }

    /// Options a derived context inherits from this one
    pub fn options(&self) -> ContextOptions {
        ContextOptions {
            requires_frozen_for_read: self.requires_frozen_for_read,
            freezer: self.freezer.clone(),
        }
    }

    /// Seal the context
    ///
    /// Runs every stored value through the freezer and publishes the result. Calling it on
    /// a frozen context does nothing. When several threads race, exactly one performs the
    /// transform and the others return once it is published. If a caller-supplied rule
    /// rejects a value the context stays Mutable with its store untouched.
    pub fn freeze(&self) -> Result<(), ContextError> {
        if self.is_frozen() {
            return Ok(());
        }

        let mut pending = self.pending.lock();
        if self.is_frozen() {
            return Ok(());
        }

        let store = self.freezer.freeze_entries(pending.clone())?;
        let entries = store.len();
        let _ = self.frozen.set(store);
        pending.clear();
        debug!(entries, "Context frozen");
        Ok(())
    }

    /// Look up a value
    pub fn get(&self, key: impl Into<Key>) -> Result<Value, ContextError> {
        let key = key.into();
        self.check_readable()?;
        self.with_store(|store| store.get(&key).cloned())
            .ok_or_else(|| ContextError::KeyNotFound(key.to_string()))
    }

    /// All entries in insertion order (gated like [`get`](Self::get))
    pub fn entries(&self) -> Result<Vec<(Key, Value)>, ContextError> {
        self.check_readable()?;
        Ok(self.with_store(|store| {
            store
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        }))
    }

    /// Keys in insertion order; legal in both phases
    ///
    /// The iterator owns a snapshot, so calling `keys` again restarts from the beginning.
    pub fn keys(&self) -> std::vec::IntoIter<Key> {
        self.with_store(|store| store.keys().cloned().collect::<Vec<_>>())
            .into_iter()
    }

    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        self.with_store(|store| store.contains_key(&key))
    }

    pub fn len(&self) -> usize {
        self.with_store(Mapping::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<(), ContextError> {
        let (key, value) = (key.into(), value.into());
        self.writable("assign to")?.insert(key, value);
        Ok(())
    }

    pub fn delete(&self, key: impl Into<Key>) -> Result<(), ContextError> {
        let key = key.into();
        self.writable("delete from")?
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| ContextError::KeyNotFound(key.to_string()))
    }

    pub fn clear(&self) -> Result<(), ContextError> {
        self.writable("clear")?.clear();
        Ok(())
    }

    pub fn pop(&self, key: impl Into<Key>) -> Result<Value, ContextError> {
        let key = key.into();
        self.writable("pop from")?
            .remove(&key)
            .ok_or_else(|| ContextError::KeyNotFound(key.to_string()))
    }

    /// Remove and return the most recently inserted entry
    pub fn pop_item(&self) -> Result<(Key, Value), ContextError> {
        self.writable("pop from")?
            .pop_last()
            .ok_or_else(|| ContextError::KeyNotFound("popitem(): context is empty".to_string()))
    }

    /// Return the value for `key`, inserting `default` first if it is absent
    pub fn set_default(
        &self,
        key: impl Into<Key>,
        default: impl Into<Value>,
    ) -> Result<Value, ContextError> {
        let key = key.into();
        let mut store = self.writable("update")?;
        if let Some(existing) = store.get(&key) {
            return Ok(existing.clone());
        }
        let default = default.into();
        store.insert(key, default.clone());
        Ok(default)
    }

    pub fn update_from(&self, entries: impl Into<Mapping>) -> Result<(), ContextError> {
        let mut store = self.writable("update")?;
        store.merge(entries.into());
        Ok(())
    }

    /// New Mutable context: this store overlaid with `overriding`
    ///
    /// Works in either phase and never touches the receiver. The result inherits the
    /// read gate and freezer.
    pub fn union(&self, overriding: impl Into<Mapping>) -> ContextDict {
        let mut store = self.store_snapshot();
        store.merge(overriding.into());
        ContextDict::with_options(store, self.options())
    }

    /// Fingerprint of a frozen context's entry set
    ///
    /// Order-independent: contexts with equal entries hash equally no matter how they
    /// were built.
    pub fn hash(&self) -> Result<Fingerprint, ContextError> {
        if !self.is_frozen() {
            return Err(ContextError::NotFrozen("hashing"));
        }
        let fingerprint = self.entries_fingerprint();
        trace!(fingerprint = %hex::encode(fingerprint), "Context hashed");
        Ok(fingerprint)
    }

    pub(crate) fn entries_fingerprint(&self) -> Fingerprint {
        match self.frozen.get() {
            Some(store) => *self
                .fingerprint
                .get_or_init(|| hasher::entries_fingerprint(store)),
            None => hasher::entries_fingerprint(&self.store_snapshot()),
        }
    }

    /// Owned copy of the current store, whatever the phase
    pub(crate) fn store_snapshot(&self) -> Mapping {
        self.store_view().into_owned()
    }

    // Copies the Mutable store out so the lock is never held while comparing or freezing
    // nested contexts.
    fn store_view(&self) -> Cow<'_, Mapping> {
        if let Some(store) = self.frozen.get() {
            return Cow::Borrowed(store);
        }
        let pending = self.pending.lock();
        match self.frozen.get() {
            Some(store) => Cow::Borrowed(store),
            None => Cow::Owned(pending.clone()),
        }
    }

    fn with_store<R>(&self, f: impl FnOnce(&Mapping) -> R) -> R {
        if let Some(store) = self.frozen.get() {
            return f(store);
        }
        let pending = self.pending.lock();
        match self.frozen.get() {
            Some(store) => f(store),
            None => f(&pending),
        }
    }

    fn check_readable(&self) -> Result<(), ContextError> {
        if self.requires_frozen_for_read && !self.is_frozen() {
            return Err(ContextError::NotFrozen("reading its members"));
        }
        Ok(())
    }

    fn writable(&self, op: &'static str) -> Result<MutexGuard<'_, Mapping>, ContextError> {
        let pending = self.pending.lock();
        if self.is_frozen() {
            return Err(ContextError::ImmutableState(op));
        }
        Ok(pending)
    }
}

impl PartialEq for ContextDict {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || *self.store_view() == *other.store_view()
    }
}

impl Eq for ContextDict {}

impl PartialEq<Mapping> for ContextDict {
    fn eq(&self, other: &Mapping) -> bool {
        *self.store_view() == *other
    }
}

impl PartialEq<ContextDict> for Mapping {
    fn eq(&self, other: &ContextDict) -> bool {
        other == self
    }
}

impl<K: Into<Key>, V: Into<Value>> FromIterator<(K, V)> for ContextDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ContextDict::from_entries(iter.into_iter().collect::<Mapping>())
    }
}

impl fmt::Debug for ContextDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContextDict({:?}, must_be_frozen={}, freezer={:?})",
            self.store_view(),
            self.requires_frozen_for_read,
            self.freezer
        )
    }
}

impl Serialize for ContextDict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.check_readable().map_err(S::Error::custom)?;
        let store = self.store_view();
        let mut map = serializer.serialize_map(Some(store.len()))?;
        for (key, value) in store.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
