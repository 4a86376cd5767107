//! Derived Value Cache
//!
//! Memoizes computed values against explicit, caller-declared dependency
//! lists. A cached value is valid while no declared dependency has changed
//! revision since it was computed; recomputing to an equal value refreshes
//! the entry without signalling downstream change.
//!
//! Dependency tracking is explicit by design: callers must enumerate every
//! store-derived input the compute function reads. An omitted dependency is
//! a caller bug the cache cannot detect.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::access::ComputeAccess;
use crate::record::{RecordId, RecordType};
use crate::store::Store;
use crate::util::lock;

/// One declared input of a derived computation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// A single record, tracked by its last-changed revision
    Record(RecordId),
    /// Any record of a type
    OfType(RecordType),
    /// The whole store; invalidates on every commit
    Store,
}

struct Entry {
    deps: Vec<Dependency>,
    stamps: Vec<u64>,
    value: Box<dyn Any + Send>,
    output_revision: u64,
}

/// Memoization cache bound to one store
pub struct DerivedCache {
    store: Store,
    entries: Mutex<HashMap<String, Entry>>,
}

impl DerivedCache {
    /// Create a cache over a store handle
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            store: store.clone(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the value of `compute`, recomputing only when a declared
    /// dependency has changed revision since the last computation (or no
    /// entry exists for `key`).
    ///
    /// `compute` receives the store for reading and must not mutate it; a
    /// `transact` during recomputation panics.
    pub fn use_value<T, F>(&self, key: &str, deps: &[Dependency], compute: F) -> T
    where
        T: Clone + PartialEq + Send + 'static,
        F: FnOnce(&Store) -> T,
    {
        let stamps: Vec<u64> = deps.iter().map(|dep| self.stamp(dep)).collect();

        if let Some(entry) = lock(&self.entries).get(key) {
            if entry.deps == deps && entry.stamps == stamps {
                if let Some(value) = entry.value.downcast_ref::<T>() {
                    return value.clone();
                }
            }
        }

        debug!(key, "recomputing derived value");
        let value = {
            let _access = ComputeAccess::acquire(self.store.id());
            compute(&self.store)
        };

        let mut entries = lock(&self.entries);
        let output_revision = match entries.get(key) {
            Some(previous) => match previous.value.downcast_ref::<T>() {
                Some(old) if *old == value => previous.output_revision,
                _ => previous.output_revision + 1,
            },
            None => 1,
        };
        entries.insert(
            key.to_string(),
            Entry {
                deps: deps.to_vec(),
                stamps,
                value: Box::new(value.clone()),
                output_revision,
            },
        );
        value
    }

    /// Revision of a key's output; advances only when recomputation
    /// produces an unequal value. Returns 0 for an unknown key.
    ///
    /// Downstream consumers poll this to decide whether to re-render: a
    /// recompute that lands on an equal value leaves it unchanged.
    #[must_use]
    pub fn output_revision(&self, key: &str) -> u64 {
        lock(&self.entries)
            .get(key)
            .map_or(0, |entry| entry.output_revision)
    }

    /// Drop one cached entry
    pub fn invalidate(&self, key: &str) {
        lock(&self.entries).remove(key);
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Number of cached entries
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    fn stamp(&self, dep: &Dependency) -> u64 {
        match dep {
            Dependency::Record(id) => self.store.record_revision(id),
            Dependency::OfType(ty) => self.store.type_revision(*ty),
            Dependency::Store => self.store.revision(),
        }
    }
}
