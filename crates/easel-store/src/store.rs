//! Record Store
//!
//! This module provides the versioned record store at the heart of the
//! editor. All mutation goes through [`Store::transact`], which stages
//! changes against committed state and commits them atomically as one
//! [`Diff`]; readers and listeners never observe a partially applied
//! transaction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::access::{self, TransactionAccess};
use crate::diff::Diff;
use crate::error::Result;
use crate::record::{Record, RecordId, RecordScope, RecordType};
use crate::snapshot::{Snapshot, SnapshotScope};
use crate::subscription::{ListenerHandle, SubscriptionRegistry};
use crate::util::lock;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct StoreState {
    records: HashMap<RecordId, Record>,
    revision: u64,
    record_revisions: HashMap<RecordId, u64>,
    type_revisions: HashMap<RecordType, u64>,
}

struct StoreInner {
    id: u64,
    state: Mutex<StoreState>,
    subscriptions: SubscriptionRegistry,
}

/// The reactive record store.
///
/// Cheap to clone; clones share the same underlying state. The store is
/// owned by the editing session that created it, and every external writer
/// goes through [`Store::transact`].
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
                state: Mutex::new(StoreState::default()),
                subscriptions: SubscriptionRegistry::default(),
            }),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.inner.id
    }

    /// Run a mutator with exclusive write access and commit its staged
    /// changes atomically.
    ///
    /// The revision bumps by exactly one if the transaction changed
    /// anything; a mutator error discards every staged change and is
    /// returned to the caller. Calling `transact` re-entrantly, or from
    /// inside a derived-value computation, panics.
    pub fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let access = TransactionAccess::acquire(self.inner.id);
        let mut state = lock(&self.inner.state);
        let (value, staged) = {
            let mut txn = Transaction {
                state: &*state,
                staged: HashMap::new(),
            };
            match f(&mut txn) {
                Ok(value) => (value, txn.staged),
                Err(err) => {
                    debug!(error = %err, "transaction rolled back");
                    return Err(err);
                }
            }
        };
        let diff = apply_staged(&mut state, staged);
        drop(state);
        drop(access);
        if let Some(diff) = diff {
            self.inner.subscriptions.dispatch(diff);
        }
        Ok(value)
    }

    /// Read a committed record
    #[must_use]
    pub fn get(&self, id: &RecordId) -> Option<Record> {
        access::assert_readable(self.inner.id);
        lock(&self.inner.state).records.get(id).cloned()
    }

    /// Whether a committed record exists
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        access::assert_readable(self.inner.id);
        lock(&self.inner.state).records.contains_key(id)
    }

    /// All committed records of one type, ordered by id
    #[must_use]
    pub fn get_all(&self, record_type: RecordType) -> Vec<Record> {
        access::assert_readable(self.inner.id);
        let state = lock(&self.inner.state);
        let mut records: Vec<Record> = state
            .records
            .values()
            .filter(|r| r.record_type() == record_type)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id().cmp(b.id()));
        records
    }

    /// Number of committed records
    #[must_use]
    pub fn record_count(&self) -> usize {
        access::assert_readable(self.inner.id);
        lock(&self.inner.state).records.len()
    }

    /// Current store revision; increases by one per committed transaction
    #[must_use]
    pub fn revision(&self) -> u64 {
        access::assert_readable(self.inner.id);
        lock(&self.inner.state).revision
    }

    /// Revision at which a record last changed (0 if it never has)
    #[must_use]
    pub fn record_revision(&self, id: &RecordId) -> u64 {
        access::assert_readable(self.inner.id);
        lock(&self.inner.state)
            .record_revisions
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    /// Revision at which any record of a type last changed (0 if none has)
    #[must_use]
    pub fn type_revision(&self, record_type: RecordType) -> u64 {
        access::assert_readable(self.inner.id);
        lock(&self.inner.state)
            .type_revisions
            .get(&record_type)
            .copied()
            .unwrap_or(0)
    }

    /// Capture an immutable snapshot of all document-scoped records.
    ///
    /// The snapshot is independent of later mutation and never contains
    /// session-scoped records.
    #[must_use]
    pub fn get_snapshot(&self) -> Snapshot {
        self.get_snapshot_with(SnapshotScope::Document)
    }

    /// Capture a snapshot, optionally including session-scoped records.
    ///
    /// An all-scope snapshot is for inspection only; the codec refuses to
    /// encode session records.
    #[must_use]
    pub fn get_snapshot_with(&self, scope: SnapshotScope) -> Snapshot {
        access::assert_readable(self.inner.id);
        let state = lock(&self.inner.state);
        Snapshot::from_records(
            state
                .records
                .values()
                .filter(|r| scope.includes(r.scope()))
                .cloned(),
        )
    }

    /// Replace all document-scoped records with a snapshot's contents, as
    /// one transaction. Session-scoped records are untouched.
    pub fn load_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        snapshot.validate()?;
        self.transact(|txn| {
            let existing: Vec<RecordId> = txn
                .all_ids()
                .filter(|id| {
                    id.record_type()
                        .is_some_and(|t| t.scope() == RecordScope::Document)
                })
                .collect();
            for id in existing {
                txn.remove(&id);
            }
            for record in snapshot.into_records() {
                txn.put(record);
            }
            Ok(())
        })
    }

    /// Register a listener invoked once per committed diff
    pub fn listen(&self, callback: impl Fn(&Diff) + Send + Sync + 'static) -> ListenerHandle {
        self.inner.subscriptions.add(None, callback)
    }

    /// Register a listener invoked only for diffs touching one scope
    pub fn listen_scoped(
        &self,
        scope: RecordScope,
        callback: impl Fn(&Diff) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.inner.subscriptions.add(Some(scope), callback)
    }

    /// Number of registered listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.subscriptions.len()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("id", &self.inner.id).finish()
    }
}

/// Staged mutation context handed to a `transact` mutator.
///
/// Reads observe staged state layered over committed state; nothing is
/// visible outside until the mutator returns `Ok`.
pub struct Transaction<'a> {
    state: &'a StoreState,
    // None marks a staged removal
    staged: HashMap<RecordId, Option<Record>>,
}

impl Transaction<'_> {
    /// Read a record, observing staged changes
    #[must_use]
    pub fn get(&self, id: &RecordId) -> Option<Record> {
        match self.staged.get(id) {
            Some(staged) => staged.clone(),
            None => self.state.records.get(id).cloned(),
        }
    }

    /// Whether a record exists, observing staged changes
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        match self.staged.get(id) {
            Some(staged) => staged.is_some(),
            None => self.state.records.contains_key(id),
        }
    }

    /// All records of one type, observing staged changes, ordered by id
    #[must_use]
    pub fn get_all(&self, record_type: RecordType) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .all_ids()
            .filter_map(|id| self.get(&id))
            .filter(|r| r.record_type() == record_type)
            .collect();
        records.sort_by(|a, b| a.id().cmp(b.id()));
        records
    }

    /// Create or update a record
    pub fn put(&mut self, record: impl Into<Record>) {
        let record = record.into();
        self.staged.insert(record.id().clone(), Some(record));
    }

    /// Remove a record; returns whether it existed
    pub fn remove(&mut self, id: &RecordId) -> bool {
        let exists = self.contains(id);
        if exists {
            self.staged.insert(id.clone(), None);
        }
        exists
    }

    fn all_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.state
            .records
            .keys()
            .filter(|id| !self.staged.contains_key(*id))
            .chain(self.staged.iter().filter_map(|(id, r)| r.as_ref().map(|_| id)))
            .cloned()
    }
}

/// Fold staged changes into committed state, producing the diff.
///
/// Writes that leave a record identical to its committed state are dropped,
/// so a transaction that changes nothing commits no diff and bumps no
/// revision.
fn apply_staged(state: &mut StoreState, staged: HashMap<RecordId, Option<Record>>) -> Option<Diff> {
    let mut added = Vec::new();
    let mut updated = Vec::new();
    let mut removed = Vec::new();

    for (id, entry) in staged {
        match entry {
            Some(record) => match state.records.get(&id) {
                Some(before) if *before == record => {}
                Some(before) => updated.push((before.clone(), record)),
                None => added.push(record),
            },
            None => {
                if let Some(before) = state.records.get(&id) {
                    removed.push(before.clone());
                }
            }
        }
    }

    if added.is_empty() && updated.is_empty() && removed.is_empty() {
        return None;
    }

    state.revision += 1;
    let revision = state.revision;

    for record in &added {
        state.records.insert(record.id().clone(), record.clone());
    }
    for (_, after) in &updated {
        state.records.insert(after.id().clone(), after.clone());
    }
    for record in &removed {
        state.records.remove(record.id());
    }

    for record in added
        .iter()
        .chain(updated.iter().map(|(_, after)| after))
        .chain(removed.iter())
    {
        state.record_revisions.insert(record.id().clone(), revision);
        state.type_revisions.insert(record.record_type(), revision);
    }

    added.sort_by(|a, b| a.id().cmp(b.id()));
    updated.sort_by(|a, b| a.1.id().cmp(b.1.id()));
    removed.sort_by(|a, b| a.id().cmp(b.id()));

    debug!(
        revision,
        added = added.len(),
        updated = updated.len(),
        removed = removed.len(),
        "transaction committed"
    );

    Some(Diff {
        revision,
        added,
        updated,
        removed,
    })
}
