//! Exclusive-access tracking for the store.
//!
//! The store runs single-threaded cooperative: transactions run to
//! completion before the next begins, and derived-value recomputation must
//! not mutate the store. Violations are programming errors and panic
//! immediately instead of deadlocking or being silently ignored.

use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Default, Clone, Copy)]
struct AccessFlags {
    in_transaction: bool,
    compute_depth: u32,
}

thread_local! {
    static ACCESS: RefCell<HashMap<u64, AccessFlags>> = RefCell::new(HashMap::new());
}

/// Marks a store as inside `transact` on the current thread.
///
/// Held for the duration of the mutator and commit; released before
/// listeners are notified.
pub(crate) struct TransactionAccess {
    store_id: u64,
}

impl TransactionAccess {
    pub(crate) fn acquire(store_id: u64) -> Self {
        ACCESS.with(|access| {
            let mut map = access.borrow_mut();
            let flags = map.entry(store_id).or_default();
            if flags.in_transaction {
                panic!("transact called re-entrantly; commit the outer transaction first");
            }
            if flags.compute_depth > 0 {
                panic!("transact called during derived value recomputation; compute functions must not mutate the store");
            }
            flags.in_transaction = true;
        });
        Self { store_id }
    }
}

impl Drop for TransactionAccess {
    fn drop(&mut self) {
        ACCESS.with(|access| {
            if let Some(flags) = access.borrow_mut().get_mut(&self.store_id) {
                flags.in_transaction = false;
            }
        });
    }
}

/// Marks a store as inside a derived-value recomputation on this thread.
///
/// Reads stay allowed; `transact` panics until the guard drops. Nested
/// recomputation of other keys is fine, so this is a depth counter.
pub(crate) struct ComputeAccess {
    store_id: u64,
}

impl ComputeAccess {
    pub(crate) fn acquire(store_id: u64) -> Self {
        ACCESS.with(|access| {
            let mut map = access.borrow_mut();
            let flags = map.entry(store_id).or_default();
            if flags.in_transaction {
                panic!("derived values cannot be computed inside a transaction");
            }
            flags.compute_depth += 1;
        });
        Self { store_id }
    }
}

impl Drop for ComputeAccess {
    fn drop(&mut self) {
        ACCESS.with(|access| {
            if let Some(flags) = access.borrow_mut().get_mut(&self.store_id) {
                flags.compute_depth = flags.compute_depth.saturating_sub(1);
            }
        });
    }
}

/// Panic if the calling thread holds this store's transaction.
///
/// Direct reads during a transaction would deadlock on the state mutex;
/// reads inside a mutator go through the `Transaction` handle instead.
pub(crate) fn assert_readable(store_id: u64) {
    ACCESS.with(|access| {
        let in_transaction = access
            .borrow()
            .get(&store_id)
            .is_some_and(|flags| flags.in_transaction);
        if in_transaction {
            panic!("store read during an open transaction; read through the Transaction handle inside transact");
        }
    });
}
