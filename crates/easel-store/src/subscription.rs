//! Change Subscriptions
//!
//! This module provides the listener registry the store notifies after each
//! committed transaction. Listeners are invoked in registration order with
//! exactly one call per diff, optionally filtered by record scope, and are
//! disposed through idempotent handles that stay safe after the store is
//! gone.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

use crate::diff::Diff;
use crate::record::RecordScope;
use crate::util::lock;

type Callback = Arc<dyn Fn(&Diff) + Send + Sync>;

struct ListenerEntry {
    id: u64,
    scope: Option<RecordScope>,
    callback: Callback,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    listeners: Vec<ListenerEntry>,
}

/// Listener registry with in-order, coalesced diff delivery
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    state: Arc<Mutex<RegistryState>>,
    queue: Mutex<VecDeque<Diff>>,
    delivering: AtomicBool,
}

impl SubscriptionRegistry {
    /// Register a listener, optionally filtered to one scope.
    pub(crate) fn add(
        &self,
        scope: Option<RecordScope>,
        callback: impl Fn(&Diff) + Send + Sync + 'static,
    ) -> ListenerHandle {
        let mut state = lock(&self.state);
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.push(ListenerEntry {
            id,
            scope,
            callback: Arc::new(callback),
        });
        ListenerHandle {
            registry: Arc::downgrade(&self.state),
            id,
        }
    }

    /// Number of registered listeners.
    pub(crate) fn len(&self) -> usize {
        lock(&self.state).listeners.len()
    }

    /// Queue a diff and deliver everything pending, in commit order.
    ///
    /// A diff committed from inside a listener callback lands on the queue
    /// and is delivered by the already-running outer loop, so listeners
    /// never observe diffs out of revision order.
    pub(crate) fn dispatch(&self, diff: Diff) {
        lock(&self.queue).push_back(diff);
        if self.delivering.swap(true, Ordering::SeqCst) {
            return;
        }
        loop {
            loop {
                // Take the diff out before delivering so the queue lock is
                // not held while callbacks run (they may commit again)
                let next = lock(&self.queue).pop_front();
                match next {
                    Some(diff) => self.deliver(&diff),
                    None => break,
                }
            }
            self.delivering.store(false, Ordering::SeqCst);
            if lock(&self.queue).is_empty() || self.delivering.swap(true, Ordering::SeqCst) {
                break;
            }
        }
    }

    /// Invoke every matching listener for one diff.
    ///
    /// The listener list is snapshotted first: a listener registered during
    /// this delivery is not invoked for this diff, and one disposed during
    /// it is skipped from that point on.
    fn deliver(&self, diff: &Diff) {
        let snapshot: Vec<(u64, Option<RecordScope>, Callback)> = lock(&self.state)
            .listeners
            .iter()
            .map(|l| (l.id, l.scope, Arc::clone(&l.callback)))
            .collect();

        debug!(revision = diff.revision, listeners = snapshot.len(), "delivering diff");

        for (id, scope, callback) in snapshot {
            if let Some(scope) = scope {
                if !diff.touches_scope(scope) {
                    continue;
                }
            }
            let still_registered = lock(&self.state).listeners.iter().any(|l| l.id == id);
            if !still_registered {
                continue;
            }
            callback(diff);
        }
    }
}

/// Disposer for a registered listener.
///
/// Dropping the handle does not dispose the listener; call
/// [`ListenerHandle::dispose`]. Disposal is idempotent and safe to call
/// after the store itself has been discarded.
pub struct ListenerHandle {
    registry: Weak<Mutex<RegistryState>>,
    id: u64,
}

impl ListenerHandle {
    /// Remove the listener; later diffs never reach it.
    pub fn dispose(&self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.retain(|l| l.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PageRecord;
    use std::sync::atomic::AtomicUsize;

    fn doc_diff(revision: u64) -> Diff {
        Diff {
            revision,
            added: vec![PageRecord::new("P", "a1").into()],
            updated: vec![],
            removed: vec![],
        }
    }

    #[test]
    fn test_listener_receives_dispatched_diff() {
        let registry = SubscriptionRegistry::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        let _handle = registry.add(None, move |_| {
            seen2.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(doc_diff(1));
        registry.dispatch(doc_diff(2));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_scope_filter() {
        let registry = SubscriptionRegistry::default();
        let doc_hits = Arc::new(AtomicUsize::new(0));
        let session_hits = Arc::new(AtomicUsize::new(0));

        let d = Arc::clone(&doc_hits);
        let _doc = registry.add(Some(RecordScope::Document), move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });
        let s = Arc::clone(&session_hits);
        let _session = registry.add(Some(RecordScope::Session), move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(doc_diff(1));
        assert_eq!(doc_hits.load(Ordering::SeqCst), 1);
        assert_eq!(session_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_registration_order() {
        let registry = SubscriptionRegistry::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            let _ = registry.add(None, move |_| {
                lock(&order).push(tag);
            });
        }

        registry.dispatch(doc_diff(1));
        assert_eq!(*lock(&order), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let registry = SubscriptionRegistry::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        let handle = registry.add(None, move |_| {
            seen2.fetch_add(1, Ordering::SeqCst);
        });

        handle.dispose();
        handle.dispose();
        registry.dispatch(doc_diff(1));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_dispose_after_registry_dropped() {
        let handle = {
            let registry = SubscriptionRegistry::default();
            registry.add(None, |_| {})
        };
        // Registry is gone; disposal must be a no-op, not a crash
        handle.dispose();
    }

    #[test]
    fn test_listener_disposed_during_delivery_is_skipped() {
        let registry = Arc::new(SubscriptionRegistry::default());
        let seen = Arc::new(AtomicUsize::new(0));

        let handle = Arc::new(Mutex::new(None::<ListenerHandle>));
        let handle2 = Arc::clone(&handle);
        let _first = registry.add(None, move |_| {
            if let Some(h) = lock(&handle2).as_ref() {
                h.dispose();
            }
        });
        let seen2 = Arc::clone(&seen);
        let second = registry.add(None, move |_| {
            seen2.fetch_add(1, Ordering::SeqCst);
        });
        *lock(&handle) = Some(second);

        registry.dispatch(doc_diff(1));
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        registry.dispatch(doc_diff(2));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_added_during_delivery_misses_current_diff() {
        let registry = Arc::new(SubscriptionRegistry::default());
        let late_hits = Arc::new(AtomicUsize::new(0));

        let registry2 = Arc::clone(&registry);
        let late_hits2 = Arc::clone(&late_hits);
        let added = Arc::new(AtomicBool::new(false));
        let added2 = Arc::clone(&added);
        let _first = registry.add(None, move |_| {
            if !added2.swap(true, Ordering::SeqCst) {
                let late_hits3 = Arc::clone(&late_hits2);
                let _ = registry2.add(None, move |_| {
                    late_hits3.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        registry.dispatch(doc_diff(1));
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);

        registry.dispatch(doc_diff(2));
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_nested_dispatch_preserves_order() {
        let registry = Arc::new(SubscriptionRegistry::default());
        let revisions = Arc::new(Mutex::new(Vec::new()));

        let registry2 = Arc::clone(&registry);
        let revisions2 = Arc::clone(&revisions);
        let _listener = registry.add(None, move |diff| {
            lock(&revisions2).push(diff.revision);
            if diff.revision == 1 {
                // A commit from inside a callback queues behind the
                // in-flight delivery
                registry2.dispatch(doc_diff(2));
                lock(&revisions2).push(99);
            }
        });

        registry.dispatch(doc_diff(1));
        assert_eq!(*lock(&revisions), vec![1, 99, 2]);
    }
}
