//! Synchronization Client
//!
//! Keeps a remote copy of the document in step with the local store:
//! on activation it loads the persisted snapshot (a missing board is a
//! normal first use), and once ready it saves a fresh snapshot on every
//! document change, throttled to one network write per interval.
//!
//! Race safety: a load that resolves after local edits is discarded rather
//! than applied over them, and every save samples `get_snapshot()` at send
//! time, so a save can be superseded by a later one but never carries
//! stale state forward.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use easel_store::{ListenerHandle, RecordScope, Snapshot, Store};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::remote::RemoteClient;
use crate::throttle::Throttle;

/// Lifecycle state of the synchronization client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Initial load in flight
    Loading,
    /// Document loaded (or confirmed absent); edits are being persisted
    Ready,
    /// Initial load failed; the store was left unmodified
    Error(String),
}

impl SyncStatus {
    /// Whether the client finished loading successfully
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether the client failed to load
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

struct ClientInner {
    store: Store,
    remote: RemoteClient,
    whiteboard_id: String,
    status_tx: watch::Sender<SyncStatus>,
    attached: AtomicBool,
    applying_remote: AtomicBool,
    closed: AtomicBool,
    // Store revision at construction; a load result is stale once the
    // revision has moved past this
    baseline_revision: u64,
    pending: Mutex<Option<Snapshot>>,
    throttle: Throttle,
    token: CancellationToken,
    listener: Mutex<Option<ListenerHandle>>,
}

/// Synchronization client for one whiteboard session.
///
/// Cheap to clone; clones drive the same session. Owns its save throttle
/// and load task, both torn down by [`SyncClient::close`].
#[derive(Clone)]
pub struct SyncClient {
    inner: Arc<ClientInner>,
}

impl SyncClient {
    /// Create a client bound to a store and remote endpoint.
    ///
    /// The client starts in [`SyncStatus::Loading`]; call
    /// [`SyncClient::activate`] to start the remote fetch. Must be called
    /// from within a tokio runtime.
    #[must_use]
    pub fn new(store: Store, config: SyncConfig) -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::Loading);
        let remote = RemoteClient::new(&config);
        let baseline_revision = store.revision();

        let inner = Arc::new_cyclic(|weak: &Weak<ClientInner>| {
            let save_target = weak.clone();
            let throttle = Throttle::new(config.throttle_interval(), move || {
                let save_target = save_target.clone();
                async move {
                    if let Some(inner) = save_target.upgrade() {
                        inner.save_now().await;
                    }
                }
            });
            ClientInner {
                store: store.clone(),
                remote,
                whiteboard_id: config.whiteboard_id,
                status_tx,
                attached: AtomicBool::new(false),
                applying_remote: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                baseline_revision,
                pending: Mutex::new(None),
                throttle,
                token: CancellationToken::new(),
                listener: Mutex::new(None),
            }
        });

        let weak = Arc::downgrade(&inner);
        let handle = store.listen_scoped(RecordScope::Document, move |_diff| {
            if let Some(inner) = weak.upgrade() {
                inner.on_document_change();
            }
        });
        *lock(&inner.listener) = Some(handle);

        Self { inner }
    }

    /// The store this client synchronizes
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Start the initial remote load.
    ///
    /// Resolution is guarded: a teardown before the fetch resolves
    /// discards the result without a late state transition or
    /// `load_snapshot`.
    pub fn activate(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = inner.token.cancelled() => {
                    debug!("load cancelled before the fetch resolved");
                    return;
                }
                result = inner.remote.fetch_snapshot(&inner.whiteboard_id) => result,
            };
            if inner.token.is_cancelled() {
                debug!("discarding load result after teardown");
                return;
            }

            match result {
                Ok(None) => {
                    info!(
                        whiteboard_id = %inner.whiteboard_id,
                        "no remote snapshot; starting with an empty document"
                    );
                    inner.set_status(SyncStatus::Ready);
                }
                Ok(Some(payload)) => match Snapshot::decode(&payload) {
                    Ok(snapshot) => {
                        if inner.attached.load(Ordering::SeqCst) {
                            if let Err(err) = inner.apply_remote(snapshot) {
                                inner.set_status(SyncStatus::Error(err.to_string()));
                                return;
                            }
                        } else {
                            *lock(&inner.pending) = Some(snapshot);
                        }
                        inner.set_status(SyncStatus::Ready);
                    }
                    Err(err) => {
                        warn!(error = %err, "remote snapshot failed to decode");
                        inner.set_status(SyncStatus::Error(err.to_string()));
                    }
                },
                Err(err) => {
                    warn!(error = %err, "snapshot load failed");
                    inner.set_status(SyncStatus::Error(err.to_string()));
                }
            }
        });
    }

    /// Mark the rendering surface attached and apply a buffered remote
    /// snapshot if one is waiting.
    pub fn attach(&self) -> Result<()> {
        self.inner.attached.store(true, Ordering::SeqCst);
        let pending = lock(&self.inner.pending).take();
        if let Some(snapshot) = pending {
            self.inner.apply_remote(snapshot)?;
        }
        Ok(())
    }

    /// Current lifecycle status
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.inner.status_tx.borrow().clone()
    }

    /// Subscribe to status transitions
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Run a pending throttled save now instead of waiting out the interval
    pub fn flush(&self) {
        self.inner.throttle.flush();
    }

    /// Whether the client has been torn down
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Tear the client down: cancel the load, drop any pending save timer,
    /// and stop listening to the store. Idempotent.
    ///
    /// An in-flight network call is not aborted; its result is discarded
    /// on arrival.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(whiteboard_id = %self.inner.whiteboard_id, "sync client closed");
        self.inner.token.cancel();
        self.inner.throttle.cancel();
        if let Some(handle) = lock(&self.inner.listener).take() {
            handle.dispose();
        }
    }
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("whiteboard_id", &self.inner.whiteboard_id)
            .field("status", &self.status())
            .finish()
    }
}

impl ClientInner {
    fn set_status(&self, status: SyncStatus) {
        debug!(?status, "sync status changed");
        self.status_tx.send_replace(status);
    }

    fn on_document_change(&self) {
        if self.closed.load(Ordering::SeqCst) || self.applying_remote.load(Ordering::SeqCst) {
            return;
        }
        if self.status_tx.borrow().is_ready() {
            self.throttle.trigger();
        }
    }

    /// Apply a loaded snapshot unless local edits have already moved the
    /// store past the revision the load started from.
    fn apply_remote(&self, snapshot: Snapshot) -> easel_store::Result<()> {
        if self.store.revision() != self.baseline_revision {
            info!(
                whiteboard_id = %self.whiteboard_id,
                "local edits outrun the remote snapshot; keeping local state"
            );
            return Ok(());
        }
        self.applying_remote.store(true, Ordering::SeqCst);
        let result = self.store.load_snapshot(snapshot);
        self.applying_remote.store(false, Ordering::SeqCst);
        result
    }

    /// Encode and upload the current document state.
    ///
    /// The snapshot is taken here, at send time, so the payload reflects
    /// every commit up to the moment the network call is issued.
    async fn save_now(&self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let snapshot = self.store.get_snapshot();
        let payload = match snapshot.encode() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "snapshot failed to encode for save");
                return;
            }
        };
        match self.remote.put_snapshot(&self.whiteboard_id, payload).await {
            Ok(()) => debug!(whiteboard_id = %self.whiteboard_id, "snapshot saved"),
            Err(err) => {
                // Non-fatal: the next edit schedules another save that
                // re-reads current state
                warn!(error = %err, "snapshot save failed");
            }
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_store::PageRecord;

    fn test_config() -> SyncConfig {
        SyncConfig::new("http://127.0.0.1:1", "abc").with_throttle_interval_ms(20)
    }

    #[tokio::test]
    async fn test_client_starts_loading() {
        let client = SyncClient::new(Store::new(), test_config());
        assert_eq!(client.status(), SyncStatus::Loading);
        assert!(!client.is_closed());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let client = SyncClient::new(Store::new(), test_config());
        client.close();
        client.close();
        assert!(client.is_closed());
        assert_eq!(client.store().listener_count(), 0);
    }

    #[tokio::test]
    async fn test_edits_before_ready_schedule_no_save() {
        let store = Store::new();
        let client = SyncClient::new(store.clone(), test_config());
        // Still Loading: the document listener must not trigger the
        // throttle, so no network call is attempted
        store
            .transact(|txn| {
                txn.put(PageRecord::new("Page 1", "a1"));
                Ok(())
            })
            .unwrap();
        assert_eq!(client.status(), SyncStatus::Loading);
    }

    #[tokio::test]
    async fn test_attach_without_pending_snapshot() {
        let client = SyncClient::new(Store::new(), test_config());
        client.attach().unwrap();
        assert_eq!(client.store().record_count(), 0);
    }
}
