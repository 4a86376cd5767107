//! Easel Store - Reactive Record Database
//!
//! This crate provides the reactive document store for the Easel canvas:
//! - Record: Typed document and session record model
//! - Store: Versioned record database with atomic transactions
//! - Diff: Per-transaction change sets, the unit of notification
//! - Subscription: Scope-filtered, coalesced change listeners
//! - Derived: Dependency-stamped derived value cache
//! - Snapshot: Deterministic snapshot codec with strict validation
//! - Theme: Static light/dark color palette for rendering
//! - Error: Error types for store operations
//!
//! ## Features
//!
//! - Atomic batched mutation with all-or-nothing rollback
//! - One coalesced notification per transaction, delivered in commit order
//! - Document/session scoping; session state never reaches a snapshot
//! - Derived values recomputed only when declared dependencies change
//! - Unknown record fields preserved through snapshot round trips
//!
//! ## Usage
//!
//! ```
//! use easel_store::{PageRecord, RecordScope, ShapeRecord, Store};
//!
//! let store = Store::new();
//! let page = PageRecord::new("Page 1", "a1");
//! let page_id = page.id.clone();
//!
//! let handle = store.listen_scoped(RecordScope::Document, |diff| {
//!     println!("revision {} changed {} records", diff.revision, diff.len());
//! });
//!
//! store
//!     .transact(|txn| {
//!         txn.put(page);
//!         txn.put(ShapeRecord::new(page_id, 120.0, 80.0));
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(store.revision(), 1);
//! handle.dispose();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod util;

pub mod derived;
pub mod diff;
pub mod error;
pub mod record;
pub mod snapshot;
pub mod store;
pub mod subscription;
pub mod theme;

// Re-export main types
pub use derived::{Dependency, DerivedCache};
pub use diff::Diff;
pub use error::{Error, Result};
pub use record::{
    CameraRecord, DocumentRecord, InstanceRecord, PageRecord, Record, RecordId, RecordScope,
    RecordType, ShapeRecord, UserRecord,
};
pub use snapshot::{Snapshot, SnapshotScope, SNAPSHOT_SCHEMA_VERSION};
pub use store::{Store, Transaction};
pub use subscription::ListenerHandle;
pub use theme::{ColorScheme, Palette};
