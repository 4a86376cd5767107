//! Easel Sync - Whiteboard Snapshot Synchronization
//!
//! This crate keeps an easel-store document synchronized with a remote
//! snapshot endpoint:
//! - Client: Load-on-activate, throttled save-on-change state machine
//! - Throttle: Leading-edge, trailing-coalesce save rate limiter
//! - Remote: HTTP client for the `/whiteboard/{id}` endpoint
//! - Config: Endpoint and timing configuration
//! - Error: Error types for sync operations
//!
//! ## Features
//!
//! - A missing remote board is a normal first use, not an error
//! - Remote snapshots buffer until the rendering surface attaches
//! - Saves sample the store at send time, so no payload carries stale state
//! - A load resolving after local edits is discarded, never applied over them
//! - Teardown is one explicit `close()`: cancels the load and the save timer
//!
//! ## Usage
//!
//! ```no_run
//! use easel_store::{PageRecord, Store};
//! use easel_sync::{SyncClient, SyncConfig};
//!
//! # async fn run() {
//! let store = Store::new();
//! let config = SyncConfig::new("https://boards.example.com", "abc");
//! let client = SyncClient::new(store.clone(), config);
//!
//! client.attach().unwrap();
//! client.activate();
//!
//! // Edits committed while Ready are persisted automatically
//! store
//!     .transact(|txn| {
//!         txn.put(PageRecord::new("Page 1", "a1"));
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! // Session end
//! client.close();
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod remote;
pub mod throttle;

// Re-export main types
pub use client::{SyncClient, SyncStatus};
pub use config::{SyncConfig, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_THROTTLE_INTERVAL_MS};
pub use error::{Error, Result};
pub use remote::RemoteClient;
pub use throttle::Throttle;
