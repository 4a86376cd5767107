//! Error types for easel-sync
//!
//! This module provides error types for the synchronization client,
//! including remote load/save and snapshot decoding failures.

use thiserror::Error;

/// Sync error type
#[derive(Debug, Error)]
pub enum Error {
    /// Initial snapshot load failed; surfaced as the session error state
    #[error("load failed: {0}")]
    LoadFailed(String),

    /// A throttled save failed; non-fatal, the next save re-reads state
    #[error("save failed: {0}")]
    SaveFailed(String),

    /// Snapshot encode/decode failure from the store codec
    #[error("snapshot error: {0}")]
    Snapshot(#[from] easel_store::Error),

    /// Operation attempted after the client was torn down
    #[error("sync client closed")]
    ClientClosed,
}

impl Error {
    /// Create a load failure error
    #[must_use]
    pub fn load_failed(msg: impl Into<String>) -> Self {
        Self::LoadFailed(msg.into())
    }

    /// Create a save failure error
    #[must_use]
    pub fn save_failed(msg: impl Into<String>) -> Self {
        Self::SaveFailed(msg.into())
    }

    /// Check if error is recoverable by a later scheduled attempt
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SaveFailed(_) | Self::LoadFailed(_))
    }

    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::LoadFailed(_) => "load_failed",
            Self::SaveFailed(_) => "save_failed",
            Self::Snapshot(_) => "malformed_snapshot",
            Self::ClientClosed => "client_closed",
        }
    }
}

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;
