//! Error types for easel-store
//!
//! This module provides error types for the record store,
//! including snapshot decoding and transaction failures.

use thiserror::Error;

/// Store error type
#[derive(Debug, Error)]
pub enum Error {
    /// Snapshot payload failed to decode or validate
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Transaction mutator failed; all staged mutations were discarded
    #[error("transaction failed: {0}")]
    TransactionFailure(String),

    /// Record type tag or id prefix is not a known record type
    #[error("unknown record type: {0}")]
    UnknownRecordType(String),

    /// Record identifier is not of the form `<type>:<key>`
    #[error("invalid record id: {0}")]
    InvalidRecordId(String),
}

impl Error {
    /// Create a malformed snapshot error
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedSnapshot(msg.into())
    }

    /// Create a transaction failure error
    #[must_use]
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::TransactionFailure(msg.into())
    }

    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedSnapshot(_) => "malformed_snapshot",
            Self::TransactionFailure(_) => "transaction_failure",
            Self::UnknownRecordType(_) => "unknown_record_type",
            Self::InvalidRecordId(_) => "invalid_record_id",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedSnapshot(err.to_string())
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::malformed("bad").code(), "malformed_snapshot");
        assert_eq!(Error::transaction("bad").code(), "transaction_failure");
        assert_eq!(
            Error::UnknownRecordType("widget".into()).code(),
            "unknown_record_type"
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::malformed("missing field `x`");
        assert!(err.to_string().contains("malformed snapshot"));
        assert!(err.to_string().contains("missing field `x`"));
    }

    #[test]
    fn test_from_serde_error() {
        let result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        let err: Error = result.unwrap_err().into();
        assert_eq!(err.code(), "malformed_snapshot");
    }
}
