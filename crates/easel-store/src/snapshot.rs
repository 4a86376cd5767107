//! Snapshot Codec
//!
//! A snapshot is a self-contained, ordered capture of all document-scoped
//! records at one point in time. Encoding is deterministic for a given
//! record set regardless of source map iteration order, decoding validates
//! the full payload before constructing anything, and unknown extra fields
//! on records survive a decode → encode round trip unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::{Record, RecordId, RecordScope};

/// Current snapshot schema version
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Which record scopes a snapshot capture includes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotScope {
    /// Document-scoped records only (the persistable set)
    Document,
    /// Every record, session state included; for inspection only
    All,
}

impl SnapshotScope {
    /// Whether records of the given scope are included
    #[must_use]
    pub fn includes(&self, scope: RecordScope) -> bool {
        match self {
            Self::Document => scope == RecordScope::Document,
            Self::All => true,
        }
    }
}

/// A point-in-time capture of store records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version the snapshot was written with
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Captured records, keyed and ordered by id
    pub records: BTreeMap<RecordId, Record>,
}

fn default_schema_version() -> u32 {
    SNAPSHOT_SCHEMA_VERSION
}

impl Snapshot {
    /// An empty snapshot at the current schema version
    #[must_use]
    pub fn empty() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            records: BTreeMap::new(),
        }
    }

    /// Build a snapshot from a set of records
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            records: records
                .into_iter()
                .map(|r| (r.id().clone(), r))
                .collect(),
        }
    }

    /// Number of captured records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a captured record by id
    #[must_use]
    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    /// Consume the snapshot, yielding its records in id order
    pub fn into_records(self) -> impl Iterator<Item = Record> {
        self.records.into_values()
    }

    /// Validate the snapshot against the record schema.
    ///
    /// Every entry must be keyed by its record's own id, carry an id whose
    /// prefix matches its type, and be document-scoped.
    pub fn validate(&self) -> Result<()> {
        for (key, record) in &self.records {
            if key != record.id() {
                return Err(Error::malformed(format!(
                    "snapshot key `{key}` does not match record id `{}`",
                    record.id()
                )));
            }
            record.validate_id()?;
            if record.scope() != RecordScope::Document {
                return Err(Error::malformed(format!(
                    "session-scoped record `{}` cannot appear in a snapshot",
                    record.id()
                )));
            }
        }
        Ok(())
    }

    /// Serialize to the transportable JSON form.
    ///
    /// Fails if the snapshot contains session-scoped records, so persisted
    /// payloads can never leak session state.
    pub fn encode(&self) -> Result<String> {
        self.validate()?;
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and fully validate a payload produced by [`Snapshot::encode`].
    ///
    /// Any missing required field, unknown record type tag, id mismatch, or
    /// session-scoped record fails with a malformed-snapshot error without
    /// partially constructing records.
    pub fn decode(payload: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(payload)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CameraRecord, DocumentRecord, PageRecord, ShapeRecord};
    use serde_json::json;

    fn sample_records() -> Vec<Record> {
        let page = PageRecord::new("Page 1", "a1");
        let mut shape = ShapeRecord::new(page.id.clone(), 4.0, 8.0);
        shape.props = json!({"kind": "rectangle", "w": 100, "h": 60});
        vec![
            DocumentRecord::new("Plans").into(),
            page.into(),
            shape.into(),
        ]
    }

    #[test]
    fn test_round_trip() {
        let snapshot = Snapshot::from_records(sample_records());
        let encoded = snapshot.encode().unwrap();
        let decoded = Snapshot::decode(&encoded).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_round_trip_preserves_unknown_fields() {
        let payload = json!({
            "schema_version": 1,
            "records": {
                "page:main": {
                    "type": "page",
                    "id": "page:main",
                    "name": "Main",
                    "index": "a1",
                    "locked_by": "someone-newer"
                }
            }
        })
        .to_string();

        let decoded = Snapshot::decode(&payload).unwrap();
        let reencoded = decoded.encode().unwrap();
        assert!(reencoded.contains("locked_by"));
        assert_eq!(Snapshot::decode(&reencoded).unwrap(), decoded);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let records = sample_records();
        let mut reversed = records.clone();
        reversed.reverse();

        let a = Snapshot::from_records(records).encode().unwrap();
        let b = Snapshot::from_records(reversed).encode().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_rejects_missing_required_field() {
        // Shape with no `page_id`
        let payload = json!({
            "schema_version": 1,
            "records": {
                "shape:box1": {"type": "shape", "id": "shape:box1", "x": 0.0, "y": 0.0}
            }
        })
        .to_string();

        let err = Snapshot::decode(&payload).unwrap_err();
        assert_eq!(err.code(), "malformed_snapshot");
    }

    #[test]
    fn test_decode_rejects_unknown_type_tag() {
        let payload = json!({
            "schema_version": 1,
            "records": {
                "widget:w1": {"type": "widget", "id": "widget:w1"}
            }
        })
        .to_string();

        let err = Snapshot::decode(&payload).unwrap_err();
        assert_eq!(err.code(), "malformed_snapshot");
    }

    #[test]
    fn test_decode_rejects_key_id_mismatch() {
        let payload = json!({
            "schema_version": 1,
            "records": {
                "page:one": {"type": "page", "id": "page:two", "name": "P", "index": "a1"}
            }
        })
        .to_string();

        let err = Snapshot::decode(&payload).unwrap_err();
        assert!(err.to_string().contains("does not match record id"));
    }

    #[test]
    fn test_decode_rejects_mismatched_id_prefix() {
        let payload = json!({
            "schema_version": 1,
            "records": {
                "shape:imposter": {"type": "page", "id": "shape:imposter", "name": "P", "index": "a1"}
            }
        })
        .to_string();

        assert!(Snapshot::decode(&payload).is_err());
    }

    #[test]
    fn test_encode_refuses_session_records() {
        let page = PageRecord::new("P", "a1");
        let snapshot = Snapshot::from_records([Record::from(CameraRecord::new(page.id))]);
        let err = snapshot.encode().unwrap_err();
        assert!(err.to_string().contains("session-scoped"));
    }

    #[test]
    fn test_scope_filter_includes() {
        assert!(SnapshotScope::Document.includes(RecordScope::Document));
        assert!(!SnapshotScope::Document.includes(RecordScope::Session));
        assert!(SnapshotScope::All.includes(RecordScope::Session));
    }

    #[test]
    fn test_empty_snapshot_round_trip() {
        let snapshot = Snapshot::empty();
        let decoded = Snapshot::decode(&snapshot.encode().unwrap()).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.schema_version, SNAPSHOT_SCHEMA_VERSION);
        assert_eq!(decoded.records.len(), 0);
    }
}
