//! Transaction Diffs
//!
//! A diff is the set of added, updated, and removed records produced by one
//! committed transaction. Diffs are the unit of notification: listeners
//! receive exactly one diff per commit, never a partial one.

use crate::record::{Record, RecordId, RecordScope};

/// The change set committed by one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    /// Store revision this diff committed as
    pub revision: u64,
    /// Records that did not exist before the transaction
    pub added: Vec<Record>,
    /// Records that changed, as (before, after) pairs
    pub updated: Vec<(Record, Record)>,
    /// Records deleted by the transaction (their final state)
    pub removed: Vec<Record>,
}

impl Diff {
    /// Whether the diff contains no changes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Total number of changed records
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }

    /// Iterate over every record touched by the diff.
    ///
    /// Updated records are visited in their after state.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.added
            .iter()
            .chain(self.updated.iter().map(|(_, after)| after))
            .chain(self.removed.iter())
    }

    /// Ids of every record touched by the diff
    pub fn touched_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.records().map(Record::id)
    }

    /// Whether any touched record belongs to the given scope
    #[must_use]
    pub fn touches_scope(&self, scope: RecordScope) -> bool {
        self.records().any(|r| r.scope() == scope)
    }
}
