//! Per-entry patch log.
//!
//! An entry's visible data is its fetched truth with every retained patch
//! replayed in application order. Reverting removes one patch from the log,
//! so rollbacks commute regardless of the order mutations fail in.

use std::fmt;
use std::sync::Arc;
use todoq_core::{QueryKey, TodoItem};

/// In-place edit of a cached list. Replayed whenever the truth underneath
/// changes, so it must be deterministic.
pub type Mutator = Arc<dyn Fn(&mut Vec<TodoItem>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId(pub(crate) u64);

/// Undo handle returned by [`crate::QueryCache::patch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchReceipt {
    key: QueryKey,
    patch: Option<PatchId>,
}

impl PatchReceipt {
    pub(crate) fn applied(key: QueryKey, patch: PatchId) -> Self {
        Self {
            key,
            patch: Some(patch),
        }
    }

    /// Receipt for a patch that had nothing to apply to.
    pub(crate) fn noop(key: QueryKey) -> Self {
        Self { key, patch: None }
    }

    pub fn key(&self) -> QueryKey {
        self.key
    }

    pub fn patch_id(&self) -> Option<PatchId> {
        self.patch
    }

    pub fn is_noop(&self) -> bool {
        self.patch.is_none()
    }
}

struct PatchRecord {
    id: PatchId,
    mutator: Mutator,
    /// Sequence number at confirmation.
    settled_at: Option<u64>,
}

#[derive(Default)]
pub(crate) struct PatchLog {
    records: Vec<PatchRecord>,
}

impl PatchLog {
    pub(crate) fn push(&mut self, id: PatchId, mutator: Mutator) {
        self.records.push(PatchRecord {
            id,
            mutator,
            settled_at: None,
        });
    }

    pub(crate) fn remove(&mut self, id: PatchId) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.id != id);
        self.records.len() != before
    }

    pub(crate) fn settle(&mut self, id: PatchId, seq: u64) -> bool {
        match self.records.iter_mut().find(|record| record.id == id) {
            Some(record) if record.settled_at.is_none() => {
                record.settled_at = Some(seq);
                true
            }
            _ => false,
        }
    }

    /// Drop confirmed patches whose confirmation precedes a fetch that
    /// started at `fetch_started`; that fetch's result already reflects them.
    pub(crate) fn drop_settled_before(&mut self, fetch_started: u64) -> usize {
        let before = self.records.len();
        self.records
            .retain(|record| !matches!(record.settled_at, Some(seq) if seq < fetch_started));
        before - self.records.len()
    }

    pub(crate) fn pending(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.settled_at.is_none())
            .count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn apply(&self, base: &[TodoItem]) -> Vec<TodoItem> {
        let mut data = base.to_vec();
        for record in &self.records {
            (record.mutator)(&mut data);
        }
        data
    }
}

impl fmt::Debug for PatchLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.records.iter().map(|r| (r.id, r.settled_at)))
            .finish()
    }
}
