//! Cache entry snapshots handed to readers and observers.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use todoq_core::{InvalidationTag, QueryKey, TodoError, TodoItem};

/// Lifecycle of a cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Uninitialized,
    /// First fetch in flight, no data yet.
    Loading,
    Success,
    /// Last fetch failed. Earlier data, if any, is retained.
    Error,
}

/// Point-in-time view of one cache entry.
///
/// `data` is the last fetched list with every retained patch replayed over
/// it in application order.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: QueryKey,
    pub data: Option<Vec<TodoItem>>,
    pub status: QueryStatus,
    pub error: Option<TodoError>,
    pub tags: HashSet<InvalidationTag>,
    pub subscriber_count: usize,
    pub is_fetching: bool,
    pub is_stale: bool,
    /// Patches applied but not yet confirmed or rolled back.
    pub pending_patches: usize,
    pub updated_at: Option<DateTime<Utc>>,
    /// Cache-wide monotonic change counter; later snapshots compare greater.
    pub revision: u64,
}

impl CacheEntry {
    pub fn items(&self) -> &[TodoItem] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}
