//! Query keys and invalidation tags

use crate::{TodoId, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Page size used when nothing else is configured.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Identifies one page window of the todo list.
///
/// Two keys are equal iff both `start` and `limit` are equal. `limit` is
/// always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawQueryKey")]
pub struct QueryKey {
    start: u32,
    limit: u32,
}

/// Unchecked wire form; deserialization goes through [`QueryKey::new`].
#[derive(Deserialize)]
struct RawQueryKey {
    start: u32,
    limit: u32,
}

impl TryFrom<RawQueryKey> for QueryKey {
    type Error = ValidationError;

    fn try_from(raw: RawQueryKey) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.limit)
    }
}

impl QueryKey {
    pub fn new(start: u32, limit: u32) -> Result<Self, ValidationError> {
        if limit == 0 {
            return Err(ValidationError::InvalidValue {
                field: "limit".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(Self { start, limit })
    }

    /// Window for a zero-based page index. A zero limit is clamped to one.
    pub fn page(page_index: u32, limit: u32) -> Self {
        let limit = limit.max(1);
        Self {
            start: page_index.saturating_mul(limit),
            limit,
        }
    }

    pub fn first_page(limit: u32) -> Self {
        Self::page(0, limit)
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Zero-based page index this window starts on.
    pub fn page_index(&self) -> u32 {
        self.start / self.limit
    }
}

impl Default for QueryKey {
    fn default() -> Self {
        Self::first_page(DEFAULT_PAGE_LIMIT)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "todos[{}..+{}]", self.start, self.limit)
    }
}

/// Coarse category a tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    Todo,
}

/// What within a [`TagKind`] a tag points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagId {
    Item(TodoId),
    /// The list as a whole; any creation changes it.
    List,
}

/// Label grouping cache entries for bulk invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvalidationTag {
    pub kind: TagKind,
    pub id: TagId,
}

impl InvalidationTag {
    pub fn todo_list() -> Self {
        Self {
            kind: TagKind::Todo,
            id: TagId::List,
        }
    }

    pub fn todo(id: TodoId) -> Self {
        Self {
            kind: TagKind::Todo,
            id: TagId::Item(id),
        }
    }
}

impl fmt::Display for InvalidationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            TagId::Item(id) => write!(f, "{:?}:{}", self.kind, id),
            TagId::List => write!(f, "{:?}:LIST", self.kind),
        }
    }
}
