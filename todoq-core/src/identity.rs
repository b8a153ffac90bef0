//! Identity types for todo items

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reference to the user owning a todo (`userId` on the wire).
pub type OwnerRef = i64;

/// Locally generated identifier for an optimistic placeholder.
///
/// Uses UUIDv7 so placeholders created in sequence sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingId(Uuid);

impl PendingId {
    /// Generate a fresh placeholder identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PendingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a todo item.
///
/// Server-assigned ids and local placeholders live in disjoint namespaces,
/// so a placeholder can never be mistaken for a real record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TodoId {
    /// Identifier assigned by the remote service.
    Real(u64),
    /// Placeholder for an item whose creation has not been confirmed.
    Pending(PendingId),
}

impl TodoId {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn as_real(&self) -> Option<u64> {
        match self {
            Self::Real(id) => Some(*id),
            Self::Pending(_) => None,
        }
    }
}

impl From<u64> for TodoId {
    fn from(id: u64) -> Self {
        Self::Real(id)
    }
}

impl From<PendingId> for TodoId {
    fn from(id: PendingId) -> Self {
        Self::Pending(id)
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(id) => write!(f, "#{}", id),
            Self::Pending(id) => write!(f, "pending:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_ids_are_unique() {
        let a = PendingId::new();
        let b = PendingId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_real_and_pending_never_collide() {
        let pending = TodoId::from(PendingId::from_uuid(Uuid::nil()));
        let real = TodoId::from(0u64);
        assert_ne!(pending, real);
        assert!(pending.is_pending());
        assert_eq!(real.as_real(), Some(0));
        assert_eq!(pending.as_real(), None);
    }

    #[test]
    fn test_todo_id_display() {
        assert_eq!(TodoId::Real(12).to_string(), "#12");
        let pending = TodoId::Pending(PendingId::from_uuid(Uuid::nil()));
        assert_eq!(
            pending.to_string(),
            "pending:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_todo_id_serde_shapes() {
        let real: TodoId = serde_json::from_str("201").unwrap();
        assert_eq!(real, TodoId::Real(201));
        assert_eq!(serde_json::to_string(&real).unwrap(), "201");

        let uuid = Uuid::now_v7();
        let pending: TodoId = serde_json::from_str(&format!("\"{}\"", uuid)).unwrap();
        assert_eq!(pending, TodoId::Pending(PendingId::from_uuid(uuid)));
    }
}
