//! Core entity structures

use crate::{OwnerRef, PendingId, TodoId, ValidationError};
use serde::{Deserialize, Serialize};

/// A single todo record as held in the query cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: TodoId,
    #[serde(rename = "userId")]
    pub owner_ref: OwnerRef,
    pub title: String,
    pub completed: bool,
}

impl TodoItem {
    /// Build the placeholder shown while a creation is in flight.
    pub fn speculative(new_todo: &NewTodo, id: PendingId) -> Self {
        Self {
            id: TodoId::Pending(id),
            owner_ref: new_todo.owner_ref,
            title: new_todo.title.clone(),
            completed: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.id.is_pending()
    }
}

/// Payload for creating a todo. The server assigns `id` and `completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodo {
    #[serde(rename = "userId")]
    pub owner_ref: OwnerRef,
    pub title: String,
}

impl NewTodo {
    pub fn new(owner_ref: OwnerRef, title: impl Into<String>) -> Self {
        Self {
            owner_ref,
            title: title.into(),
        }
    }

    /// Reject empty or whitespace-only titles.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_titles() {
        for title in ["", " ", "\t\n"] {
            let new_todo = NewTodo::new(1, title);
            assert_eq!(new_todo.validate(), Err(ValidationError::EmptyTitle));
        }
        assert!(NewTodo::new(1, "Buy milk").validate().is_ok());
    }

    #[test]
    fn test_speculative_item_is_pending_and_open() {
        let new_todo = NewTodo::new(7, "Buy milk");
        let item = TodoItem::speculative(&new_todo, PendingId::new());
        assert!(item.is_pending());
        assert!(!item.completed);
        assert_eq!(item.owner_ref, 7);
        assert_eq!(item.title, "Buy milk");
    }

    #[test]
    fn test_new_todo_wire_shape() {
        let json = serde_json::to_value(NewTodo::new(1, "Buy milk")).unwrap();
        assert_eq!(json, serde_json::json!({ "userId": 1, "title": "Buy milk" }));
    }

    #[test]
    fn test_todo_item_round_trips_wire_fields() {
        let json = r#"{"userId":1,"id":3,"title":"fugiat veniam minus","completed":false}"#;
        let item: TodoItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, TodoId::Real(3));
        assert_eq!(item.owner_ref, 1);
    }
}
