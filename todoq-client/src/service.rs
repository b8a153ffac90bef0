//! Service seam between the cache layer and the network.

use async_trait::async_trait;
use std::sync::Arc;
use todoq_core::{NewTodo, QueryKey, TodoItem, TodoResult};

/// Remote todo operations the cache and mutation coordinator depend on.
#[async_trait]
pub trait TodoService: Send + Sync {
    /// Read one page window, in server order.
    async fn list_todos(&self, key: QueryKey) -> TodoResult<Vec<TodoItem>>;

    /// Create a todo; the returned item carries the server-assigned id.
    async fn create_todo(&self, new_todo: NewTodo) -> TodoResult<TodoItem>;
}

#[async_trait]
impl<T: TodoService + ?Sized> TodoService for Arc<T> {
    async fn list_todos(&self, key: QueryKey) -> TodoResult<Vec<TodoItem>> {
        (**self).list_todos(key).await
    }

    async fn create_todo(&self, new_todo: NewTodo) -> TodoResult<TodoItem> {
        (**self).create_todo(new_todo).await
    }
}
