//! todoq Core - Entity Types
//!
//! Pure data structures shared by every other crate: todo records and their
//! identifiers, query keys, invalidation tags, the error taxonomy and
//! configuration. No I/O lives here.

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;
pub mod query;

pub use config::{
    ApiConfig, CacheSettings, MutationConfig, PaginationConfig, TodoqConfig, PUBLIC_TODO_API,
};
pub use entities::{NewTodo, TodoItem};
pub use error::{
    ConfigError, DecodeError, TodoError, TodoResult, TransportError, ValidationError,
};
pub use identity::{OwnerRef, PendingId, TodoId};
pub use query::{InvalidationTag, QueryKey, TagId, TagKind, DEFAULT_PAGE_LIMIT};
