//! Endpoint registry for the remote todo service.
//!
//! Each operation is described by data rather than generated code: how to
//! build its request, how to decode its response, and what it does to the
//! query cache (which tags it provides or invalidates). The REST client
//! dispatches any [`Endpoint`] through one generic path.

use serde::Deserialize;
use todoq_core::{
    DecodeError, InvalidationTag, NewTodo, OwnerRef, QueryKey, TodoError, TodoId, TodoItem,
};

/// HTTP method of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Transport-agnostic description of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    /// Path relative to the service base URL.
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<serde_json::Value>,
}

/// Effect an endpoint's outcome has on cached queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEffect {
    /// Attach these tags to the cached result.
    Provides(Vec<InvalidationTag>),
    /// Mark every entry carrying one of these tags stale.
    Invalidates(Vec<InvalidationTag>),
}

impl CacheEffect {
    pub fn tags(&self) -> &[InvalidationTag] {
        match self {
            Self::Provides(tags) | Self::Invalidates(tags) => tags,
        }
    }
}

/// Operation descriptor: request builder, response decoder and cache effect.
pub trait Endpoint {
    type Args;
    type Output;

    const NAME: &'static str;

    /// Build the request. Fails for arguments that must never reach the wire.
    fn request(args: &Self::Args) -> Result<RequestSpec, TodoError>;

    fn decode(body: &str) -> Result<Self::Output, DecodeError>;

    fn cache_effect(args: &Self::Args, outcome: Result<&Self::Output, &TodoError>)
        -> CacheEffect;
}

/// Wire shape of a todo record.
///
/// `completed` is optional because the service omits it when echoing a
/// freshly created record.
#[derive(Debug, Deserialize)]
struct TodoRecord {
    #[serde(rename = "userId")]
    user_id: OwnerRef,
    id: u64,
    title: String,
    #[serde(default)]
    completed: bool,
}

impl From<TodoRecord> for TodoItem {
    fn from(record: TodoRecord) -> Self {
        Self {
            id: TodoId::Real(record.id),
            owner_ref: record.user_id,
            title: record.title,
            completed: record.completed,
        }
    }
}

/// `GET /todos?_start={n}&_limit={m}`
#[derive(Debug, Clone, Copy, Default)]
pub struct ListTodos;

impl Endpoint for ListTodos {
    type Args = QueryKey;
    type Output = Vec<TodoItem>;

    const NAME: &'static str = "listTodos";

    fn request(key: &QueryKey) -> Result<RequestSpec, TodoError> {
        Ok(RequestSpec {
            method: Method::Get,
            path: "/todos",
            query: vec![
                ("_start", key.start().to_string()),
                ("_limit", key.limit().to_string()),
            ],
            body: None,
        })
    }

    fn decode(body: &str) -> Result<Vec<TodoItem>, DecodeError> {
        let records: Vec<TodoRecord> = serde_json::from_str(body)?;
        Ok(records.into_iter().map(TodoItem::from).collect())
    }

    /// One tag per item plus the list tag; failed reads still carry the list
    /// tag so a later creation refetches them.
    fn cache_effect(
        _key: &QueryKey,
        outcome: Result<&Vec<TodoItem>, &TodoError>,
    ) -> CacheEffect {
        let mut tags = Vec::new();
        if let Ok(items) = outcome {
            tags.extend(items.iter().map(|item| InvalidationTag::todo(item.id)));
        }
        tags.push(InvalidationTag::todo_list());
        CacheEffect::Provides(tags)
    }
}

/// `POST /todos` with `{userId, title}`
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateTodo;

impl Endpoint for CreateTodo {
    type Args = NewTodo;
    type Output = TodoItem;

    const NAME: &'static str = "createTodo";

    fn request(new_todo: &NewTodo) -> Result<RequestSpec, TodoError> {
        new_todo.validate()?;
        Ok(RequestSpec {
            method: Method::Post,
            path: "/todos",
            query: Vec::new(),
            body: Some(serde_json::to_value(new_todo)?),
        })
    }

    fn decode(body: &str) -> Result<TodoItem, DecodeError> {
        let record: TodoRecord = serde_json::from_str(body)?;
        Ok(record.into())
    }

    fn cache_effect(_args: &NewTodo, outcome: Result<&TodoItem, &TodoError>) -> CacheEffect {
        match outcome {
            Ok(_) => CacheEffect::Invalidates(vec![InvalidationTag::todo_list()]),
            Err(_) => CacheEffect::Invalidates(Vec::new()),
        }
    }
}
