//! todoq Client - Remote Todo Service Access
//!
//! The [`TodoService`] trait is the seam the cache depends on. The
//! [`RestTodoClient`] implements it over HTTP by dispatching the endpoint
//! descriptors in [`endpoints`].

pub mod endpoints;
pub mod rest;
pub mod service;

pub use endpoints::{CacheEffect, CreateTodo, Endpoint, ListTodos, Method, RequestSpec};
pub use rest::RestTodoClient;
pub use service::TodoService;
