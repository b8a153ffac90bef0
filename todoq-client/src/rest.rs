//! reqwest-backed client for the remote todo service.

use crate::endpoints::{CreateTodo, Endpoint, ListTodos, Method};
use crate::service::TodoService;
use async_trait::async_trait;
use todoq_core::{
    ApiConfig, ConfigError, NewTodo, QueryKey, TodoError, TodoItem, TodoResult, TransportError,
};

#[derive(Debug, Clone)]
pub struct RestTodoClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestTodoClient {
    pub fn new(config: &ApiConfig) -> TodoResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| ConfigError::InvalidValue {
                field: "api".to_string(),
                value: config.base_url.clone(),
                reason: err.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Dispatch any registered endpoint.
    ///
    /// Arguments rejected by [`Endpoint::request`] never reach the network.
    /// Non-2xx responses become [`TransportError::Status`]; bodies that do
    /// not decode become [`todoq_core::DecodeError`].
    pub async fn call<E: Endpoint>(&self, args: &E::Args) -> TodoResult<E::Output> {
        let spec = E::request(args)?;
        let url = self.url_for(spec.path);

        let mut request = match spec.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        tracing::debug!(endpoint = E::NAME, url = %url, "Sending request");
        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        let body = response.text().await.map_err(classify)?;

        if !status.is_success() {
            tracing::warn!(endpoint = E::NAME, status = status.as_u16(), "Request rejected");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        E::decode(&body).map_err(|err| {
            tracing::warn!(endpoint = E::NAME, error = %err, "Response did not decode");
            TodoError::from(err)
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            reason: err.to_string(),
        }
    } else {
        TransportError::Unreachable {
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl TodoService for RestTodoClient {
    async fn list_todos(&self, key: QueryKey) -> TodoResult<Vec<TodoItem>> {
        self.call::<ListTodos>(&key).await
    }

    async fn create_todo(&self, new_todo: NewTodo) -> TodoResult<TodoItem> {
        self.call::<CreateTodo>(&new_todo).await
    }
}
