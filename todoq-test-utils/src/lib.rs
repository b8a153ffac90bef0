//! todoq Test Utilities
//!
//! Centralized test infrastructure for the todoq workspace:
//! - An in-memory [`MockTodoService`] with call counting, failure injection
//!   and per-call hold/release control
//! - Proptest generators for todo types
//! - Test fixtures for common scenarios
//! - Custom assertions for todoq error variants

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};

pub use todoq_client::TodoService;
pub use todoq_core::{
    NewTodo, OwnerRef, PendingId, QueryKey, TodoError, TodoId, TodoItem, TodoResult,
    TodoqConfig, TransportError, ValidationError,
};

// ============================================================================
// MOCK SERVICE
// ============================================================================

#[derive(Default)]
struct MockState {
    todos: Vec<TodoItem>,
    next_id: u64,
    list_failure: Option<TodoError>,
    create_failure: Option<TodoError>,
    hold_lists: bool,
    hold_creates: bool,
    held_lists: VecDeque<oneshot::Sender<()>>,
    held_creates: BTreeMap<usize, oneshot::Sender<Option<TodoError>>>,
    create_seq: usize,
}

/// In-memory stand-in for the remote todo service.
///
/// Lists are served in stored order; successful creations are inserted at
/// the front and get the next sequential id. When holding is enabled each
/// call parks until the test releases it, so interleavings are scripted
/// rather than timed.
pub struct MockTodoService {
    state: Mutex<MockState>,
    list_calls: watch::Sender<usize>,
    create_calls: watch::Sender<usize>,
}

impl MockTodoService {
    pub fn new() -> Self {
        Self::with_todos(Vec::new())
    }

    pub fn with_todos(todos: Vec<TodoItem>) -> Self {
        let next_id = todos
            .iter()
            .filter_map(|item| item.id.as_real())
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            state: Mutex::new(MockState {
                todos,
                next_id,
                ..MockState::default()
            }),
            list_calls: watch::Sender::new(0),
            create_calls: watch::Sender::new(0),
        }
    }

    /// Service seeded with `count` todos, ids `1..=count`.
    pub fn seeded(count: u64) -> Self {
        Self::with_todos(fixtures::todos(1..=count))
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn todos(&self) -> Vec<TodoItem> {
        self.lock().todos.clone()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.borrow()
    }

    pub fn create_calls(&self) -> usize {
        *self.create_calls.borrow()
    }

    /// Fail every list call with `err` until cleared.
    pub fn fail_lists_with(&self, err: impl Into<TodoError>) {
        self.lock().list_failure = Some(err.into());
    }

    /// Fail every unheld create call with `err` until cleared.
    pub fn fail_creates_with(&self, err: impl Into<TodoError>) {
        self.lock().create_failure = Some(err.into());
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.list_failure = None;
        state.create_failure = None;
    }

    /// Park list calls until [`release_list`](Self::release_list).
    pub fn hold_lists(&self, hold: bool) {
        self.lock().hold_lists = hold;
    }

    /// Park create calls until completed or failed by call number.
    pub fn hold_creates(&self, hold: bool) {
        self.lock().hold_creates = hold;
    }

    pub fn held_lists(&self) -> usize {
        self.lock().held_lists.len()
    }

    /// Release the oldest parked list call. Its result is computed from the
    /// state at release time.
    pub fn release_list(&self) -> bool {
        let held = self.lock().held_lists.pop_front();
        match held {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub fn release_all_lists(&self) -> usize {
        let held: Vec<_> = self.lock().held_lists.drain(..).collect();
        held.into_iter().map(|tx| tx.send(())).filter(Result::is_ok).count()
    }

    /// Let parked create call `call_no` (1-based) succeed.
    pub fn complete_create(&self, call_no: usize) -> bool {
        let held = self.lock().held_creates.remove(&call_no);
        held.map(|tx| tx.send(None).is_ok()).unwrap_or(false)
    }

    /// Fail parked create call `call_no` (1-based) with `err`.
    pub fn fail_create(&self, call_no: usize, err: impl Into<TodoError>) -> bool {
        let held = self.lock().held_creates.remove(&call_no);
        held.map(|tx| tx.send(Some(err.into())).is_ok()).unwrap_or(false)
    }

    /// Wait until at least `n` list calls have started.
    pub async fn wait_for_list_calls(&self, n: usize) {
        let mut rx = self.list_calls.subscribe();
        let _ = rx.wait_for(|calls| *calls >= n).await;
    }

    /// Wait until at least `n` create calls have started.
    pub async fn wait_for_create_calls(&self, n: usize) {
        let mut rx = self.create_calls.subscribe();
        let _ = rx.wait_for(|calls| *calls >= n).await;
    }
}

impl Default for MockTodoService {
    fn default() -> Self {
        Self::new()
    }
}

fn aborted(operation: &str) -> TodoError {
    TransportError::Aborted {
        reason: format!("mock {operation} call dropped"),
    }
    .into()
}

#[async_trait]
impl TodoService for MockTodoService {
    async fn list_todos(&self, key: QueryKey) -> TodoResult<Vec<TodoItem>> {
        let held = {
            let mut state = self.lock();
            if state.hold_lists {
                let (tx, rx) = oneshot::channel();
                state.held_lists.push_back(tx);
                Some(rx)
            } else {
                None
            }
        };
        self.list_calls.send_modify(|calls| *calls += 1);

        if let Some(rx) = held {
            rx.await.map_err(|_| aborted("list"))?;
        }

        let state = self.lock();
        if let Some(err) = &state.list_failure {
            return Err(err.clone());
        }
        Ok(state
            .todos
            .iter()
            .skip(key.start() as usize)
            .take(key.limit() as usize)
            .cloned()
            .collect())
    }

    async fn create_todo(&self, new_todo: NewTodo) -> TodoResult<TodoItem> {
        let held = {
            let mut state = self.lock();
            state.create_seq += 1;
            let call_no = state.create_seq;
            if state.hold_creates {
                let (tx, rx) = oneshot::channel();
                state.held_creates.insert(call_no, tx);
                Some(rx)
            } else {
                None
            }
        };
        self.create_calls.send_modify(|calls| *calls += 1);

        let failure = match held {
            Some(rx) => rx.await.map_err(|_| aborted("create"))?,
            None => {
                let state = self.lock();
                state.create_failure.clone()
            }
        };
        if let Some(err) = failure {
            return Err(err);
        }

        let mut state = self.lock();
        let item = TodoItem {
            id: TodoId::Real(state.next_id),
            owner_ref: new_todo.owner_ref,
            title: new_todo.title,
            completed: false,
        };
        state.next_id += 1;
        state.todos.insert(0, item.clone());
        Ok(item)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for todoq types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_pending_id() -> impl Strategy<Value = PendingId> {
        any::<u128>().prop_map(|n| PendingId::from_uuid(Uuid::from_u128(n)))
    }

    pub fn arb_todo_id() -> impl Strategy<Value = TodoId> {
        prop_oneof![
            (1u64..10_000).prop_map(TodoId::Real),
            arb_pending_id().prop_map(TodoId::Pending),
        ]
    }

    /// Titles with at least one visible character.
    pub fn arb_title() -> impl Strategy<Value = String> {
        "[A-Za-z0-9][A-Za-z0-9 ]{0,30}"
    }

    /// Titles made only of whitespace, including the empty string.
    pub fn arb_blank_title() -> impl Strategy<Value = String> {
        proptest::collection::vec(prop_oneof![Just(' '), Just('\t'), Just('\n')], 0..6)
            .prop_map(|chars| chars.into_iter().collect())
    }

    pub fn arb_new_todo() -> impl Strategy<Value = NewTodo> {
        (1i64..20, arb_title()).prop_map(|(owner, title)| NewTodo::new(owner, title))
    }

    pub fn arb_todo_item() -> impl Strategy<Value = TodoItem> {
        (1u64..10_000, 1i64..20, arb_title(), any::<bool>()).prop_map(
            |(id, owner_ref, title, completed)| TodoItem {
                id: TodoId::Real(id),
                owner_ref,
                title,
                completed,
            },
        )
    }

    pub fn arb_query_key() -> impl Strategy<Value = QueryKey> {
        (0u32..20, 1u32..25).prop_map(|(page, limit)| QueryKey::page(page, limit))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common test scenarios.

    use super::*;
    use todoq_core::{ApiConfig, CacheSettings, MutationConfig, PaginationConfig};

    pub fn todo(id: u64) -> TodoItem {
        TodoItem {
            id: TodoId::Real(id),
            owner_ref: 1,
            title: format!("Todo {id}"),
            completed: id % 2 == 0,
        }
    }

    pub fn todos(ids: impl IntoIterator<Item = u64>) -> Vec<TodoItem> {
        ids.into_iter().map(todo).collect()
    }

    pub fn new_todo(title: &str) -> NewTodo {
        NewTodo::new(1, title)
    }

    /// Valid configuration pointing at a local address that is never dialed.
    pub fn test_config() -> TodoqConfig {
        TodoqConfig {
            api: ApiConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                request_timeout_ms: 1_000,
            },
            cache: CacheSettings {
                eviction_grace_ms: 60_000,
            },
            pagination: PaginationConfig {
                page_limit: 10,
                initial_page: 0,
            },
            mutation: MutationConfig { owner_ref: 1 },
        }
    }

    pub fn server_error() -> TodoError {
        TransportError::Status {
            status: 500,
            body: "Internal Server Error".to_string(),
        }
        .into()
    }

    pub fn unreachable() -> TodoError {
        TransportError::Unreachable {
            reason: "connection refused".to_string(),
        }
        .into()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for todoq-specific validation.

    use super::*;

    /// Assert that a result is a transport error.
    #[track_caller]
    pub fn assert_transport_error<T: std::fmt::Debug>(result: &TodoResult<T>) {
        match result {
            Err(TodoError::Transport(_)) => {}
            other => panic!("Expected Transport error, got: {:?}", other),
        }
    }

    /// Assert that a result is the empty-title validation error.
    #[track_caller]
    pub fn assert_empty_title<T: std::fmt::Debug>(result: &TodoResult<T>) {
        match result {
            Err(TodoError::Validation(ValidationError::EmptyTitle)) => {}
            other => panic!("Expected EmptyTitle, got: {:?}", other),
        }
    }

    /// Assert no speculative placeholder remains in `items`.
    #[track_caller]
    pub fn assert_no_pending(items: &[TodoItem]) {
        if let Some(item) = items.iter().find(|item| item.is_pending()) {
            panic!("Expected no pending items, found {}", item.id);
        }
    }

    /// Assert the items carry exactly these real ids, in order.
    #[track_caller]
    pub fn assert_ids(items: &[TodoItem], expected: &[u64]) {
        let ids: Vec<_> = items.iter().map(|item| item.id.as_real()).collect();
        let expected: Vec<_> = expected.iter().copied().map(Some).collect();
        assert_eq!(ids, expected, "Unexpected item ids");
    }
}
