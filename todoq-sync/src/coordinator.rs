//! Optimistic mutation coordinator.
//!
//! # State Transition Diagram
//!
//! ```text
//! create() → Idle ── patch ──→ Applying ──┬── service ok  ─→ Settled(Confirmed)  → invalidate tags
//!              │                          └── service err ─→ Settled(RolledBack) → revert patch
//!              └── invalid title → error, nothing touched
//! ```
//!
//! The service call and the settlement run in a spawned task, so a caller
//! that stops waiting never strands a speculative item in the cache.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use todoq_cache::{PatchReceipt, QueryCache};
use todoq_client::{CreateTodo, Endpoint, TodoService};
use todoq_core::{NewTodo, PendingId, QueryKey, TodoItem, TodoResult, TransportError};

/// How an applied mutation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Settlement {
    Confirmed,
    RolledBack,
}

/// Lifecycle of one optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationState {
    Idle,
    /// Speculative patch visible, service call in flight.
    Applying,
    Settled(Settlement),
}

impl MutationState {
    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, MutationState::Settled(_))
    }
}

impl fmt::Display for MutationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationState::Idle => write!(f, "Idle"),
            MutationState::Applying => write!(f, "Applying"),
            MutationState::Settled(Settlement::Confirmed) => write!(f, "Confirmed"),
            MutationState::Settled(Settlement::RolledBack) => write!(f, "RolledBack"),
        }
    }
}

/// A creation whose speculative item is in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    pub mutation_id: PendingId,
    pub receipt: PatchReceipt,
    pub state: MutationState,
    pub new_todo: NewTodo,
}

/// Mutator that prepends `item` and keeps the page at `limit` items.
pub fn insert_speculative(
    item: TodoItem,
    limit: usize,
) -> impl Fn(&mut Vec<TodoItem>) + Send + Sync + 'static {
    let limit = limit.max(1);
    move |items: &mut Vec<TodoItem>| {
        items.insert(0, item.clone());
        items.truncate(limit);
    }
}

/// Applies creations optimistically to one target page window.
#[derive(Clone)]
pub struct MutationCoordinator {
    cache: QueryCache,
    service: Arc<dyn TodoService>,
    target: QueryKey,
    pending: Arc<Mutex<BTreeMap<PendingId, PendingMutation>>>,
}

impl MutationCoordinator {
    pub fn new(cache: QueryCache, service: Arc<dyn TodoService>, target: QueryKey) -> Self {
        Self {
            cache,
            service,
            target,
            pending: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn target(&self) -> QueryKey {
        self.target
    }

    fn lock_pending(&self) -> MutexGuard<'_, BTreeMap<PendingId, PendingMutation>> {
        self.pending.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Pending mutation registry poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Number of mutations currently `Applying`.
    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    /// Mutations currently `Applying`, oldest first.
    pub fn pending(&self) -> Vec<PendingMutation> {
        self.lock_pending().values().cloned().collect()
    }

    /// Create a todo with an optimistic insert into the target page.
    ///
    /// Invalid input fails before the cache or the network is touched. A
    /// failed service call reverts the insert and returns the error.
    pub async fn create(&self, new_todo: NewTodo) -> TodoResult<TodoItem> {
        new_todo.validate()?;

        let mutation_id = PendingId::new();
        let placeholder = TodoItem::speculative(&new_todo, mutation_id);
        let receipt = self.cache.patch(
            self.target,
            insert_speculative(placeholder, self.target.limit() as usize),
        );
        self.lock_pending().insert(
            mutation_id,
            PendingMutation {
                mutation_id,
                receipt,
                state: MutationState::Applying,
                new_todo: new_todo.clone(),
            },
        );
        tracing::debug!(
            mutation = %mutation_id,
            key = %self.target,
            applied = !receipt.is_noop(),
            "Applied optimistic insert"
        );

        let task = {
            let this = self.clone();
            tokio::spawn(async move {
                let result = this.service.create_todo(new_todo.clone()).await;
                this.settle(mutation_id, &new_todo, result)
            })
        };

        match task.await {
            Ok(result) => result,
            Err(err) => {
                let new_todo = self
                    .lock_pending()
                    .get(&mutation_id)
                    .map(|pending| pending.new_todo.clone());
                let aborted = TransportError::Aborted {
                    reason: err.to_string(),
                };
                match new_todo {
                    Some(new_todo) => self.settle(mutation_id, &new_todo, Err(aborted.into())),
                    None => Err(aborted.into()),
                }
            }
        }
    }

    fn settle(
        &self,
        mutation_id: PendingId,
        new_todo: &NewTodo,
        result: TodoResult<TodoItem>,
    ) -> TodoResult<TodoItem> {
        let Some(mut pending) = self.lock_pending().remove(&mutation_id) else {
            return result;
        };
        let effect = CreateTodo::cache_effect(new_todo, result.as_ref());

        match &result {
            Ok(item) => {
                self.cache.settle(pending.receipt);
                pending.state = MutationState::Settled(Settlement::Confirmed);
                tracing::info!(
                    mutation = %mutation_id,
                    id = %item.id,
                    state = %pending.state,
                    "Creation confirmed"
                );
                for tag in effect.tags() {
                    self.cache.invalidate(*tag);
                }
            }
            Err(err) => {
                self.cache.revert(pending.receipt);
                pending.state = MutationState::Settled(Settlement::RolledBack);
                tracing::warn!(
                    mutation = %mutation_id,
                    error = %err,
                    state = %pending.state,
                    "Creation failed; rolled back"
                );
            }
        }
        result
    }
}

impl fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("target", &self.target)
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todoq_test_utils::fixtures;

    #[test]
    fn test_insert_speculative_prepends_and_truncates() {
        let placeholder = TodoItem::speculative(&fixtures::new_todo("new"), PendingId::new());
        let insert = insert_speculative(placeholder.clone(), 3);

        let mut full = fixtures::todos(1..=3);
        insert(&mut full);
        assert_eq!(full.len(), 3);
        assert_eq!(full[0], placeholder);
        assert_eq!(full[2].id.as_real(), Some(2));

        let mut short = fixtures::todos(1..=1);
        insert(&mut short);
        assert_eq!(short.len(), 2);
    }

    #[test]
    fn test_mutation_state_terminal() {
        assert!(!MutationState::Idle.is_terminal());
        assert!(!MutationState::Applying.is_terminal());
        assert!(MutationState::Settled(Settlement::Confirmed).is_terminal());
        assert_eq!(
            MutationState::Settled(Settlement::RolledBack).to_string(),
            "RolledBack"
        );
    }
}
