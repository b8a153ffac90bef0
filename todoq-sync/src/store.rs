//! View-boundary facade over the cache and the mutation coordinator.

use crate::coordinator::MutationCoordinator;
use crate::view::ListView;
use std::sync::Arc;
use todoq_cache::{CacheConfig, CacheEntry, CacheObserver, QueryCache, QueryStatus, Subscription};
use todoq_client::TodoService;
use todoq_core::{NewTodo, QueryKey, TodoItem, TodoResult, TodoqConfig};
use tokio::sync::watch;

/// Publishes [`ListView`]s, ignoring snapshots older than the last one.
struct ListViewObserver {
    tx: watch::Sender<ListView>,
}

impl CacheObserver for ListViewObserver {
    fn on_change(&self, entry: &CacheEntry) {
        self.tx.send_if_modified(|current| {
            if current.revision >= entry.revision {
                return false;
            }
            *current = ListView::from(entry);
            true
        });
    }
}

/// Live view of one page window. Dropping it releases the subscription.
#[derive(Debug)]
pub struct ListObservation {
    key: QueryKey,
    rx: watch::Receiver<ListView>,
    _subscription: Subscription,
}

impl ListObservation {
    pub fn key(&self) -> QueryKey {
        self.key
    }

    pub fn current(&self) -> ListView {
        self.rx.borrow().clone()
    }

    pub fn receiver(&self) -> watch::Receiver<ListView> {
        self.rx.clone()
    }

    /// Wait for the next change. False once the cache is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Entry point for front ends: observe pages, create todos, seed and
/// refresh the cache.
#[derive(Clone, Debug)]
pub struct TodoStore {
    cache: QueryCache,
    coordinator: MutationCoordinator,
}

impl TodoStore {
    pub fn new(service: Arc<dyn TodoService>, config: &TodoqConfig) -> Self {
        let cache = QueryCache::new(
            Arc::clone(&service),
            CacheConfig::from_settings(&config.cache),
        );
        let coordinator = MutationCoordinator::new(cache.clone(), service, config.default_key());
        Self { cache, coordinator }
    }

    pub fn from_parts(cache: QueryCache, coordinator: MutationCoordinator) -> Self {
        Self { cache, coordinator }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    /// Observe the window `start..start + limit`. Fails for a zero limit.
    pub fn observe_list(&self, start: u32, limit: u32) -> TodoResult<ListObservation> {
        Ok(self.observe(QueryKey::new(start, limit)?))
    }

    pub fn observe(&self, key: QueryKey) -> ListObservation {
        let (tx, rx) = watch::channel(ListView {
            key,
            is_loading: true,
            ..ListView::default()
        });
        let subscription = self.cache.subscribe(key, ListViewObserver { tx });
        ListObservation {
            key,
            rx,
            _subscription: subscription,
        }
    }

    pub async fn submit_create(&self, new_todo: NewTodo) -> TodoResult<TodoItem> {
        self.coordinator.create(new_todo).await
    }

    /// Fetch `key` ahead of rendering and return its items.
    pub async fn prefetch(&self, key: QueryKey) -> TodoResult<Vec<TodoItem>> {
        let entry = self.cache.resolve(key).await;
        match entry.error {
            Some(err) if entry.status == QueryStatus::Error => Err(err),
            _ => Ok(entry.data.unwrap_or_default()),
        }
    }

    /// Seed `key` with items obtained elsewhere.
    pub fn hydrate(&self, key: QueryKey, items: Vec<TodoItem>) {
        self.cache.set(key, items);
    }

    /// Refetch `key`. False if nothing is cached for it.
    pub fn refresh(&self, key: QueryKey) -> bool {
        self.cache.refetch(key)
    }
}
