//! Query cache with request deduplication, tag invalidation and patch
//! rollback.
//!
//! All state lives behind one mutex that is never held across an `.await`.
//! Fetches run as spawned tasks and always land in the cache, even when
//! every reader has gone away. Observers are notified after the lock is
//! released.

use crate::entry::{CacheEntry, QueryStatus};
use crate::notify::{deliver_all, CacheObserver, Notification, SubscriberId};
use crate::patch::{Mutator, PatchId, PatchLog, PatchReceipt};
use crate::tags::TagIndex;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use todoq_client::{Endpoint, ListTodos, TodoService};
use todoq_core::{CacheSettings, InvalidationTag, QueryKey, TodoError, TodoItem, TransportError};
use tokio::runtime::Handle;
use tokio::sync::watch;

/// How long an unobserved entry is kept when nothing else is configured.
pub const DEFAULT_EVICTION_GRACE: Duration = Duration::from_secs(60);

/// Configuration for the query cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Delay between an entry becoming unobserved and its eviction.
    /// `Duration::ZERO` evicts immediately.
    pub eviction_grace: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            eviction_grace: DEFAULT_EVICTION_GRACE,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eviction_grace(mut self, grace: Duration) -> Self {
        self.eviction_grace = grace;
        self
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new().with_eviction_grace(settings.eviction_grace())
    }
}

/// Counters describing cache activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from a fresh entry.
    pub hits: u64,
    /// Reads that had to start a fetch.
    pub misses: u64,
    pub fetches: u64,
    /// Reads that joined a fetch already in flight.
    pub dedup_joins: u64,
    pub invalidations: u64,
    pub patches: u64,
    pub reverts: u64,
    pub settles: u64,
    pub evictions: u64,
    pub entry_count: usize,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

type FetchDone = watch::Receiver<Option<CacheEntry>>;

struct InFlight {
    started_at: u64,
    done: FetchDone,
}

struct EntryState {
    /// Last fetched (or hydrated) truth, before patches.
    base: Option<Vec<TodoItem>>,
    patches: PatchLog,
    status: QueryStatus,
    error: Option<TodoError>,
    is_stale: bool,
    /// Invalidated while a fetch was in flight.
    refetch_on_settle: bool,
    updated_at: Option<DateTime<Utc>>,
    fetch: Option<InFlight>,
    subscribers: BTreeMap<SubscriberId, Arc<dyn CacheObserver>>,
    eviction_generation: u64,
    revision: u64,
}

impl EntryState {
    fn new() -> Self {
        Self {
            base: None,
            patches: PatchLog::default(),
            status: QueryStatus::Uninitialized,
            error: None,
            is_stale: false,
            refetch_on_settle: false,
            updated_at: None,
            fetch: None,
            subscribers: BTreeMap::new(),
            eviction_generation: 0,
            revision: 0,
        }
    }

    fn evictable(&self) -> bool {
        self.subscribers.is_empty() && self.patches.pending() == 0 && self.fetch.is_none()
    }

    fn snapshot(&self, key: QueryKey, tags: &TagIndex) -> CacheEntry {
        CacheEntry {
            key,
            data: self.base.as_deref().map(|base| self.patches.apply(base)),
            status: self.status,
            error: self.error.clone(),
            tags: tags.tags_for(key),
            subscriber_count: self.subscribers.len(),
            is_fetching: self.fetch.is_some(),
            is_stale: self.is_stale,
            pending_patches: self.patches.pending(),
            updated_at: self.updated_at,
            revision: self.revision,
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, EntryState>,
    tags: TagIndex,
    stats: CacheStats,
    seq: u64,
    revision: u64,
    next_patch: u64,
    next_subscriber: u64,
}

impl CacheState {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Record a change to `key` and capture what its observers must see.
    fn changed(&mut self, key: QueryKey) -> Option<Notification> {
        let entry = self.entries.get_mut(&key)?;
        self.revision += 1;
        entry.revision = self.revision;
        Some(Notification {
            entry: entry.snapshot(key, &self.tags),
            observers: entry.subscribers.values().cloned().collect(),
        })
    }

    fn evictable(&self, key: QueryKey) -> bool {
        self.entries.get(&key).is_some_and(EntryState::evictable)
    }

    fn evict(&mut self, key: QueryKey) {
        if self.entries.remove(&key).is_some() {
            self.tags.remove(key);
            self.stats.evictions += 1;
            tracing::debug!(key = %key, "Evicted cache entry");
        }
    }
}

struct CacheInner {
    service: Arc<dyn TodoService>,
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Query cache lock poisoned; recovering state");
            poisoned.into_inner()
        })
    }

    /// Spawn a fetch for an existing entry. The caller holds the lock.
    fn start_fetch(self: &Arc<Self>, state: &mut CacheState, key: QueryKey) -> Option<FetchDone> {
        let started_at = state.next_seq();
        let entry = state.entries.get_mut(&key)?;

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "No async runtime; fetch not started");
                entry.status = QueryStatus::Error;
                entry.error = Some(
                    TransportError::Aborted {
                        reason: err.to_string(),
                    }
                    .into(),
                );
                return None;
            }
        };

        let (tx, rx) = watch::channel(None);
        entry.fetch = Some(InFlight {
            started_at,
            done: rx.clone(),
        });
        entry.eviction_generation += 1;
        if entry.base.is_none() {
            entry.status = QueryStatus::Loading;
        }
        state.stats.fetches += 1;
        tracing::debug!(key = %key, "Starting fetch");

        let inner = Arc::clone(self);
        handle.spawn(async move {
            let result = inner.service.list_todos(key).await;
            let snapshot = inner.complete_fetch(key, result);
            let _ = tx.send(snapshot);
        });
        Some(rx)
    }

    fn complete_fetch(
        self: &Arc<Self>,
        key: QueryKey,
        result: Result<Vec<TodoItem>, TodoError>,
    ) -> Option<CacheEntry> {
        let limit = key.limit() as usize;
        let result = result.map(|mut items| {
            if items.len() > limit {
                tracing::debug!(key = %key, received = items.len(), "Truncating oversized page");
                items.truncate(limit);
            }
            items
        });
        let effect = ListTodos::cache_effect(&key, result.as_ref());

        let notification = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let entry = state.entries.get_mut(&key)?;
            let started_at = entry.fetch.take().map(|fetch| fetch.started_at).unwrap_or(0);

            match result {
                Ok(items) => {
                    tracing::debug!(key = %key, count = items.len(), "Fetch succeeded");
                    entry.base = Some(items);
                    entry.status = QueryStatus::Success;
                    entry.error = None;
                    entry.updated_at = Some(Utc::now());
                    entry.patches.drop_settled_before(started_at);
                }
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "Fetch failed");
                    entry.status = QueryStatus::Error;
                    entry.error = Some(err);
                }
            }

            let refetch = std::mem::take(&mut entry.refetch_on_settle);
            entry.is_stale = refetch;
            let observed = !entry.subscribers.is_empty();
            state.tags.tag(key, effect.tags().iter().copied());

            if refetch && observed {
                self.start_fetch(state, key);
            }
            let notification = state.changed(key);
            if state.evictable(key) {
                self.schedule_eviction(state, key);
            }
            notification
        };

        let snapshot = notification.as_ref().map(|n| n.entry.clone());
        if let Some(notification) = notification {
            notification.deliver();
        }
        snapshot
    }

    /// Evict `key` once the grace period passes, unless it is observed,
    /// patched or fetched again in the meantime.
    fn schedule_eviction(self: &Arc<Self>, state: &mut CacheState, key: QueryKey) {
        let Some(entry) = state.entries.get_mut(&key) else {
            return;
        };
        entry.eviction_generation += 1;
        let generation = entry.eviction_generation;

        let grace = self.config.eviction_grace;
        let handle = match Handle::try_current() {
            Ok(handle) if !grace.is_zero() => handle,
            _ => {
                state.evict(key);
                return;
            }
        };

        let inner = Arc::downgrade(self);
        handle.spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(inner) = inner.upgrade() {
                inner.evict_if_idle(key, generation);
            }
        });
    }

    fn evict_if_idle(&self, key: QueryKey, generation: u64) {
        let mut state = self.lock();
        let current = state
            .entries
            .get(&key)
            .is_some_and(|entry| entry.eviction_generation == generation && entry.evictable());
        if current {
            state.evict(key);
        }
    }
}

enum Lookup {
    Missing,
    InFlight(FetchDone),
    Stale,
    Fresh,
}

/// Shared handle to the query cache; clones refer to the same cache.
///
/// Reads, subscriptions and refetches spawn fetch tasks and must run inside
/// a Tokio runtime.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(service: Arc<dyn TodoService>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                service,
                config,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn with_defaults(service: Arc<dyn TodoService>) -> Self {
        Self::new(service, CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Snapshot of `key`, starting a fetch on miss or staleness.
    ///
    /// Concurrent reads of a key with a fetch in flight share that fetch.
    /// Never fails; fetch errors are recorded on the entry.
    pub fn get(&self, key: QueryKey) -> CacheEntry {
        self.read(key).0
    }

    /// Like [`get`](Self::get), then wait for the fetch it started or joined.
    pub async fn resolve(&self, key: QueryKey) -> CacheEntry {
        let (snapshot, done) = self.read(key);
        let Some(mut done) = done else {
            return snapshot;
        };
        let settled = match done.wait_for(Option::is_some).await {
            Ok(settled) => (*settled).clone().unwrap_or(snapshot),
            Err(_) => self.peek(key).unwrap_or(snapshot),
        };
        settled
    }

    fn read(&self, key: QueryKey) -> (CacheEntry, Option<FetchDone>) {
        let (snapshot, done, notification) = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;

            let lookup = match state.entries.get(&key) {
                None => Lookup::Missing,
                Some(entry) => match &entry.fetch {
                    Some(fetch) => Lookup::InFlight(fetch.done.clone()),
                    None if entry.is_stale => Lookup::Stale,
                    None => Lookup::Fresh,
                },
            };

            let (done, started) = match lookup {
                Lookup::Missing => {
                    state.entries.insert(key, EntryState::new());
                    state.stats.misses += 1;
                    (self.inner.start_fetch(state, key), true)
                }
                Lookup::Stale => {
                    state.stats.misses += 1;
                    (self.inner.start_fetch(state, key), true)
                }
                Lookup::InFlight(done) => {
                    state.stats.dedup_joins += 1;
                    tracing::debug!(key = %key, "Joined in-flight fetch");
                    (Some(done), false)
                }
                Lookup::Fresh => {
                    state.stats.hits += 1;
                    (None, false)
                }
            };

            let notification = if started { state.changed(key) } else { None };
            let snapshot = match &notification {
                Some(notification) => notification.entry.clone(),
                None => match state.entries.get(&key) {
                    Some(entry) => entry.snapshot(key, &state.tags),
                    None => return (self.detached(key), done),
                },
            };
            (snapshot, done, notification)
        };

        if let Some(notification) = notification {
            notification.deliver();
        }
        (snapshot, done)
    }

    /// Placeholder snapshot for a key with no entry.
    fn detached(&self, key: QueryKey) -> CacheEntry {
        CacheEntry {
            key,
            data: None,
            status: QueryStatus::Uninitialized,
            error: None,
            tags: Default::default(),
            subscriber_count: 0,
            is_fetching: false,
            is_stale: false,
            pending_patches: 0,
            updated_at: None,
            revision: 0,
        }
    }

    /// Snapshot of `key` without side effects.
    pub fn peek(&self, key: QueryKey) -> Option<CacheEntry> {
        let state = self.inner.lock();
        state
            .entries
            .get(&key)
            .map(|entry| entry.snapshot(key, &state.tags))
    }

    /// Overwrite the fetched truth of `key`, creating the entry if needed.
    ///
    /// Retained patches are replayed over the new data.
    pub fn set(&self, key: QueryKey, mut items: Vec<TodoItem>) {
        items.truncate(key.limit() as usize);
        let effect = ListTodos::cache_effect(&key, Ok(&items));

        let notification = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            let entry = state.entries.entry(key).or_insert_with(EntryState::new);
            entry.base = Some(items);
            entry.status = QueryStatus::Success;
            entry.error = None;
            entry.is_stale = false;
            entry.updated_at = Some(Utc::now());
            state.tags.tag(key, effect.tags().iter().copied());
            tracing::debug!(key = %key, "Set cache entry");

            let notification = state.changed(key);
            if state.evictable(key) {
                self.inner.schedule_eviction(state, key);
            }
            notification
        };
        deliver_all(notification);
    }

    /// Apply `mutator` to the data of `key` and notify observers.
    ///
    /// Returns a no-op receipt when the key has no entry or no data yet.
    pub fn patch<F>(&self, key: QueryKey, mutator: F) -> PatchReceipt
    where
        F: Fn(&mut Vec<TodoItem>) + Send + Sync + 'static,
    {
        let mutator: Mutator = Arc::new(mutator);
        let (receipt, notification) = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            let Some(entry) = state.entries.get_mut(&key).filter(|e| e.base.is_some()) else {
                tracing::debug!(key = %key, "Patch skipped; no cached data");
                return PatchReceipt::noop(key);
            };
            state.next_patch += 1;
            let id = PatchId(state.next_patch);
            entry.patches.push(id, mutator);
            entry.eviction_generation += 1;
            state.stats.patches += 1;
            tracing::debug!(key = %key, patch = id.0, "Applied patch");
            (PatchReceipt::applied(key, id), state.changed(key))
        };
        deliver_all(notification);
        receipt
    }

    /// Roll back the patch behind `receipt`. Other patches on the same entry
    /// are unaffected.
    pub fn revert(&self, receipt: PatchReceipt) -> bool {
        let Some(id) = receipt.patch_id() else {
            return false;
        };
        let key = receipt.key();
        let notification = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            let removed = state
                .entries
                .get_mut(&key)
                .is_some_and(|entry| entry.patches.remove(id));
            if !removed {
                return false;
            }
            state.stats.reverts += 1;
            tracing::debug!(key = %key, patch = id.0, "Reverted patch");

            let notification = state.changed(key);
            if state.evictable(key) {
                self.inner.schedule_eviction(state, key);
            }
            notification
        };
        deliver_all(notification);
        true
    }

    /// Mark the patch behind `receipt` confirmed. It stays visible until a
    /// fetch started after this call lands.
    pub fn settle(&self, receipt: PatchReceipt) -> bool {
        let Some(id) = receipt.patch_id() else {
            return false;
        };
        let key = receipt.key();
        let notification = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            let seq = state.next_seq();
            let settled = state
                .entries
                .get_mut(&key)
                .is_some_and(|entry| entry.patches.settle(id, seq));
            if !settled {
                return false;
            }
            state.stats.settles += 1;
            tracing::debug!(key = %key, patch = id.0, "Settled patch");

            let notification = state.changed(key);
            if state.evictable(key) {
                self.inner.schedule_eviction(state, key);
            }
            notification
        };
        deliver_all(notification);
        true
    }

    /// Mark every entry tagged with `tag` stale. Observed entries refetch
    /// now; unobserved ones refetch on their next read. Returns the number
    /// of entries affected.
    pub fn invalidate(&self, tag: InvalidationTag) -> usize {
        let notifications: Vec<_> = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            let keys = state.tags.entries_for(&tag);
            let mut notifications = Vec::with_capacity(keys.len());

            for key in &keys {
                let Some(entry) = state.entries.get_mut(key) else {
                    continue;
                };
                entry.is_stale = true;
                let in_flight = entry.fetch.is_some();
                let observed = !entry.subscribers.is_empty();
                if in_flight {
                    entry.refetch_on_settle = true;
                }
                state.stats.invalidations += 1;

                if !in_flight && observed {
                    self.inner.start_fetch(state, *key);
                }
                notifications.extend(state.changed(*key));
            }
            tracing::debug!(tag = %tag, affected = keys.len(), "Invalidated tag");
            notifications
        };
        let affected = notifications.len();
        deliver_all(notifications);
        affected
    }

    /// Force a fetch of an existing entry. A fetch already in flight is
    /// followed by one more.
    pub fn refetch(&self, key: QueryKey) -> bool {
        let notification = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            let Some(entry) = state.entries.get_mut(&key) else {
                return false;
            };
            if entry.fetch.is_some() {
                entry.refetch_on_settle = true;
            } else {
                self.inner.start_fetch(state, key);
            }
            state.changed(key)
        };
        deliver_all(notification);
        true
    }

    /// Observe `key`. Starts a fetch if the entry is new, stale or failed.
    /// The observer immediately receives the current snapshot.
    pub fn subscribe<O>(&self, key: QueryKey, observer: O) -> Subscription
    where
        O: CacheObserver + 'static,
    {
        let observer: Arc<dyn CacheObserver> = Arc::new(observer);
        let (id, notification) = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            state.next_subscriber += 1;
            let id = SubscriberId(state.next_subscriber);

            let entry = state.entries.entry(key).or_insert_with(EntryState::new);
            entry.subscribers.insert(id, observer);
            entry.eviction_generation += 1;
            let needs_fetch = entry.fetch.is_none()
                && (entry.base.is_none() || entry.is_stale || entry.status == QueryStatus::Error);

            if needs_fetch {
                state.stats.misses += 1;
                self.inner.start_fetch(state, key);
            } else {
                state.stats.hits += 1;
            }
            tracing::debug!(key = %key, subscriber = id.0, "Subscribed");
            (id, state.changed(key))
        };
        deliver_all(notification);

        Subscription {
            cache: self.clone(),
            key,
            id,
            active: true,
        }
    }

    fn unsubscribe(&self, key: QueryKey, id: SubscriberId) {
        let notification = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            let removed = state
                .entries
                .get_mut(&key)
                .is_some_and(|entry| entry.subscribers.remove(&id).is_some());
            if !removed {
                return;
            }
            tracing::debug!(key = %key, subscriber = id.0, "Unsubscribed");
            let notification = state.changed(key);
            if state.evictable(key) {
                self.inner.schedule_eviction(state, key);
            }
            notification
        };
        deliver_all(notification);
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock();
        CacheStats {
            entry_count: state.entries.len(),
            ..state.stats.clone()
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: QueryKey) -> bool {
        self.inner.lock().entries.contains_key(&key)
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.inner.config)
            .field("entries", &self.len())
            .finish()
    }
}

/// Live observation of one key. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cache: QueryCache,
    key: QueryKey,
    id: SubscriberId,
    active: bool,
}

impl Subscription {
    pub fn key(&self) -> QueryKey {
        self.key
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.active) {
            self.cache.unsubscribe(self.key, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
