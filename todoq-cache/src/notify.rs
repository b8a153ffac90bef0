//! Subscription and change notification.
//!
//! Observers are collected while the cache lock is held and invoked after it
//! is released, in subscription order, so an observer may call back into the
//! cache.

use crate::entry::CacheEntry;
use std::sync::Arc;
use tokio::sync::watch;

/// Receives a snapshot every time a subscribed entry changes.
pub trait CacheObserver: Send + Sync {
    fn on_change(&self, entry: &CacheEntry);
}

impl<F> CacheObserver for F
where
    F: Fn(&CacheEntry) + Send + Sync,
{
    fn on_change(&self, entry: &CacheEntry) {
        self(entry)
    }
}

/// Observer that publishes the latest snapshot on a `watch` channel.
///
/// Snapshots older than the one already published are ignored, so
/// deliveries racing across threads cannot move the channel backwards.
#[derive(Debug)]
pub struct WatchObserver {
    tx: watch::Sender<Option<CacheEntry>>,
}

impl WatchObserver {
    pub fn channel() -> (Self, watch::Receiver<Option<CacheEntry>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<CacheEntry>> {
        self.tx.subscribe()
    }
}

impl CacheObserver for WatchObserver {
    fn on_change(&self, entry: &CacheEntry) {
        self.tx.send_if_modified(|current| match current {
            Some(seen) if seen.revision >= entry.revision => false,
            _ => {
                *current = Some(entry.clone());
                true
            }
        });
    }
}

/// Identifies one subscription; ordering is subscription order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(crate) u64);

/// A snapshot plus the observers that must see it.
pub(crate) struct Notification {
    pub(crate) entry: CacheEntry,
    pub(crate) observers: Vec<Arc<dyn CacheObserver>>,
}

impl Notification {
    pub(crate) fn deliver(self) {
        for observer in &self.observers {
            observer.on_change(&self.entry);
        }
    }
}

pub(crate) fn deliver_all(notifications: impl IntoIterator<Item = Notification>) {
    for notification in notifications {
        notification.deliver();
    }
}
