//! todoq Cache - Query Result Cache
//!
//! Holds page-window results keyed by [`todoq_core::QueryKey`]:
//! - one in-flight fetch per key, shared by concurrent readers
//! - tag-based invalidation with refetch of observed entries
//! - optimistic patches kept as a per-entry log so rollbacks commute
//! - grace-period eviction of unobserved entries
//! - synchronous change notification to subscribers

pub mod cache;
pub mod entry;
pub mod notify;
pub mod patch;
pub mod tags;

pub use cache::{CacheConfig, CacheStats, QueryCache, Subscription, DEFAULT_EVICTION_GRACE};
pub use entry::{CacheEntry, QueryStatus};
pub use notify::{CacheObserver, SubscriberId, WatchObserver};
pub use patch::{Mutator, PatchId, PatchReceipt};
pub use tags::TagIndex;
