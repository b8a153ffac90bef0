//! Tag-based invalidation index.
//!
//! Bidirectional map between cache keys and the tags their results provide.
//! Auxiliary only: the cache owns entry lifetimes and removes keys here on
//! eviction.

use std::collections::{HashMap, HashSet};
use todoq_core::{InvalidationTag, QueryKey};

#[derive(Debug, Default, Clone)]
pub struct TagIndex {
    by_tag: HashMap<InvalidationTag, HashSet<QueryKey>>,
    by_key: HashMap<QueryKey, HashSet<InvalidationTag>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tag set of `key`.
    pub fn tag(&mut self, key: QueryKey, tags: impl IntoIterator<Item = InvalidationTag>) {
        self.remove(key);
        let tags: HashSet<_> = tags.into_iter().collect();
        if tags.is_empty() {
            return;
        }
        for tag in &tags {
            self.by_tag.entry(*tag).or_default().insert(key);
        }
        self.by_key.insert(key, tags);
    }

    pub fn entries_for(&self, tag: &InvalidationTag) -> HashSet<QueryKey> {
        self.by_tag.get(tag).cloned().unwrap_or_default()
    }

    pub fn tags_for(&self, key: QueryKey) -> HashSet<InvalidationTag> {
        self.by_key.get(&key).cloned().unwrap_or_default()
    }

    pub fn remove(&mut self, key: QueryKey) {
        let Some(tags) = self.by_key.remove(&key) else {
            return;
        };
        for tag in tags {
            if let Some(keys) = self.by_tag.get_mut(&tag) {
                keys.remove(&key);
                if keys.is_empty() {
                    self.by_tag.remove(&tag);
                }
            }
        }
    }

    /// Number of tagged keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
