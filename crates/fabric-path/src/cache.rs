//! Bounded cache of host-to-host paths

use crate::NodeId;
use fabric_common::MacAddr;
use moka::sync::Cache;
use std::sync::Arc;

/// (source host, destination host)
pub type PathKey = (MacAddr, MacAddr);

/// Host-pair path cache
///
/// Entries are only valid for the topology they were computed on; the owning
/// graph flushes the whole cache on every mutation.
pub struct PathCache {
    cache: Cache<PathKey, Arc<[NodeId]>>,
}

impl PathCache {
    /// Create cache with capacity
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(capacity).build();
        Self { cache }
    }

    /// Cached path for a host pair
    #[inline]
    pub fn get(&self, key: &PathKey) -> Option<Arc<[NodeId]>> {
        self.cache.get(key)
    }

    /// Insert a computed path
    #[inline]
    pub fn insert(&self, key: PathKey, path: Arc<[NodeId]>) {
        self.cache.insert(key, path);
    }

    /// Whether a host pair has a live entry
    pub fn contains(&self, key: &PathKey) -> bool {
        self.cache.contains_key(key)
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate entry count
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CACHE_CAPACITY)
    }
}
