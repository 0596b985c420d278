//! LRU cache of parsed policies

use crate::core::acl::Policy;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Recently used policies keyed by sanitized name
pub struct PolicyCache {
    cache: Mutex<LruCache<String, Arc<Policy>>>,
}

impl PolicyCache {
    /// Create a new policy cache with given capacity (at least one entry)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        PolicyCache {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Policy>> {
        self.cache.lock().get(name).cloned()
    }

    pub fn put(&self, name: &str, policy: Arc<Policy>) {
        self.cache.lock().put(name.to_string(), policy);
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Policy>> {
        self.cache.lock().pop(name)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}
