//! LRU block cache for decoded record values
//!
//! Capacity is a byte budget. Every cached value is charged its length
//! (minimum one byte); least-recently-used values are evicted until the
//! cache fits again. Values larger than the whole budget are never cached.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

/// Cache key: (segment id, record offset)
pub type BlockKey = (u32, u64);

/// Byte-bounded LRU cache of record values.
pub struct BlockCache {
    entries: LruCache<BlockKey, Arc<Vec<u8>>>,
    capacity: usize,
    used: usize,
    hits: u64,
    misses: u64,
}

fn charge(value: &[u8]) -> usize {
    value.len().max(1)
}

impl BlockCache {
    /// Create a cache holding at most `capacity` bytes of values.
    pub fn new(capacity: usize) -> Self {
        // Entry count is bounded by the byte budget since each entry costs >= 1.
        let max_entries = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(max_entries),
            capacity,
            used: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Looks up a value, marking it most recently used.
    pub fn get(&mut self, key: &BlockKey) -> Option<Arc<Vec<u8>>> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                Some(Arc::clone(value))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts a value, evicting older entries past the byte budget.
    pub fn insert(&mut self, key: BlockKey, value: Arc<Vec<u8>>) {
        let cost = charge(&value);
        if cost > self.capacity {
            return;
        }

        if let Some(previous) = self.entries.put(key, value) {
            self.used -= charge(&previous);
        }
        self.used += cost;

        while self.used > self.capacity {
            match self.entries.pop_lru() {
                Some((_, evicted)) => self.used -= charge(&evicted),
                None => break,
            }
        }
    }

    /// Drops every cached value.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.used = 0;
    }

    /// Number of cached values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently charged against the budget
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    /// Byte budget
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lookups served from the cache
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that missed
    pub fn misses(&self) -> u64 {
        self.misses
    }
}
