//! Per-file LRU cache of fixed-size byte blocks.

use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Counters for one open file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses satisfied by a background fetch that was already in flight
    pub prefetch_hits: u64,
    pub evictions: u64,
    /// Range requests issued, prefetches included
    pub requests: u64,
    pub bytes_fetched: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Block index -> block bytes.
///
/// Owned by a single [`RemoteFile`](crate::RemoteFile), so no locking.
pub struct BlockCache {
    blocks: LruCache<u64, Bytes>,
    stats: CacheStats,
}

impl BlockCache {
    /// Capacities of zero are raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            blocks: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Look up a block, counting a hit or a miss.
    pub fn get(&mut self, index: u64) -> Option<Bytes> {
        match self.blocks.get(&index) {
            Some(block) => {
                self.stats.hits += 1;
                Some(block.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Whether a block is resident, without touching stats or recency.
    pub fn contains(&self, index: u64) -> bool {
        self.blocks.contains(&index)
    }

    pub fn insert(&mut self, index: u64, block: Bytes) {
        if let Some((evicted, _)) = self.blocks.push(index, block) {
            if evicted != index {
                self.stats.evictions += 1;
            }
        }
    }

    pub fn record_fetch(&mut self, bytes: usize) {
        self.stats.requests += 1;
        self.stats.bytes_fetched += bytes as u64;
    }

    pub fn record_prefetch_hit(&mut self) {
        self.stats.prefetch_hits += 1;
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.blocks.cap().get()
    }
}
