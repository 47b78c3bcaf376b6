//! Shard resource and batching options

use serde::{Deserialize, Serialize};

use crate::storage::StoreOptions;

/// Default block cache budget per shard
pub const DEFAULT_LRU_CACHE_SIZE: usize = 2000;

/// Default bound on open segment handles per shard
pub const DEFAULT_MAX_OPEN_FILES: usize = 1000;

/// Default points per reconstructed batch
pub const DEFAULT_POINT_BATCH_SIZE: usize = 100;

/// Default points per write batch
pub const DEFAULT_WRITE_BATCH_SIZE: usize = 1_000_000;

/// How each shard is opened and how it batches reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardOptions {
    /// Block cache budget in bytes
    pub lru_cache_size: usize,
    /// Bound on simultaneously open segment handles
    pub max_open_files: usize,
    /// Points per batch handed to a query processor
    pub point_batch_size: usize,
    /// Points per store write batch
    pub write_batch_size: usize,
}

impl Default for ShardOptions {
    fn default() -> Self {
        Self {
            lru_cache_size: DEFAULT_LRU_CACHE_SIZE,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            point_batch_size: DEFAULT_POINT_BATCH_SIZE,
            write_batch_size: DEFAULT_WRITE_BATCH_SIZE,
        }
    }
}

impl ShardOptions {
    /// Store options for opening a shard. Missing directories are created.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::default()
            .with_cache_size(self.lru_cache_size)
            .with_max_open_files(self.max_open_files)
            .with_create_if_missing(true)
    }
}
