//! Options for opening a legacy store

/// Default block cache budget in bytes
pub const DEFAULT_CACHE_SIZE: usize = 8 * 1024 * 1024;

/// Default bound on simultaneously open segment handles
pub const DEFAULT_MAX_OPEN_FILES: usize = 1000;

/// Segment size after which a new segment is started
pub const DEFAULT_SEGMENT_SIZE: u64 = 4 * 1024 * 1024;

/// Options applied when a store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// LRU block cache budget in bytes
    pub cache_size: usize,
    /// Create the store directory when it does not exist
    pub create_if_missing: bool,
    /// Bound on open segment read handles
    pub max_open_files: usize,
    /// Roll to a new segment once the active one reaches this size
    pub segment_size: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            create_if_missing: false,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            segment_size: DEFAULT_SEGMENT_SIZE,
        }
    }
}

impl StoreOptions {
    /// Set the block cache budget
    pub fn with_cache_size(mut self, bytes: usize) -> Self {
        self.cache_size = bytes;
        self
    }

    /// Set create-if-missing
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Set the open handle bound
    pub fn with_max_open_files(mut self, max: usize) -> Self {
        self.max_open_files = max;
        self
    }

    /// Set the segment roll size
    pub fn with_segment_size(mut self, bytes: u64) -> Self {
        self.segment_size = bytes;
        self
    }
}
