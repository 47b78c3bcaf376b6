//! Bounded pool of open segment read handles
//!
//! At most `max_open_files` segment files are held open for reads. Opening
//! one more closes the least-recently-used handle.

use std::fs::File;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;

use super::errors::{StorageError, StorageResult};
use super::reader::segment_file_name;

/// LRU pool of read-only segment handles.
pub struct FileHandlePool {
    dir: PathBuf,
    handles: LruCache<u32, File>,
    total_opened: u64,
}

impl FileHandlePool {
    /// Create a pool for the segments of `dir`.
    pub fn new(dir: &Path, max_open_files: usize) -> Self {
        let cap = NonZeroUsize::new(max_open_files.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            dir: dir.to_path_buf(),
            handles: LruCache::new(cap),
            total_opened: 0,
        }
    }

    /// Runs `f` with an open handle for `segment`, opening it if needed.
    pub fn with_handle<T>(
        &mut self,
        segment: u32,
        f: impl FnOnce(&mut File) -> StorageResult<T>,
    ) -> StorageResult<T> {
        if !self.handles.contains(&segment) {
            let path = self.dir.join(segment_file_name(segment));
            let file = File::open(&path).map_err(|e| {
                StorageError::read_failed(format!("Failed to open segment: {}", path.display()), e)
            })?;
            self.total_opened += 1;
            // Evicted handles are dropped, which closes them.
            self.handles.push(segment, file);
        }

        match self.handles.get_mut(&segment) {
            Some(file) => f(file),
            None => Err(StorageError::read_failed(
                format!("Segment {} handle vanished from pool", segment),
                std::io::Error::new(std::io::ErrorKind::NotFound, "handle evicted"),
            )),
        }
    }

    /// Number of handles currently open
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Upper bound on open handles
    pub fn max_open_files(&self) -> usize {
        self.handles.cap().get()
    }

    /// Handles opened over the pool's lifetime
    pub fn total_opened(&self) -> u64 {
        self.total_opened
    }

    /// Closes every handle.
    pub fn clear(&mut self) {
        self.handles.clear();
    }
}
