//! Ordered key-value store over append-only segments
//!
//! Opening a store scans every segment once and builds an ordered in-memory
//! index of key -> record location. Values stay on disk and are read through
//! the block cache and the bounded handle pool.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use super::cache::BlockCache;
use super::errors::{StorageError, StorageResult};
use super::handles::FileHandlePool;
use super::options::StoreOptions;
use super::reader::{list_segments, read_record_at, SegmentReader};
use super::record::KvRecord;
use super::writer::{RecordLocation, SegmentWriter};

fn poisoned(what: &str) -> StorageError {
    StorageError::io_error(
        format!("{} lock poisoned", what),
        io::Error::new(io::ErrorKind::Other, "poisoned lock"),
    )
}

/// Iteration order for prefix scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending key order
    Forward,
    /// Descending key order
    Reverse,
}

/// A group of mutations appended and fsynced together.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    records: Vec<KvRecord>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.records.push(KvRecord::put(key, value));
    }

    /// Queue a delete
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.records.push(KvRecord::delete(key));
    }

    /// Number of queued mutations
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Point-in-time resource usage of an open store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Live keys in the index
    pub keys: usize,
    /// Segment currently appended to
    pub active_segment: u32,
    /// Bytes held by the block cache
    pub cached_bytes: usize,
    /// Segment handles currently open
    pub open_handles: usize,
}

/// Segment appended to, opened on the first write.
struct ActiveSegment {
    id: u32,
    writer: Option<SegmentWriter>,
}

/// Disk-resident ordered key-value store.
///
/// Opening only reads; no file is created in the store directory until the
/// first write.
pub struct KvStore {
    dir: PathBuf,
    options: StoreOptions,
    index: RwLock<BTreeMap<Vec<u8>, RecordLocation>>,
    active: Mutex<ActiveSegment>,
    cache: Mutex<BlockCache>,
    handles: Mutex<FileHandlePool>,
}

impl KvStore {
    /// Opens the store in `path`.
    ///
    /// # Errors
    ///
    /// - `AERO_STORE_NOT_FOUND` if the directory is missing and
    ///   `create_if_missing` is off
    /// - `AERO_STORE_CORRUPTION` if any segment fails validation
    pub fn open(path: &Path, options: StoreOptions) -> StorageResult<Self> {
        if !path.exists() {
            if !options.create_if_missing {
                return Err(StorageError::not_found(path));
            }
            fs::create_dir_all(path).map_err(|e| StorageError::io_error_at_path(path, e))?;
        } else if !path.is_dir() {
            return Err(StorageError::io_error(
                format!("Store path is not a directory: {}", path.display()),
                io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }

        let segments = list_segments(path)?;
        let mut index = BTreeMap::new();

        for &segment in &segments {
            let mut reader = SegmentReader::open(path, segment)?;
            while let Some((offset, record)) = reader.read_next()? {
                let length = record.encoded_len() as u32;
                if record.is_tombstone {
                    index.remove(&record.key);
                } else {
                    index.insert(
                        record.key,
                        RecordLocation {
                            segment,
                            offset,
                            length,
                        },
                    );
                }
            }
        }

        let active = ActiveSegment {
            id: segments.last().copied().unwrap_or(1),
            writer: None,
        };

        Ok(Self {
            dir: path.to_path_buf(),
            options,
            index: RwLock::new(index),
            active: Mutex::new(active),
            cache: Mutex::new(BlockCache::new(options.cache_size)),
            handles: Mutex::new(FileHandlePool::new(path, options.max_open_files)),
        })
    }

    /// Returns the store directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns the options the store was opened with.
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Reads the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let location = {
            let index = self.index.read().map_err(|_| poisoned("index"))?;
            index.get(key).copied()
        };
        match location {
            Some(location) => Ok(Some(self.read_value(location)?.as_ref().clone())),
            None => Ok(None),
        }
    }

    /// Stores `value` under `key`.
    pub fn put(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.write(batch)
    }

    /// Deletes `key`.
    pub fn delete(&self, key: impl Into<Vec<u8>>) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.write(batch)
    }

    /// Applies a batch with one append and one fsync.
    pub fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut active = self.active.lock().map_err(|_| poisoned("writer"))?;
        let writer = match active.writer.take() {
            Some(writer) => writer,
            None => SegmentWriter::create(&self.dir, active.id)?,
        };
        let writer = if writer.current_offset() >= self.options.segment_size {
            active.id += 1;
            SegmentWriter::create(&self.dir, active.id)?
        } else {
            writer
        };
        let writer = active.writer.insert(writer);

        let locations = writer.append(&batch.records)?;

        let mut index = self.index.write().map_err(|_| poisoned("index"))?;
        for (record, location) in batch.records.into_iter().zip(locations) {
            if record.is_tombstone {
                index.remove(&record.key);
            } else {
                index.insert(record.key, location);
            }
        }
        Ok(())
    }

    /// Collects every key that starts with `prefix`, ascending.
    pub fn keys_with_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<Vec<u8>>> {
        let index = self.index.read().map_err(|_| poisoned("index"))?;
        Ok(index
            .range::<Vec<u8>, _>((Bound::Included(prefix.to_vec()), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    /// Iterates the entries under `prefix` in the given direction.
    ///
    /// The iterator re-seeks the index after each step, so it holds no lock
    /// between calls and keeps only the current key in memory.
    pub fn iter_prefix(&self, prefix: &[u8], direction: Direction) -> PrefixIter<'_> {
        PrefixIter {
            store: self,
            prefix: prefix.to_vec(),
            direction,
            cursor: None,
            done: false,
        }
    }

    /// Returns current resource usage.
    pub fn stats(&self) -> StorageResult<StoreStats> {
        let keys = self.index.read().map_err(|_| poisoned("index"))?.len();
        let active_segment = self.active.lock().map_err(|_| poisoned("writer"))?.id;
        let cached_bytes = self.cache.lock().map_err(|_| poisoned("cache"))?.used_bytes();
        let open_handles = self.handles.lock().map_err(|_| poisoned("handles"))?.open_handles();
        Ok(StoreStats {
            keys,
            active_segment,
            cached_bytes,
            open_handles,
        })
    }

    /// Releases the block cache and every open handle.
    pub fn close(self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
        if let Ok(mut handles) = self.handles.lock() {
            handles.clear();
        }
    }

    fn read_value(&self, location: RecordLocation) -> StorageResult<Arc<Vec<u8>>> {
        let key = (location.segment, location.offset);
        if let Some(value) = self.cache.lock().map_err(|_| poisoned("cache"))?.get(&key) {
            return Ok(value);
        }

        let record = self
            .handles
            .lock()
            .map_err(|_| poisoned("handles"))?
            .with_handle(location.segment, |file| {
                read_record_at(file, location.segment, location.offset, location.length)
            })?;

        let value = Arc::new(record.value);
        self.cache
            .lock()
            .map_err(|_| poisoned("cache"))?
            .insert(key, Arc::clone(&value));
        Ok(value)
    }

    fn seek(
        &self,
        prefix: &[u8],
        cursor: Option<&Vec<u8>>,
        direction: Direction,
    ) -> StorageResult<Option<(Vec<u8>, RecordLocation)>> {
        let index = self.index.read().map_err(|_| poisoned("index"))?;
        let entry = match direction {
            Direction::Forward => {
                let start = match cursor {
                    Some(key) => Bound::Excluded(key.clone()),
                    None => Bound::Included(prefix.to_vec()),
                };
                index
                    .range::<Vec<u8>, _>((start, Bound::Unbounded))
                    .next()
                    .filter(|(key, _)| key.starts_with(prefix))
            }
            Direction::Reverse => {
                let end = match cursor {
                    Some(key) => Bound::Excluded(key.clone()),
                    None => match prefix_successor(prefix) {
                        Some(next) => Bound::Excluded(next),
                        None => Bound::Unbounded,
                    },
                };
                index
                    .range::<Vec<u8>, _>((Bound::Included(prefix.to_vec()), end))
                    .next_back()
            }
        };
        Ok(entry.map(|(key, location)| (key.clone(), *location)))
    }
}

/// Smallest key greater than every key starting with `prefix`.
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut next = prefix.to_vec();
    while let Some(last) = next.pop() {
        if last < u8::MAX {
            next.push(last + 1);
            return Some(next);
        }
    }
    None
}

/// Cursor-based iterator over one key prefix.
pub struct PrefixIter<'a> {
    store: &'a KvStore,
    prefix: Vec<u8>,
    direction: Direction,
    cursor: Option<Vec<u8>>,
    done: bool,
}

impl Iterator for PrefixIter<'_> {
    type Item = StorageResult<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let entry = match self.store.seek(&self.prefix, self.cursor.as_ref(), self.direction) {
            Ok(entry) => entry,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let (key, location) = match entry {
            Some(entry) => entry,
            None => {
                self.done = true;
                return None;
            }
        };

        self.cursor = Some(key.clone());
        match self.store.read_value(location) {
            Ok(value) => Some(Ok((key, value.as_ref().clone()))),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
