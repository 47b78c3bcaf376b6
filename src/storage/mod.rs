//! Legacy key-value store backing each shard
//!
//! A disk-resident, ordered store made of append-only segment files. Each
//! store owns an LRU block cache and a bounded pool of open segment handles,
//! both released when the store is closed.
//!
//! # Design Principles
//!
//! - Append-only segments, no in-place updates
//! - Checksum-verified on every read
//! - Latest record wins for the same key; tombstones remove
//! - Ordered iteration by key, forward and reverse

mod cache;
mod checksum;
mod errors;
mod handles;
mod options;
mod reader;
mod record;
mod store;
mod writer;

pub use cache::BlockCache;
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use handles::FileHandlePool;
pub use options::{StoreOptions, DEFAULT_CACHE_SIZE, DEFAULT_MAX_OPEN_FILES, DEFAULT_SEGMENT_SIZE};
pub use reader::{list_segments, segment_file_name, SegmentReader};
pub use record::KvRecord;
pub use store::{Direction, KvStore, PrefixIter, StoreStats, WriteBatch};
pub use writer::{RecordLocation, SegmentWriter};
