//! Legacy shards
//!
//! A shard is one directory under `<base_dir>/shard_db`, backed by its own
//! store. The migration enumerates shard directories newest first, opens
//! each with bounded cache and handle resources, and closes it exactly once
//! when done.

mod enumerator;
mod errors;
mod handle;
pub mod keys;
mod legacy;
mod opener;
mod options;
mod traits;

pub use enumerator::{ShardEnumerator, ShardListing};
pub use errors::{Severity, ShardError, ShardErrorCode, ShardResult};
pub use handle::ShardHandle;
pub use legacy::LegacyShard;
pub use opener::{shard_root, StoreShardOpener, LEGACY_SHARD_DIR};
pub use options::{
    ShardOptions, DEFAULT_LRU_CACHE_SIZE, DEFAULT_MAX_OPEN_FILES, DEFAULT_POINT_BATCH_SIZE,
    DEFAULT_WRITE_BATCH_SIZE,
};
pub use traits::{Shard, ShardOpener};
