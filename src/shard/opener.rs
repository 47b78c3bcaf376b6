//! Opening legacy shards from disk

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::errors::ShardResult;
use super::legacy::LegacyShard;
use super::options::ShardOptions;
use super::traits::{Shard, ShardOpener};

/// Subdirectory of the legacy data root holding one directory per shard
pub const LEGACY_SHARD_DIR: &str = "shard_db";

/// Returns `<base_dir>/shard_db`.
pub fn shard_root(base_dir: &Path) -> PathBuf {
    base_dir.join(LEGACY_SHARD_DIR)
}

/// Opens `<shard_root>/<name>` as a `LegacyShard`.
#[derive(Debug, Clone)]
pub struct StoreShardOpener {
    shard_root: PathBuf,
    options: ShardOptions,
}

impl StoreShardOpener {
    /// Create an opener for shards under `shard_root`
    pub fn new(shard_root: impl Into<PathBuf>, options: ShardOptions) -> Self {
        Self {
            shard_root: shard_root.into(),
            options,
        }
    }

    /// Directory holding the shards
    pub fn shard_root(&self) -> &Path {
        &self.shard_root
    }

    /// Options every shard is opened with
    pub fn options(&self) -> &ShardOptions {
        &self.options
    }
}

impl ShardOpener for StoreShardOpener {
    fn open(&self, name: &str) -> ShardResult<Arc<dyn Shard>> {
        let shard = LegacyShard::open(name, &self.shard_root.join(name), &self.options)?;
        Ok(Arc::new(shard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_shard_is_created_empty() {
        let temp_dir = TempDir::new().unwrap();
        let root = shard_root(temp_dir.path());
        let opener = StoreShardOpener::new(&root, ShardOptions::default());

        let shard = opener.open("00007").unwrap();
        assert_eq!(shard.name(), "00007");
        assert!(root.join("00007").is_dir());
        assert!(shard.series_for_database("db").unwrap().is_empty());
        shard.close();
    }

    #[test]
    fn test_unopenable_shard_is_open_error() {
        let temp_dir = TempDir::new().unwrap();
        let root = shard_root(temp_dir.path());
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("blocked"), b"not a directory").unwrap();

        let opener = StoreShardOpener::new(&root, ShardOptions::default());
        let err = opener.open("blocked").err().unwrap();
        assert_eq!(err.code().code(), "AERO_SHARD_OPEN_FAILED");
    }
}
