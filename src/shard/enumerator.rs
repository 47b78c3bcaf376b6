//! Shard directory enumeration

use std::fs;
use std::path::{Path, PathBuf};

use crate::observability::{log_event, Event};

use super::errors::{ShardError, ShardResult};

/// Result of scanning a shard root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardListing {
    /// Directory names, newest first.
    pub shards: Vec<String>,
    /// Directories whose names are not valid UTF-8.
    pub unreadable: Vec<PathBuf>,
}

/// Lists shard directories under a root.
#[derive(Debug, Clone)]
pub struct ShardEnumerator {
    root: PathBuf,
}

impl ShardEnumerator {
    /// Creates an enumerator for `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The shard root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shard names in migration order: reverse listing order, so the most
    /// recently created shard comes first. Non-directories are ignored;
    /// directories with non-UTF-8 names are logged and skipped.
    ///
    /// # Errors
    ///
    /// `AERO_SHARD_ENUMERATION_FAILED` if the root cannot be read.
    pub fn shards(&self) -> ShardResult<Vec<String>> {
        let listing = self.scan()?;
        for path in &listing.unreadable {
            log_event(
                Event::ShardSkipped,
                &[
                    ("path", path.display().to_string()),
                    ("reason", "shard name is not valid UTF-8".to_string()),
                ],
            );
        }
        Ok(listing.shards)
    }

    /// Scans the root without logging.
    ///
    /// # Errors
    ///
    /// `AERO_SHARD_ENUMERATION_FAILED` if the root cannot be read.
    pub fn scan(&self) -> ShardResult<ShardListing> {
        let entries =
            fs::read_dir(&self.root).map_err(|e| ShardError::enumeration_failed(&self.root, e))?;

        let mut listing = ShardListing::default();
        for entry in entries {
            let entry = entry.map_err(|e| ShardError::enumeration_failed(&self.root, e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| ShardError::enumeration_failed(&self.root, e))?
                .is_dir();
            if !is_dir {
                continue;
            }
            match entry.file_name().to_str() {
                Some(name) => listing.shards.push(name.to_string()),
                None => listing.unreadable.push(entry.path()),
            }
        }

        listing.shards.sort();
        listing.shards.reverse();
        listing.unreadable.sort();
        Ok(listing)
    }
}
