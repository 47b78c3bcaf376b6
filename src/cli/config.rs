//! Configuration file
//!
//! ```json
//! {
//!   "base_dir": "/var/lib/aerodb/legacy",
//!   "target_dir": "/var/lib/aerodb/cluster",
//!   "cluster": {
//!     "databases": ["metrics"],
//!     "cluster_admins": [{"name": "root"}]
//!   }
//! }
//! ```
//!
//! Every other field is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterConfiguration;
use crate::migration::StreamOptions;
use crate::observability::Severity;
use crate::query::DEFAULT_MAX_POINTS_PER_BATCH;
use crate::shard::{
    shard_root, ShardOptions, DEFAULT_LRU_CACHE_SIZE, DEFAULT_MAX_OPEN_FILES,
    DEFAULT_POINT_BATCH_SIZE, DEFAULT_WRITE_BATCH_SIZE,
};
use crate::stream::DEFAULT_STREAM_CAPACITY;

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Legacy data root; shards live under `<base_dir>/shard_db` (required)
    pub base_dir: String,

    /// Data root of the cluster write path (required)
    pub target_dir: String,

    /// Block cache budget per shard, in bytes
    #[serde(default = "default_lru_cache_size")]
    pub lru_cache_size: usize,

    /// Open segment handle bound per shard
    #[serde(default = "default_max_open_files")]
    pub max_open_files: usize,

    /// Points per batch read from a shard
    #[serde(default = "default_point_batch_size")]
    pub point_batch_size: usize,

    /// Points per store write batch
    #[serde(default = "default_write_batch_size")]
    pub write_batch_size: usize,

    /// Pending batches per series stream
    #[serde(default = "default_stream_capacity")]
    pub stream_capacity: usize,

    /// Points per batch forwarded to the cluster
    #[serde(default = "default_max_points_per_batch")]
    pub max_points_per_batch: usize,

    /// Minimum log severity: TRACE, INFO, WARN, ERROR or FATAL
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Live cluster snapshot (databases, admins)
    pub cluster: ClusterConfiguration,
}

fn default_lru_cache_size() -> usize {
    DEFAULT_LRU_CACHE_SIZE
}
fn default_max_open_files() -> usize {
    DEFAULT_MAX_OPEN_FILES
}
fn default_point_batch_size() -> usize {
    DEFAULT_POINT_BATCH_SIZE
}
fn default_write_batch_size() -> usize {
    DEFAULT_WRITE_BATCH_SIZE
}
fn default_stream_capacity() -> usize {
    DEFAULT_STREAM_CAPACITY
}
fn default_max_points_per_batch() -> usize {
    DEFAULT_MAX_POINTS_PER_BATCH
}
fn default_log_level() -> String {
    "INFO".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate sizes, paths, log level and the cluster snapshot
    pub fn validate(&self) -> CliResult<()> {
        if self.base_dir.is_empty() {
            return Err(CliError::config_error("base_dir must not be empty"));
        }
        if self.target_dir.is_empty() {
            return Err(CliError::config_error("target_dir must not be empty"));
        }

        let sizes = [
            ("lru_cache_size", self.lru_cache_size),
            ("max_open_files", self.max_open_files),
            ("point_batch_size", self.point_batch_size),
            ("write_batch_size", self.write_batch_size),
            ("stream_capacity", self.stream_capacity),
            ("max_points_per_batch", self.max_points_per_batch),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(CliError::config_error(format!("{} must be > 0", name)));
            }
        }

        self.log_severity()?;

        self.cluster
            .validate()
            .map_err(|e| CliError::config_error(format!("Cluster config error: {}", e)))?;

        Ok(())
    }

    /// Parsed `log_level`
    pub fn log_severity(&self) -> CliResult<Severity> {
        self.log_level
            .parse()
            .map_err(|e: String| CliError::config_error(e))
    }

    /// `<base_dir>/shard_db`
    pub fn shard_root(&self) -> PathBuf {
        shard_root(Path::new(&self.base_dir))
    }

    /// Cluster data root
    pub fn target_path(&self) -> &Path {
        Path::new(&self.target_dir)
    }

    /// Options every shard is opened with
    pub fn shard_options(&self) -> ShardOptions {
        ShardOptions {
            lru_cache_size: self.lru_cache_size,
            max_open_files: self.max_open_files,
            point_batch_size: self.point_batch_size,
            write_batch_size: self.write_batch_size,
        }
    }

    /// Per-series stream sizing
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            capacity: self.stream_capacity,
            max_points_per_batch: self.max_points_per_batch,
        }
    }
}
