//! Shard contracts used by the migration pipeline

use std::sync::Arc;

use crate::query::{QueryProcessor, QuerySpec};

use super::errors::ShardResult;

/// A legacy time-series shard.
///
/// Shards are shared between the orchestrator and the producer thread of
/// the series being migrated, hence `Send + Sync`.
pub trait Shard: Send + Sync {
    /// Shard identifier (its directory name)
    fn name(&self) -> &str;

    /// Distinct series stored for `database`.
    fn series_for_database(&self, database: &str) -> ShardResult<Vec<String>>;

    /// Executes `spec`, pushing reconstructed batches into `processor`.
    ///
    /// Stops early when the processor returns `false`. Does not call
    /// `processor.close()`.
    fn query(&self, spec: &QuerySpec, processor: &mut dyn QueryProcessor) -> ShardResult<()>;

    /// Releases the shard's cache and file handles. Idempotent.
    fn close(&self);
}

/// Opens shards by name.
pub trait ShardOpener: Send + Sync {
    /// Opens the shard stored under `name`.
    fn open(&self, name: &str) -> ShardResult<Arc<dyn Shard>>;
}
