//! Migration counters
//!
//! - Counters only, monotonic within a run
//! - Atomic, so the producer thread and the orchestrator can both count

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters for one migration run.
#[derive(Debug, Default)]
pub struct MigrationMetrics {
    shards_attempted: AtomicU64,
    shards_opened: AtomicU64,
    shards_failed: AtomicU64,
    shards_closed: AtomicU64,
    databases_migrated: AtomicU64,
    databases_failed: AtomicU64,
    series_migrated: AtomicU64,
    series_skipped: AtomicU64,
    query_failures: AtomicU64,
    batches_written: AtomicU64,
    points_written: AtomicU64,
    write_failures: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl MigrationMetrics {
    /// All counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// A shard directory was picked up
    pub fn increment_shards_attempted(&self) {
        bump(&self.shards_attempted);
    }

    /// A shard opened
    pub fn increment_shards_opened(&self) {
        bump(&self.shards_opened);
    }

    /// A shard failed to open
    pub fn increment_shards_failed(&self) {
        bump(&self.shards_failed);
    }

    /// A shard was released
    pub fn increment_shards_closed(&self) {
        bump(&self.shards_closed);
    }

    /// Every series of a database went through
    pub fn increment_databases_migrated(&self) {
        bump(&self.databases_migrated);
    }

    /// A database aborted
    pub fn increment_databases_failed(&self) {
        bump(&self.databases_failed);
    }

    /// A series stream drained to its end marker
    pub fn increment_series_migrated(&self) {
        bump(&self.series_migrated);
    }

    /// A series was skipped before streaming
    pub fn increment_series_skipped(&self) {
        bump(&self.series_skipped);
    }

    /// A shard query failed mid-stream
    pub fn increment_query_failures(&self) {
        bump(&self.query_failures);
    }

    /// One batch accepted by the cluster
    pub fn record_batch_written(&self, points: usize) {
        bump(&self.batches_written);
        self.points_written.fetch_add(points as u64, Ordering::Relaxed);
    }

    /// One batch rejected by the cluster
    pub fn increment_write_failures(&self) {
        bump(&self.write_failures);
    }

    /// Points accepted so far
    pub fn points_written(&self) -> u64 {
        self.points_written.load(Ordering::Relaxed)
    }

    /// Current values of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            shards_attempted: load(&self.shards_attempted),
            shards_opened: load(&self.shards_opened),
            shards_failed: load(&self.shards_failed),
            shards_closed: load(&self.shards_closed),
            databases_migrated: load(&self.databases_migrated),
            databases_failed: load(&self.databases_failed),
            series_migrated: load(&self.series_migrated),
            series_skipped: load(&self.series_skipped),
            query_failures: load(&self.query_failures),
            batches_written: load(&self.batches_written),
            points_written: load(&self.points_written),
            write_failures: load(&self.write_failures),
        }
    }
}

/// A point-in-time copy of the migration counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub shards_attempted: u64,
    pub shards_opened: u64,
    pub shards_failed: u64,
    pub shards_closed: u64,
    pub databases_migrated: u64,
    pub databases_failed: u64,
    pub series_migrated: u64,
    pub series_skipped: u64,
    pub query_failures: u64,
    pub batches_written: u64,
    pub points_written: u64,
    pub write_failures: u64,
}

impl MetricsSnapshot {
    /// Counters as log fields, in field-name order
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("batches_written", self.batches_written.to_string()),
            ("databases_failed", self.databases_failed.to_string()),
            ("databases_migrated", self.databases_migrated.to_string()),
            ("points_written", self.points_written.to_string()),
            ("query_failures", self.query_failures.to_string()),
            ("series_migrated", self.series_migrated.to_string()),
            ("series_skipped", self.series_skipped.to_string()),
            ("shards_attempted", self.shards_attempted.to_string()),
            ("shards_closed", self.shards_closed.to_string()),
            ("shards_failed", self.shards_failed.to_string()),
            ("shards_opened", self.shards_opened.to_string()),
            ("write_failures", self.write_failures.to_string()),
        ]
    }
}
