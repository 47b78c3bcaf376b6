//! In-memory collaborators for exercising the migration pipeline
//!
//! `MockShardOpener`, `MockShard` and `RecordingWriter` append to a shared
//! `Timeline` so tests can assert on the exact order of opens, writes and
//! closes.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::cluster::{ClusterAdmin, ClusterWriter, WriteError, WriteResult};
use crate::protocol::Series;
use crate::query::{QueryProcessor, QuerySpec};
use crate::shard::{Shard, ShardError, ShardOpener, ShardResult};
use crate::storage::StorageError;

/// Ordered log of what the doubles saw.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Timeline {
    /// Empty timeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn push(&self, entry: impl Into<String>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.into());
        }
    }

    /// Every entry so far
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Position of the first entry equal to `entry`
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

fn simulated(what: &str) -> StorageError {
    StorageError::io_error(
        format!("simulated {}", what),
        io::Error::new(io::ErrorKind::Other, "simulated"),
    )
}

/// A shard whose contents live in memory.
pub struct MockShard {
    name: String,
    series: HashMap<String, Vec<(String, Vec<Series>)>>,
    failing_listing: HashSet<String>,
    failing_queries: HashSet<String>,
    panicking_queries: HashSet<String>,
    queries: Mutex<Vec<(String, String)>>,
    closes: AtomicUsize,
    timeline: Timeline,
}

impl MockShard {
    /// Empty shard
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            series: HashMap::new(),
            failing_listing: HashSet::new(),
            failing_queries: HashSet::new(),
            panicking_queries: HashSet::new(),
            queries: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
            timeline: Timeline::new(),
        }
    }

    /// Adds a series whose query yields `batches` in order.
    pub fn with_series(mut self, database: &str, series: &str, batches: Vec<Series>) -> Self {
        self.series
            .entry(database.to_string())
            .or_default()
            .push((series.to_string(), batches));
        self
    }

    /// Listing the series of `database` fails.
    pub fn failing_listing(mut self, database: &str) -> Self {
        self.failing_listing.insert(database.to_string());
        self
    }

    /// Querying `series` yields its first batch, then fails.
    pub fn failing_query(mut self, series: &str) -> Self {
        self.failing_queries.insert(series.to_string());
        self
    }

    /// Querying `series` panics.
    pub fn panicking_query(mut self, series: &str) -> Self {
        self.panicking_queries.insert(series.to_string());
        self
    }

    fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = timeline;
        self
    }

    /// Times `close` was called
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// `(database, series)` of every query, in order
    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl Shard for MockShard {
    fn name(&self) -> &str {
        &self.name
    }

    fn series_for_database(&self, database: &str) -> ShardResult<Vec<String>> {
        if self.failing_listing.contains(database) {
            return Err(ShardError::store(&self.name, simulated("listing failure")));
        }
        Ok(self
            .series
            .get(database)
            .map(|series| series.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default())
    }

    fn query(&self, spec: &QuerySpec, processor: &mut dyn QueryProcessor) -> ShardResult<()> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push((spec.database().to_string(), spec.series().to_string()));
        }
        if self.panicking_queries.contains(spec.series()) {
            panic!("simulated panic querying {}", spec.series());
        }

        let batches = self
            .series
            .get(spec.database())
            .and_then(|series| series.iter().find(|(name, _)| name == spec.series()))
            .map(|(_, batches)| batches.clone())
            .unwrap_or_default();

        let failing = self.failing_queries.contains(spec.series());
        for batch in batches {
            if !processor.yield_series(batch) {
                return Ok(());
            }
            if failing {
                return Err(ShardError::store(&self.name, simulated("query failure")));
            }
        }
        if failing {
            return Err(ShardError::store(&self.name, simulated("query failure")));
        }
        Ok(())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.timeline.push(format!("close:{}", self.name));
    }
}

/// Hands out `MockShard`s by name.
///
/// Unknown names open as empty shards, like a store opened with
/// create-if-missing.
pub struct MockShardOpener {
    shards: Mutex<HashMap<String, Arc<MockShard>>>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    timeline: Timeline,
}

impl MockShardOpener {
    /// Opener logging to `timeline`
    pub fn new(timeline: Timeline) -> Self {
        Self {
            shards: Mutex::new(HashMap::new()),
            failing: HashSet::new(),
            panicking: HashSet::new(),
            timeline,
        }
    }

    /// Registers a shard
    pub fn with_shard(self, shard: MockShard) -> Self {
        let shard = shard.with_timeline(self.timeline.clone());
        if let Ok(mut shards) = self.shards.lock() {
            shards.insert(shard.name.clone(), Arc::new(shard));
        }
        self
    }

    /// Opening `name` fails
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Opening `name` panics
    pub fn panicking(mut self, name: &str) -> Self {
        self.panicking.insert(name.to_string());
        self
    }

    /// The shard handed out for `name`, if any
    pub fn shard(&self, name: &str) -> Option<Arc<MockShard>> {
        self.shards.lock().ok()?.get(name).cloned()
    }
}

impl ShardOpener for MockShardOpener {
    fn open(&self, name: &str) -> ShardResult<Arc<dyn Shard>> {
        if self.panicking.contains(name) {
            self.timeline.push(format!("open_failed:{}", name));
            panic!("simulated panic opening {}", name);
        }
        if self.failing.contains(name) {
            self.timeline.push(format!("open_failed:{}", name));
            return Err(ShardError::open_failed(name, simulated("open failure")));
        }
        self.timeline.push(format!("open:{}", name));

        let mut shards = self
            .shards
            .lock()
            .map_err(|_| ShardError::open_failed(name, simulated("poisoned opener")))?;
        let shard = shards
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MockShard::new(name).with_timeline(self.timeline.clone())));
        Ok(Arc::clone(shard) as Arc<dyn Shard>)
    }
}

/// One accepted write
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    /// Identity the write ran under
    pub identity: String,
    /// Target database
    pub database: String,
    /// Series name
    pub series: String,
    /// Points in the batch
    pub points: usize,
    /// The batch itself
    pub batch: Series,
}

/// A cluster writer that records every write.
#[derive(Default)]
pub struct RecordingWriter {
    writes: Mutex<Vec<RecordedWrite>>,
    attempts: AtomicUsize,
    failing_series: HashSet<String>,
    panicking_series: HashSet<String>,
    timeline: Option<Timeline>,
}

impl RecordingWriter {
    /// Writer accepting everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer that also logs accepted writes to `timeline`
    pub fn with_timeline(timeline: Timeline) -> Self {
        Self {
            timeline: Some(timeline),
            ..Self::default()
        }
    }

    /// Writes of `series` are rejected
    pub fn failing_series(mut self, series: &str) -> Self {
        self.failing_series.insert(series.to_string());
        self
    }

    /// Writes of `series` panic
    pub fn panicking_series(mut self, series: &str) -> Self {
        self.panicking_series.insert(series.to_string());
        self
    }

    /// Accepted writes, in order
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Accepted batches, in order
    pub fn batches(&self) -> Vec<Series> {
        self.writes().into_iter().map(|w| w.batch).collect()
    }

    /// Total points accepted for `database`/`series`
    pub fn points_for(&self, database: &str, series: &str) -> usize {
        self.writes()
            .iter()
            .filter(|w| w.database == database && w.series == series)
            .map(|w| w.points)
            .sum()
    }

    /// Write calls, accepted or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ClusterWriter for RecordingWriter {
    fn write_series_data(
        &self,
        identity: &ClusterAdmin,
        database: &str,
        series: &[Series],
    ) -> WriteResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(doomed) = series.iter().find(|s| self.panicking_series.contains(&s.name)) {
            panic!("simulated panic writing {}", doomed.name);
        }
        if let Some(rejected) = series.iter().find(|s| self.failing_series.contains(&s.name)) {
            return Err(WriteError::Rejected(format!("simulated rejection of {}", rejected.name)));
        }

        let mut writes = self
            .writes
            .lock()
            .map_err(|_| WriteError::Rejected("recorder lock poisoned".to_string()))?;
        for batch in series {
            if let Some(timeline) = &self.timeline {
                timeline.push(format!("write:{}/{}:{}", database, batch.name, batch.point_count()));
            }
            writes.push(RecordedWrite {
                identity: identity.name.clone(),
                database: database.to_string(),
                series: batch.name.clone(),
                points: batch.point_count(),
                batch: batch.clone(),
            });
        }
        Ok(())
    }
}
