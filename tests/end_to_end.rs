//! End-to-end migration over real legacy shards
//!
//! Seeds legacy shards on disk, runs the migrator with the store-backed
//! opener and the local cluster writer, then reads the target back.

use std::sync::Arc;

use aerodb_migrate::cluster::{ClusterAdmin, ClusterConfiguration, LocalClusterWriter};
use aerodb_migrate::migration::{DataMigrator, StreamOptions};
use aerodb_migrate::protocol::{FieldValue, Point, Series};
use aerodb_migrate::query::{Query, QueryProcessor, QuerySpec};
use aerodb_migrate::shard::{
    shard_root, LegacyShard, Shard, ShardEnumerator, ShardOptions, StoreShardOpener,
};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

struct Collect(Vec<Series>);

impl QueryProcessor for Collect {
    fn yield_series(&mut self, series: Series) -> bool {
        self.0.push(series);
        true
    }

    fn close(&mut self) {}
}

fn options() -> ShardOptions {
    ShardOptions {
        point_batch_size: 3,
        write_batch_size: 4,
        ..ShardOptions::default()
    }
}

fn series(name: &str, timestamps: std::ops::Range<i64>) -> Series {
    Series::with_points(
        name,
        vec!["value".into()],
        timestamps
            .map(|ts| Point::new(ts, 1, vec![Some(FieldValue::Int(ts * 10))]))
            .collect(),
    )
}

fn seed(base: &TempDir, shard: &str, database: &str, data: &[Series]) {
    let path = shard_root(base.path()).join(shard);
    let legacy = LegacyShard::open(shard, &path, &options()).unwrap();
    for s in data {
        legacy.write_series(database, s).unwrap();
    }
    legacy.close();
}

fn read_back(shard: &LegacyShard, database: &str, name: &str) -> Vec<Point> {
    let spec = QuerySpec::new(ClusterAdmin::new("root"), database, Query::full_scan(name));
    let mut collect = Collect(Vec::new());
    shard.query(&spec, &mut collect).unwrap();
    collect.0.into_iter().flat_map(|s| s.points).collect()
}

struct Run {
    writer: Arc<LocalClusterWriter>,
    migrator: DataMigrator,
}

fn setup(base: &TempDir, target: &TempDir, databases: &[&str]) -> Run {
    let cluster = Arc::new(ClusterConfiguration::new(
        databases.iter().map(|d| d.to_string()).collect(),
        vec![ClusterAdmin::new("root")],
    ));
    let writer = Arc::new(LocalClusterWriter::new(target.path(), cluster.clone(), options()));
    let root = shard_root(base.path());
    let migrator = DataMigrator::new(
        ShardEnumerator::new(&root),
        Arc::new(StoreShardOpener::new(&root, options())),
        cluster,
        writer.clone(),
        StreamOptions {
            capacity: 2,
            max_points_per_batch: 4,
        },
    )
    .unwrap();
    Run { writer, migrator }
}

// =============================================================================
// Migration
// =============================================================================

#[tokio::test]
async fn test_points_land_in_target_database() {
    let base = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    seed(&base, "1", "db_a", &[series("cpu", 0..5)]);
    seed(&base, "2", "db_a", &[series("cpu", 5..10), series("mem", 0..3)]);

    let run = setup(&base, &target, &["db_a"]);
    let snapshot = run.migrator.migrate().await.unwrap();

    assert_eq!(snapshot.shards_opened, 2);
    assert_eq!(snapshot.shards_closed, 2);
    assert_eq!(snapshot.series_migrated, 3);
    assert_eq!(snapshot.points_written, 13);
    assert_eq!(snapshot.write_failures, 0);

    let store = run.writer.database_store("db_a").unwrap();
    let cpu = read_back(&store, "db_a", "cpu");
    // Full scans come back newest first.
    let timestamps: Vec<i64> = cpu.iter().map(|p| p.timestamp).collect();
    assert_eq!(timestamps, (0..10).rev().collect::<Vec<_>>());
    let seventh = cpu.iter().find(|p| p.timestamp == 7).unwrap();
    assert_eq!(seventh.values, vec![Some(FieldValue::Int(70))]);
    assert_eq!(read_back(&store, "db_a", "mem").len(), 3);
    assert!(target.path().join("db_a").is_dir());
}

/// Names with `\` or `"` select exactly their own series.
#[tokio::test]
async fn test_escaped_names_migrate_their_own_points() {
    let base = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    seed(
        &base,
        "1",
        "db_a",
        &[
            series(r"a\b", 0..3),
            series("ab", 10..11),
            series(r#"odd"name\"#, 0..2),
        ],
    );

    let run = setup(&base, &target, &["db_a"]);
    let snapshot = run.migrator.migrate().await.unwrap();

    assert_eq!(snapshot.series_skipped, 0);
    assert_eq!(snapshot.series_migrated, 3);
    assert_eq!(snapshot.points_written, 6);

    let store = run.writer.database_store("db_a").unwrap();
    assert_eq!(read_back(&store, "db_a", r"a\b").len(), 3);
    assert_eq!(read_back(&store, "db_a", "ab").len(), 1);
    assert_eq!(read_back(&store, "db_a", r#"odd"name\"#).len(), 2);
}

/// Databases configured in the cluster but absent from a shard migrate
/// nothing and fail nothing.
#[tokio::test]
async fn test_database_missing_from_shard_is_empty() {
    let base = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    seed(&base, "1", "db_a", &[series("cpu", 0..2)]);

    let run = setup(&base, &target, &["db_a", "db_b"]);
    let snapshot = run.migrator.migrate().await.unwrap();

    assert_eq!(snapshot.databases_migrated, 2);
    assert_eq!(snapshot.databases_failed, 0);
    assert_eq!(snapshot.points_written, 2);
    assert!(!target.path().join("db_b").exists());
}

/// No shard directory means the run aborts before any write.
#[tokio::test]
async fn test_missing_shard_root_aborts() {
    let base = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();

    let run = setup(&base, &target, &["db_a"]);
    let err = run.migrator.migrate().await.err().unwrap();

    assert!(err.is_fatal());
    assert_eq!(run.migrator.metrics().shards_attempted, 0);
}
