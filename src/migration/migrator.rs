//! Migration orchestrator
//!
//! Shards are migrated newest first and strictly one at a time, as are the
//! databases of a shard and the series of a database. Per shard:
//!
//! ```text
//! Unopened -> Opened -> { Migrating | Aborted } -> Closed
//! ```
//!
//! A shard that fails to open is skipped. A database error abandons the
//! shard's remaining databases. Either way an opened shard is closed
//! exactly once before the next shard starts.

use std::io;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::cluster::{ClusterAdmin, ClusterConfiguration, ClusterWriter};
use crate::observability::{log_event, Event, MetricsSnapshot, MigrationMetrics};
use crate::shard::{ShardEnumerator, ShardError, ShardHandle, ShardOpener};
use crate::storage::StorageError;

use super::errors::{DatabaseFailure, MigrationError, MigrationResult};
use super::series::{migrate_series, StreamOptions};
use super::writer::MigrationWriter;

/// Drives a one-shot migration of every legacy shard into the cluster.
///
/// Re-running a migration writes every point again; no record of finished
/// shards is kept.
pub struct DataMigrator {
    enumerator: ShardEnumerator,
    opener: Arc<dyn ShardOpener>,
    cluster: Arc<ClusterConfiguration>,
    writer: MigrationWriter,
    options: StreamOptions,
    metrics: Arc<MigrationMetrics>,
    run_id: Uuid,
}

impl DataMigrator {
    /// Builds a migrator. The administrative identity is resolved here,
    /// once, from the first configured cluster admin.
    ///
    /// # Errors
    ///
    /// `Config` if the cluster has no administrators.
    pub fn new(
        enumerator: ShardEnumerator,
        opener: Arc<dyn ShardOpener>,
        cluster: Arc<ClusterConfiguration>,
        cluster_writer: Arc<dyn ClusterWriter>,
        options: StreamOptions,
    ) -> MigrationResult<Self> {
        let identity = cluster.migration_identity()?;
        let metrics = Arc::new(MigrationMetrics::new());
        Ok(Self {
            enumerator,
            opener,
            cluster,
            writer: MigrationWriter::new(cluster_writer, identity, Arc::clone(&metrics)),
            options,
            metrics,
            run_id: Uuid::new_v4(),
        })
    }

    /// Identity every write runs under
    pub fn identity(&self) -> &ClusterAdmin {
        self.writer.identity()
    }

    /// Identifier attached to this run's log lines
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Counters so far
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Migrates every shard.
    ///
    /// Only an unreadable shard root fails the run; every other failure is
    /// logged and counted, and the run carries on.
    pub async fn migrate(&self) -> MigrationResult<MetricsSnapshot> {
        let run_id = self.run_id.to_string();
        let started_at = Utc::now().to_rfc3339();
        log_event(
            Event::MigrationStart,
            &[
                ("run_id", run_id.clone()),
                ("started_at", started_at.clone()),
                ("shard_root", self.enumerator.root().display().to_string()),
                ("databases", self.cluster.databases().len().to_string()),
            ],
        );

        let shards = match self.enumerator.shards() {
            Ok(shards) => shards,
            Err(source) => {
                let err = MigrationError::Enumeration(source);
                log_event(
                    Event::MigrationAborted,
                    &[("run_id", run_id), ("error", err.to_string())],
                );
                return Err(err);
            }
        };

        for name in &shards {
            self.migrate_shard(name).await;
        }

        let snapshot = self.metrics.snapshot();
        let mut fields: Vec<(&str, String)> = vec![
            ("run_id", run_id),
            ("started_at", started_at),
            ("finished_at", Utc::now().to_rfc3339()),
        ];
        fields.extend(snapshot.to_fields());
        log_event(Event::MigrationComplete, &fields);
        Ok(snapshot)
    }

    async fn migrate_shard(&self, name: &str) {
        self.metrics.increment_shards_attempted();
        log_event(Event::ShardStart, &[("shard", name.to_string())]);

        // Opening scans every segment, so it runs on the blocking pool.
        let opened = {
            let opener = Arc::clone(&self.opener);
            let shard_name = name.to_string();
            match tokio::task::spawn_blocking(move || opener.open(&shard_name)).await {
                Ok(result) => result,
                Err(join) => Err(ShardError::open_failed(
                    name,
                    StorageError::io_error(
                        format!("open task failed: {}", join),
                        io::Error::new(io::ErrorKind::Other, join.to_string()),
                    ),
                )),
            }
        };
        let shard = match opened {
            Ok(shard) => ShardHandle::new(shard),
            Err(source) => {
                self.metrics.increment_shards_failed();
                let err = MigrationError::ShardOpen {
                    shard: name.to_string(),
                    source,
                };
                log_event(
                    Event::ShardOpenFailed,
                    &[("shard", name.to_string()), ("error", err.to_string())],
                );
                return;
            }
        };
        self.metrics.increment_shards_opened();

        for database in self.cluster.databases() {
            if let Err(err) = self.migrate_database(&shard, database).await {
                self.metrics.increment_databases_failed();
                log_event(
                    Event::DatabaseFailed,
                    &[
                        ("shard", name.to_string()),
                        ("database", database.clone()),
                        ("error", err.to_string()),
                    ],
                );
                break;
            }
            self.metrics.increment_databases_migrated();
        }

        if shard.close() {
            self.metrics.increment_shards_closed();
            log_event(Event::ShardClosed, &[("shard", name.to_string())]);
        }
    }

    async fn migrate_database(&self, shard: &ShardHandle, database: &str) -> MigrationResult<()> {
        let series_names =
            shard
                .series_for_database(database)
                .map_err(|source| MigrationError::DatabaseMigration {
                    shard: shard.name().to_string(),
                    database: database.to_string(),
                    source: DatabaseFailure::ListSeries(source),
                })?;
        log_event(
            Event::DatabaseStart,
            &[
                ("shard", shard.name().to_string()),
                ("database", database.to_string()),
                ("series", series_names.len().to_string()),
            ],
        );

        let producer_shard = shard.shared();
        for series in &series_names {
            log_event(
                Event::SeriesStart,
                &[
                    ("shard", shard.name().to_string()),
                    ("database", database.to_string()),
                    ("series", series.clone()),
                ],
            );
            match migrate_series(
                &producer_shard,
                database,
                series,
                &self.writer,
                self.options,
                &self.metrics,
            )
            .await
            {
                Ok(outcome) => {
                    self.metrics.increment_series_migrated();
                    log_event(
                        Event::SeriesComplete,
                        &[
                            ("shard", shard.name().to_string()),
                            ("database", database.to_string()),
                            ("series", series.clone()),
                            ("batches", outcome.batches.to_string()),
                            ("points", outcome.points.to_string()),
                            ("write_failures", outcome.write_failures.to_string()),
                        ],
                    );
                }
                Err(err @ MigrationError::QueryParse { .. }) => {
                    self.metrics.increment_series_skipped();
                    log_event(
                        Event::SeriesSkipped,
                        &[
                            ("shard", shard.name().to_string()),
                            ("database", database.to_string()),
                            ("series", series.clone()),
                            ("error", err.to_string()),
                        ],
                    );
                }
                Err(err) => return Err(err),
            }
        }

        log_event(
            Event::DatabaseComplete,
            &[
                ("shard", shard.name().to_string()),
                ("database", database.to_string()),
            ],
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterError;
    use crate::protocol::{FieldValue, Point, Series};
    use crate::test_support::{MockShard, MockShardOpener, RecordingWriter, Timeline};
    use std::fs;
    use tempfile::TempDir;

    fn rows(series: &str, n: usize) -> Series {
        Series::with_points(
            series,
            vec!["value".into()],
            (0..n)
                .map(|i| Point::new(i as i64, 0, vec![Some(FieldValue::Int(i as i64))]))
                .collect(),
        )
    }

    fn shard_root(names: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for name in names {
            fs::create_dir(temp_dir.path().join(name)).unwrap();
        }
        temp_dir
    }

    fn cluster(databases: &[&str]) -> Arc<ClusterConfiguration> {
        Arc::new(ClusterConfiguration::new(
            databases.iter().map(|d| d.to_string()).collect(),
            vec![ClusterAdmin::new("root"), ClusterAdmin::new("backup")],
        ))
    }

    #[test]
    fn test_no_admins_is_config_error() {
        let root = shard_root(&[]);
        let result = DataMigrator::new(
            ShardEnumerator::new(root.path()),
            Arc::new(MockShardOpener::new(Timeline::new())),
            Arc::new(ClusterConfiguration::new(vec!["db".into()], vec![])),
            Arc::new(RecordingWriter::new()),
            StreamOptions::default(),
        );
        assert!(matches!(
            result.err(),
            Some(MigrationError::Config(ClusterError::NoClusterAdmins))
        ));
    }

    #[tokio::test]
    async fn test_identity_is_first_admin_for_every_write() {
        let root = shard_root(&["1", "2"]);
        let timeline = Timeline::new();
        let opener = MockShardOpener::new(timeline.clone())
            .with_shard(MockShard::new("1").with_series("db_a", "a", vec![rows("a", 1)]))
            .with_shard(MockShard::new("2").with_series("db_a", "b", vec![rows("b", 1)]));
        let writer = Arc::new(RecordingWriter::new());

        let migrator = DataMigrator::new(
            ShardEnumerator::new(root.path()),
            Arc::new(opener),
            cluster(&["db_a"]),
            writer.clone(),
            StreamOptions::default(),
        )
        .unwrap();
        migrator.migrate().await.unwrap();

        let writes = writer.writes();
        assert_eq!(writes.len(), 2);
        assert!(writes.iter().all(|w| w.identity == "root"));
    }

    #[tokio::test]
    async fn test_missing_root_aborts_run() {
        let temp_dir = TempDir::new().unwrap();
        let timeline = Timeline::new();
        let migrator = DataMigrator::new(
            ShardEnumerator::new(temp_dir.path().join("shard_db")),
            Arc::new(MockShardOpener::new(timeline.clone())),
            cluster(&["db_a"]),
            Arc::new(RecordingWriter::new()),
            StreamOptions::default(),
        )
        .unwrap();

        let err = migrator.migrate().await.unwrap_err();
        assert!(matches!(err, MigrationError::Enumeration(_)));
        assert!(timeline.entries().is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_skips_remaining_databases() {
        let root = shard_root(&["1"]);
        let timeline = Timeline::new();
        let opener = MockShardOpener::new(timeline.clone()).with_shard(
            MockShard::new("1")
                .failing_listing("db_a")
                .with_series("db_b", "cpu", vec![rows("cpu", 1)]),
        );
        let writer = Arc::new(RecordingWriter::new());

        let migrator = DataMigrator::new(
            ShardEnumerator::new(root.path()),
            Arc::new(opener),
            cluster(&["db_a", "db_b"]),
            writer.clone(),
            StreamOptions::default(),
        )
        .unwrap();
        let snapshot = migrator.migrate().await.unwrap();

        assert!(writer.writes().is_empty());
        assert_eq!(snapshot.databases_failed, 1);
        assert_eq!(snapshot.databases_migrated, 0);
        assert_eq!(snapshot.shards_closed, 1);
        assert_eq!(timeline.entries(), vec!["open:1", "close:1"]);
    }
}
