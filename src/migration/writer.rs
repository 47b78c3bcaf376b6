//! Forwards reconstructed batches to the cluster

use std::sync::Arc;

use crate::cluster::{ClusterAdmin, ClusterWriter};
use crate::observability::{log_event, Event, MigrationMetrics};
use crate::protocol::Series;

use super::errors::{MigrationError, MigrationResult};

/// Writes batches under the run's administrative identity.
///
/// Failures are logged and counted here; they are never retried. Clones
/// share the cluster writer and the counters.
#[derive(Clone)]
pub struct MigrationWriter {
    cluster: Arc<dyn ClusterWriter>,
    identity: ClusterAdmin,
    metrics: Arc<MigrationMetrics>,
}

impl MigrationWriter {
    /// Create a writer
    pub fn new(
        cluster: Arc<dyn ClusterWriter>,
        identity: ClusterAdmin,
        metrics: Arc<MigrationMetrics>,
    ) -> Self {
        Self {
            cluster,
            identity,
            metrics,
        }
    }

    /// Identity every write runs under
    pub fn identity(&self) -> &ClusterAdmin {
        &self.identity
    }

    /// Forwards one batch of `series` read from `shard` into `database`.
    pub fn write(&self, shard: &str, database: &str, batch: Series) -> MigrationResult<()> {
        let points = batch.point_count();
        let series = batch.name.clone();

        match self
            .cluster
            .write_series_data(&self.identity, database, std::slice::from_ref(&batch))
        {
            Ok(()) => {
                self.metrics.record_batch_written(points);
                Ok(())
            }
            Err(source) => {
                self.metrics.increment_write_failures();
                let err = MigrationError::Write {
                    database: database.to_string(),
                    series: series.clone(),
                    source,
                };
                log_event(
                    Event::WriteFailed,
                    &[
                        ("shard", shard.to_string()),
                        ("database", database.to_string()),
                        ("series", series),
                        ("points", points.to_string()),
                        ("error", err.to_string()),
                    ],
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FieldValue, Point};
    use crate::test_support::RecordingWriter;

    fn batch(series: &str, points: usize) -> Series {
        Series::with_points(
            series,
            vec!["value".into()],
            (0..points)
                .map(|i| Point::new(i as i64, 0, vec![Some(FieldValue::Int(1))]))
                .collect(),
        )
    }

    #[test]
    fn test_success_counts_points() {
        let recorder = Arc::new(RecordingWriter::new());
        let metrics = Arc::new(MigrationMetrics::new());
        let writer = MigrationWriter::new(recorder.clone(), ClusterAdmin::new("root"), metrics.clone());

        writer.write("1", "db_a", batch("temp", 3)).unwrap();

        let writes = recorder.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].identity, "root");
        assert_eq!(writes[0].database, "db_a");
        assert_eq!(writes[0].points, 3);
        assert_eq!(metrics.snapshot().points_written, 3);
    }

    #[test]
    fn test_failure_is_counted_not_retried() {
        let recorder = Arc::new(RecordingWriter::new().failing_series("temp"));
        let metrics = Arc::new(MigrationMetrics::new());
        let writer = MigrationWriter::new(recorder.clone(), ClusterAdmin::new("root"), metrics.clone());

        let err = writer.write("1", "db_a", batch("temp", 2)).unwrap_err();
        assert!(matches!(err, MigrationError::Write { .. }));
        assert_eq!(recorder.attempts(), 1);
        assert_eq!(metrics.snapshot().write_failures, 1);
        assert_eq!(metrics.snapshot().points_written, 0);
    }
}
