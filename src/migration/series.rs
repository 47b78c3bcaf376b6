//! One series: full-scan query on the blocking pool, streamed to the writer
//!
//! The producer runs the shard query into a `PassthroughEngine` and then
//! always finishes the stream, query error or not. The consumer forwards
//! each batch to the writer until it reads the end-of-stream marker, so the
//! next series never starts before this one is fully drained.

use std::sync::Arc;

use crate::observability::{log_event, Event, MigrationMetrics};
use crate::protocol::Series;
use crate::query::{
    parse_query, PassthroughEngine, QueryParseError, QuerySpec, DEFAULT_MAX_POINTS_PER_BATCH,
};
use crate::shard::{Shard, ShardError};
use crate::stream::{batch_stream, DEFAULT_STREAM_CAPACITY};

use super::errors::{DatabaseFailure, MigrationError, MigrationResult};
use super::writer::MigrationWriter;

/// Stream sizing for one series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Pending batches the stream holds before the producer blocks
    pub capacity: usize,
    /// Points per batch emitted by the passthrough engine
    pub max_points_per_batch: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_STREAM_CAPACITY,
            max_points_per_batch: DEFAULT_MAX_POINTS_PER_BATCH,
        }
    }
}

/// What happened to one series
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesOutcome {
    /// Batches received from the stream
    pub batches: usize,
    /// Points received from the stream
    pub points: usize,
    /// Batches the cluster rejected
    pub write_failures: usize,
    /// Whether the shard query failed part way
    pub query_failed: bool,
}

/// The full-scan query text for `series`.
///
/// Inside the quotes `\` and `"` are backslash-escaped, so every non-empty
/// name parses back to itself.
pub fn full_scan_query(series: &str) -> String {
    format!(
        "select * from \"{}\"",
        series.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

/// Migrates one series of `database` from `shard`.
///
/// # Errors
///
/// - `QueryParse` when the generated query does not parse (skip the series)
/// - `DatabaseMigration` when the stream breaks without its end marker
pub(crate) async fn migrate_series(
    shard: &Arc<dyn Shard>,
    database: &str,
    series: &str,
    writer: &MigrationWriter,
    options: StreamOptions,
    metrics: &MigrationMetrics,
) -> MigrationResult<SeriesOutcome> {
    let text = full_scan_query(series);
    let query = parse_query(&text).map_err(|source| MigrationError::QueryParse {
        series: series.to_string(),
        source,
    })?;
    if query.series != series {
        return Err(MigrationError::QueryParse {
            series: series.to_string(),
            source: QueryParseError::new(
                &text,
                0,
                format!("query selects \"{}\" instead of the series", query.series),
            ),
        });
    }
    let spec = QuerySpec::new(writer.identity().clone(), database, query);

    let (tx, mut rx) = batch_stream(options.capacity);
    let producer = {
        let shard = Arc::clone(shard);
        let max_points = options.max_points_per_batch;
        tokio::task::spawn_blocking(move || -> Result<(), ShardError> {
            let mut engine = PassthroughEngine::new(tx, max_points);
            let result = shard.query(&spec, &mut engine);
            if let Err(ref e) = result {
                log_event(
                    Event::QueryFailed,
                    &[
                        ("shard", shard.name().to_string()),
                        ("database", spec.database().to_string()),
                        ("series", spec.series().to_string()),
                        ("error", e.to_string()),
                    ],
                );
            }
            // Consumer gone means nobody is left to read the marker.
            let _ = engine.finish();
            result
        })
    };

    let shard_name = shard.name();
    let mut outcome = SeriesOutcome::default();
    loop {
        match rx.next().await {
            Ok(Some(batch)) => {
                outcome.batches += 1;
                outcome.points += batch.point_count();
                if !forward(writer, metrics, shard_name, database, batch).await {
                    outcome.write_failures += 1;
                }
            }
            Ok(None) => break,
            Err(_) => {
                drop(rx);
                let source = match producer.await {
                    Err(join) => DatabaseFailure::Producer {
                        series: series.to_string(),
                        reason: join.to_string(),
                    },
                    Ok(_) => DatabaseFailure::Truncated {
                        series: series.to_string(),
                    },
                };
                return Err(MigrationError::DatabaseMigration {
                    shard: shard_name.to_string(),
                    database: database.to_string(),
                    source,
                });
            }
        }
    }

    match producer.await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => {
            outcome.query_failed = true;
            metrics.increment_query_failures();
        }
        Err(join) => {
            return Err(MigrationError::DatabaseMigration {
                shard: shard_name.to_string(),
                database: database.to_string(),
                source: DatabaseFailure::Producer {
                    series: series.to_string(),
                    reason: join.to_string(),
                },
            });
        }
    }

    Ok(outcome)
}

/// Writes one batch on the blocking pool; the cluster write path fsyncs.
/// Returns whether the cluster accepted it.
async fn forward(
    writer: &MigrationWriter,
    metrics: &MigrationMetrics,
    shard: &str,
    database: &str,
    batch: Series,
) -> bool {
    let series = batch.name.clone();
    let task = {
        let writer = writer.clone();
        let shard = shard.to_string();
        let database = database.to_string();
        tokio::task::spawn_blocking(move || writer.write(&shard, &database, batch))
    };
    match task.await {
        Ok(result) => result.is_ok(),
        Err(join) => {
            metrics.increment_write_failures();
            log_event(
                Event::WriteFailed,
                &[
                    ("shard", shard.to_string()),
                    ("database", database.to_string()),
                    ("series", series),
                    ("error", format!("write task failed: {}", join)),
                ],
            );
            false
        }
    }
}
