//! Query result processors
//!
//! A shard pushes reconstructed batches into a `QueryProcessor`. The
//! passthrough engine re-emits every point unchanged into a batch stream,
//! coalescing consecutive batches of the same series and columns.

use crate::protocol::Series;
use crate::stream::{BatchSender, StreamResult};

/// Default number of points per emitted batch
pub const DEFAULT_MAX_POINTS_PER_BATCH: usize = 2000;

/// Sink for the batches a shard produces while executing a query.
pub trait QueryProcessor: Send {
    /// Accepts one batch. Returns `false` when no further batches are wanted.
    fn yield_series(&mut self, series: Series) -> bool;

    /// Flushes anything buffered. Called once after the last batch.
    fn close(&mut self);
}

/// Forwards every point into a batch stream.
///
/// Sends block while the stream is full, so the engine must run on a
/// thread that may block.
pub struct PassthroughEngine {
    sender: BatchSender,
    max_points_per_batch: usize,
    pending: Option<Series>,
    disconnected: bool,
    batches_sent: usize,
    points_sent: usize,
}

impl PassthroughEngine {
    /// Create an engine emitting batches of at most `max_points_per_batch`.
    pub fn new(sender: BatchSender, max_points_per_batch: usize) -> Self {
        Self {
            sender,
            max_points_per_batch: max_points_per_batch.max(1),
            pending: None,
            disconnected: false,
            batches_sent: 0,
            points_sent: 0,
        }
    }

    /// Batches emitted so far
    pub fn batches_sent(&self) -> usize {
        self.batches_sent
    }

    /// Points emitted so far
    pub fn points_sent(&self) -> usize {
        self.points_sent
    }

    /// Whether the consumer went away
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Flushes, then enqueues the end-of-stream marker.
    pub fn finish(mut self) -> StreamResult<()> {
        self.close();
        self.sender.finish()
    }

    fn emit(&mut self, series: Series) {
        if self.disconnected {
            return;
        }
        let points = series.point_count();
        match self.sender.send_blocking(series) {
            Ok(()) => {
                self.batches_sent += 1;
                self.points_sent += points;
            }
            Err(_) => self.disconnected = true,
        }
    }

    fn flush(&mut self) {
        if let Some(series) = self.pending.take() {
            if !series.points.is_empty() {
                self.emit(series);
            }
        }
    }
}

impl QueryProcessor for PassthroughEngine {
    fn yield_series(&mut self, series: Series) -> bool {
        if self.disconnected {
            return false;
        }
        if series.points.is_empty() {
            return true;
        }

        let compatible = self
            .pending
            .as_ref()
            .map_or(false, |pending| pending.same_shape(&series));
        if !compatible {
            self.flush();
        }

        let pending = self
            .pending
            .get_or_insert_with(|| Series::new(series.name.clone(), series.fields.clone()));
        pending.points.extend(series.points);

        while self
            .pending
            .as_ref()
            .map_or(false, |p| p.point_count() >= self.max_points_per_batch)
        {
            if let Some(full) = self.pending.as_mut() {
                let rest = full.points.split_off(self.max_points_per_batch);
                let chunk = Series::with_points(full.name.clone(), full.fields.clone(), rest);
                let head = std::mem::replace(full, chunk);
                self.emit(head);
            }
            if self.disconnected {
                return false;
            }
        }

        !self.disconnected
    }

    fn close(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FieldValue, Point};
    use crate::stream::batch_stream;

    fn series(name: &str, fields: &[&str], timestamps: std::ops::Range<i64>) -> Series {
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        let points = timestamps
            .map(|ts| Point::new(ts, 0, vec![Some(FieldValue::Int(ts)); fields.len()]))
            .collect();
        Series::with_points(name, fields, points)
    }

    #[test]
    fn test_coalesces_same_shape_batches() {
        let (tx, mut rx) = batch_stream(16);
        let mut engine = PassthroughEngine::new(tx, 100);

        assert!(engine.yield_series(series("cpu", &["value"], 0..3)));
        assert!(engine.yield_series(series("cpu", &["value"], 3..5)));
        engine.finish().unwrap();

        let batch = rx.blocking_next().unwrap().unwrap();
        assert_eq!(batch.point_count(), 5);
        assert!(rx.blocking_next().unwrap().is_none());
    }

    #[test]
    fn test_splits_at_max_points() {
        let (tx, mut rx) = batch_stream(16);
        let mut engine = PassthroughEngine::new(tx, 4);

        engine.yield_series(series("cpu", &["value"], 0..10));
        assert_eq!(engine.batches_sent(), 2);
        engine.finish().unwrap();

        let sizes: Vec<usize> = std::iter::from_fn(|| rx.blocking_next().unwrap())
            .map(|s| s.point_count())
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_shape_change_flushes() {
        let (tx, mut rx) = batch_stream(16);
        let mut engine = PassthroughEngine::new(tx, 100);

        engine.yield_series(series("cpu", &["value"], 0..2));
        engine.yield_series(series("cpu", &["value", "host"], 2..3));
        engine.finish().unwrap();

        let first = rx.blocking_next().unwrap().unwrap();
        let second = rx.blocking_next().unwrap().unwrap();
        assert_eq!(first.fields, vec!["value".to_string()]);
        assert_eq!(second.fields.len(), 2);
        assert!(rx.blocking_next().unwrap().is_none());
    }

    #[test]
    fn test_point_order_preserved() {
        let (tx, mut rx) = batch_stream(16);
        let mut engine = PassthroughEngine::new(tx, 3);

        engine.yield_series(series("cpu", &["value"], 0..7));
        engine.finish().unwrap();

        let timestamps: Vec<i64> = std::iter::from_fn(|| rx.blocking_next().unwrap())
            .flat_map(|s| s.points.into_iter().map(|p| p.timestamp))
            .collect();
        assert_eq!(timestamps, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_dropped_consumer_stops_production() {
        let (tx, rx) = batch_stream(4);
        drop(rx);
        let mut engine = PassthroughEngine::new(tx, 1);

        assert!(!engine.yield_series(series("cpu", &["value"], 0..3)));
        assert!(engine.is_disconnected());
        assert!(!engine.yield_series(series("cpu", &["value"], 3..4)));
    }

    #[test]
    fn test_empty_batches_are_ignored() {
        let (tx, mut rx) = batch_stream(4);
        let mut engine = PassthroughEngine::new(tx, 10);

        assert!(engine.yield_series(Series::new("cpu", vec!["value".into()])));
        engine.finish().unwrap();
        assert!(rx.blocking_next().unwrap().is_none());
    }
}
