//! Bounded batch stream with an explicit end-of-stream marker
//!
//! One producer pushes reconstructed series batches, one consumer drains
//! them. The channel holds at most `capacity` pending responses, so a slow
//! consumer blocks the producer instead of growing memory.
//!
//! Termination is explicit: `BatchSender::finish` consumes the sender and
//! enqueues the single `Response::EndStream`. A stream whose senders all
//! disappear without finishing reads as `StreamError::Truncated`.
//!
//! The blocking send/receive calls must not be made from inside an async
//! task; producers that scan disk run on the blocking pool.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::protocol::{Response, Series};

/// Default number of pending batches a stream buffers
pub const DEFAULT_STREAM_CAPACITY: usize = 2000;

/// Stream failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The consumer dropped its receiver
    #[error("batch stream closed by the consumer")]
    Disconnected,

    /// A non-blocking send found the stream at capacity
    #[error("batch stream full ({0} pending batches)")]
    Full(usize),

    /// Every sender went away without enqueueing the end-of-stream marker
    #[error("batch stream ended without an end-of-stream marker")]
    Truncated,
}

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Creates a stream buffering at most `capacity` pending responses.
///
/// A capacity of zero is raised to one.
pub fn batch_stream(capacity: usize) -> (BatchSender, BatchReceiver) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    (
        BatchSender { tx, capacity },
        BatchReceiver {
            rx,
            finished: false,
        },
    )
}

/// Producer half of a batch stream.
#[derive(Debug)]
pub struct BatchSender {
    tx: mpsc::Sender<Response>,
    capacity: usize,
}

impl BatchSender {
    /// Enqueues a batch, blocking the thread while the stream is full.
    pub fn send_blocking(&self, series: Series) -> StreamResult<()> {
        self.tx
            .blocking_send(Response::Series(series))
            .map_err(|_| StreamError::Disconnected)
    }

    /// Enqueues a batch, waiting asynchronously while the stream is full.
    pub async fn send(&self, series: Series) -> StreamResult<()> {
        self.tx
            .send(Response::Series(series))
            .await
            .map_err(|_| StreamError::Disconnected)
    }

    /// Enqueues a batch only if there is room right now.
    pub fn try_send(&self, series: Series) -> StreamResult<()> {
        self.tx
            .try_send(Response::Series(series))
            .map_err(|e| match e {
                TrySendError::Full(_) => StreamError::Full(self.capacity),
                TrySendError::Closed(_) => StreamError::Disconnected,
            })
    }

    /// Enqueues the end-of-stream marker, blocking while the stream is full.
    pub fn finish(self) -> StreamResult<()> {
        self.tx
            .blocking_send(Response::EndStream)
            .map_err(|_| StreamError::Disconnected)
    }

    /// Async variant of [`BatchSender::finish`].
    pub async fn finish_async(self) -> StreamResult<()> {
        self.tx
            .send(Response::EndStream)
            .await
            .map_err(|_| StreamError::Disconnected)
    }

    /// Maximum number of pending responses
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Responses enqueued but not yet received
    pub fn pending(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    /// Whether the consumer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of a batch stream.
#[derive(Debug)]
pub struct BatchReceiver {
    rx: mpsc::Receiver<Response>,
    finished: bool,
}

impl BatchReceiver {
    /// Waits for the next batch.
    ///
    /// Returns `Ok(None)` once the end-of-stream marker arrives and on every
    /// call after that.
    pub async fn next(&mut self) -> StreamResult<Option<Series>> {
        if self.finished {
            return Ok(None);
        }
        let response = self.rx.recv().await;
        self.accept(response)
    }

    /// Blocking variant of [`BatchReceiver::next`].
    pub fn blocking_next(&mut self) -> StreamResult<Option<Series>> {
        if self.finished {
            return Ok(None);
        }
        let response = self.rx.blocking_recv();
        self.accept(response)
    }

    /// Whether the end-of-stream marker has been received
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn accept(&mut self, response: Option<Response>) -> StreamResult<Option<Series>> {
        match response {
            Some(Response::Series(series)) => Ok(Some(series)),
            Some(Response::EndStream) => {
                self.finished = true;
                // Nothing may follow the marker.
                self.rx.close();
                Ok(None)
            }
            None => Err(StreamError::Truncated),
        }
    }
}
