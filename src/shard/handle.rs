//! Scoped ownership of an open shard

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::traits::Shard;

/// Closes the wrapped shard exactly once: on `close()` or on drop,
/// whichever comes first.
pub struct ShardHandle {
    shard: Arc<dyn Shard>,
    closed: AtomicBool,
}

impl ShardHandle {
    /// Take ownership of an open shard
    pub fn new(shard: Arc<dyn Shard>) -> Self {
        Self {
            shard,
            closed: AtomicBool::new(false),
        }
    }

    /// Shared reference for a producer thread
    pub fn shared(&self) -> Arc<dyn Shard> {
        Arc::clone(&self.shard)
    }

    /// Closes the shard. Later calls and the eventual drop do nothing.
    ///
    /// Returns whether this call performed the close.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.shard.close();
        true
    }

    /// Whether the shard has been closed through this handle
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Deref for ShardHandle {
    type Target = dyn Shard;

    fn deref(&self) -> &Self::Target {
        self.shard.as_ref()
    }
}

impl Drop for ShardHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockShard;

    #[test]
    fn test_close_runs_once() {
        let shard = Arc::new(MockShard::new("1"));
        let handle = ShardHandle::new(shard.clone());

        assert!(handle.close());
        assert!(!handle.close());
        drop(handle);
        assert_eq!(shard.close_count(), 1);
    }

    #[test]
    fn test_drop_closes() {
        let shard = Arc::new(MockShard::new("1"));
        {
            let handle = ShardHandle::new(shard.clone());
            assert_eq!(handle.name(), "1");
            assert!(!handle.is_closed());
        }
        assert_eq!(shard.close_count(), 1);
    }
}
