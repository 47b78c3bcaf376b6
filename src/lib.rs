//! aerodb-migrate - one-shot migration of legacy AeroDB shards
//!
//! Walks the legacy shard directories newest first, reconstructs every
//! series stored in each shard and replays it into a live cluster through
//! the cluster write path.
//!
//! - `storage`: the ordered segment store backing each legacy shard
//! - `shard`: shard layout, enumeration, opening and lifetime
//! - `query`: the full-scan query and the passthrough engine
//! - `stream`: bounded batch stream with an end-of-stream marker
//! - `cluster`: cluster snapshot and write path
//! - `migration`: the orchestrator and its error taxonomy

pub mod cli;
pub mod cluster;
pub mod migration;
pub mod observability;
pub mod protocol;
pub mod query;
pub mod shard;
pub mod storage;
pub mod stream;

#[doc(hidden)]
pub mod test_support;
