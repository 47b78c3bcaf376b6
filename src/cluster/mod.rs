//! The live cluster the migration writes into
//!
//! `ClusterConfiguration` is an immutable snapshot of the cluster's
//! databases and administrators. `ClusterWriter` is the write path;
//! `LocalClusterWriter` persists into one store per database.

mod config;
mod errors;
mod writer;

pub use config::{ClusterAdmin, ClusterConfiguration};
pub use errors::{ClusterError, ClusterResult, WriteError, WriteResult};
pub use writer::{ClusterWriter, LocalClusterWriter};
