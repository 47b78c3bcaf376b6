//! Cluster error types

use thiserror::Error;

use crate::shard::ShardError;

/// Invalid cluster configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    /// No administrator to run writes under
    #[error("AERO_CLUSTER_NO_ADMINS: cluster has no cluster admins")]
    NoClusterAdmins,

    /// An administrator name did not resolve
    #[error("AERO_CLUSTER_UNKNOWN_ADMIN: no cluster admin named {0}")]
    UnknownAdmin(String),

    /// A database entry has an empty name
    #[error("AERO_CLUSTER_INVALID_DATABASE: database name must not be empty")]
    EmptyDatabaseName,

    /// A database is listed twice
    #[error("AERO_CLUSTER_INVALID_DATABASE: database {0} listed more than once")]
    DuplicateDatabase(String),
}

/// Result type for cluster configuration
pub type ClusterResult<T> = Result<T, ClusterError>;

/// A write the cluster refused or failed to apply
#[derive(Debug, Error)]
pub enum WriteError {
    /// The identity may not write to the database
    #[error("AERO_WRITE_UNAUTHORIZED: {user} may not write to {database}")]
    Unauthorized {
        /// Identity that attempted the write
        user: String,
        /// Target database
        database: String,
    },

    /// The database is not part of the cluster
    #[error("AERO_WRITE_UNKNOWN_DATABASE: database {0} does not exist")]
    UnknownDatabase(String),

    /// The write path failed to persist the batch
    #[error("AERO_WRITE_FAILED: writing to {database} failed: {source}")]
    Store {
        /// Target database
        database: String,
        /// Underlying failure
        #[source]
        source: ShardError,
    },

    /// Any other rejection
    #[error("AERO_WRITE_REJECTED: {0}")]
    Rejected(String),
}

/// Result type for cluster writes
pub type WriteResult<T> = Result<T, WriteError>;
