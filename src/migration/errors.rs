//! Migration error taxonomy
//!
//! Every error names the level of work it short-circuits. An error never
//! affects work above its scope: a failed series does not stop its
//! database, a failed database does not stop the next shard.

use std::fmt;

use thiserror::Error;

use crate::cluster::{ClusterError, WriteError};
use crate::query::QueryParseError;
use crate::shard::ShardError;

/// Granularity of work an error skips
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scope {
    /// One batch
    Batch,
    /// One series
    Series,
    /// The remaining databases of one shard
    Database,
    /// One shard
    Shard,
    /// The whole run
    Run,
}

impl Scope {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Batch => "batch",
            Scope::Series => "series",
            Scope::Database => "database",
            Scope::Shard => "shard",
            Scope::Run => "run",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a database migration was abandoned
#[derive(Debug, Error)]
pub enum DatabaseFailure {
    /// The shard could not list the database's series
    #[error("listing series failed: {0}")]
    ListSeries(#[source] ShardError),

    /// The producer vanished without an end-of-stream marker
    #[error("stream for series {series} ended without an end-of-stream marker")]
    Truncated {
        /// Series whose stream broke
        series: String,
    },

    /// The producer task could not be joined
    #[error("producer for series {series} failed: {reason}")]
    Producer {
        /// Series being produced
        series: String,
        /// Join failure (panic or cancellation)
        reason: String,
    },
}

/// Migration errors
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The shard root could not be read; nothing is migrated
    #[error("AERO_MIGRATION_ENUMERATION_FAILED: {0}")]
    Enumeration(#[source] ShardError),

    /// A shard could not be opened and is skipped
    #[error("AERO_MIGRATION_SHARD_OPEN_FAILED: shard {shard}: {source}")]
    ShardOpen {
        /// Shard name
        shard: String,
        /// Opener failure
        #[source]
        source: ShardError,
    },

    /// The generated query for a series did not parse; the series is skipped
    #[error("AERO_MIGRATION_QUERY_PARSE_FAILED: series {series}: {source}")]
    QueryParse {
        /// Series name
        series: String,
        /// Parser failure
        #[source]
        source: QueryParseError,
    },

    /// The shard query failed mid-stream; what was produced is kept
    #[error("AERO_MIGRATION_QUERY_FAILED: series {series}: {source}")]
    QueryExecution {
        /// Series name
        series: String,
        /// Shard failure
        #[source]
        source: ShardError,
    },

    /// The cluster rejected one batch
    #[error("AERO_MIGRATION_WRITE_FAILED: {database}/{series}: {source}")]
    Write {
        /// Target database
        database: String,
        /// Series name
        series: String,
        /// Write path failure
        #[source]
        source: WriteError,
    },

    /// A database aborted; the shard's remaining databases are skipped
    #[error("AERO_MIGRATION_DATABASE_FAILED: database {database} on shard {shard}: {source}")]
    DatabaseMigration {
        /// Shard name
        shard: String,
        /// Database name
        database: String,
        /// What went wrong
        #[source]
        source: DatabaseFailure,
    },

    /// The migrator could not be built
    #[error("AERO_MIGRATION_CONFIG_INVALID: {0}")]
    Config(#[from] ClusterError),
}

impl MigrationError {
    /// Level of work this error skips
    pub fn scope(&self) -> Scope {
        match self {
            MigrationError::Enumeration(_) | MigrationError::Config(_) => Scope::Run,
            MigrationError::ShardOpen { .. } => Scope::Shard,
            MigrationError::DatabaseMigration { .. } => Scope::Database,
            MigrationError::QueryParse { .. } | MigrationError::QueryExecution { .. } => {
                Scope::Series
            }
            MigrationError::Write { .. } => Scope::Batch,
        }
    }

    /// Whether the run stops
    pub fn is_fatal(&self) -> bool {
        self.scope() == Scope::Run
    }
}

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;
