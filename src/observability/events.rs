//! Migration lifecycle events

use std::fmt;

use super::logger::Severity;

/// Observable events of a migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Configuration file loaded and validated
    ConfigLoaded,

    // Run
    /// Run begins
    MigrationStart,
    /// Run finished (possibly with skipped work)
    MigrationComplete,
    /// Shard root unreadable, nothing migrated
    MigrationAborted,

    // Shard
    /// Shard migration begins
    ShardStart,
    /// Shard could not be opened and is skipped
    ShardOpenFailed,
    /// Shard released
    ShardClosed,
    /// Shard directory whose name is not valid UTF-8, never opened
    ShardSkipped,

    // Database
    /// Database migration begins on a shard
    DatabaseStart,
    /// Every series of a database migrated
    DatabaseComplete,
    /// Database failed; remaining databases of the shard are skipped
    DatabaseFailed,

    // Series
    /// Series migration begins
    SeriesStart,
    /// Series stream drained
    SeriesComplete,
    /// Series skipped before any data flowed
    SeriesSkipped,
    /// Shard query failed mid-stream
    QueryFailed,
    /// Cluster rejected a batch
    WriteFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::MigrationStart => "MIGRATION_BEGIN",
            Event::MigrationComplete => "MIGRATION_COMPLETE",
            Event::MigrationAborted => "MIGRATION_ABORTED",
            Event::ShardStart => "SHARD_MIGRATION_BEGIN",
            Event::ShardOpenFailed => "SHARD_OPEN_FAILED",
            Event::ShardClosed => "SHARD_CLOSED",
            Event::ShardSkipped => "SHARD_SKIPPED",
            Event::DatabaseStart => "DATABASE_MIGRATION_BEGIN",
            Event::DatabaseComplete => "DATABASE_MIGRATION_COMPLETE",
            Event::DatabaseFailed => "DATABASE_MIGRATION_FAILED",
            Event::SeriesStart => "SERIES_MIGRATION_BEGIN",
            Event::SeriesComplete => "SERIES_MIGRATION_COMPLETE",
            Event::SeriesSkipped => "SERIES_SKIPPED",
            Event::QueryFailed => "SERIES_QUERY_FAILED",
            Event::WriteFailed => "SERIES_WRITE_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::MigrationAborted => Severity::Fatal,
            Event::ShardOpenFailed
            | Event::ShardSkipped
            | Event::DatabaseFailed
            | Event::SeriesSkipped
            | Event::QueryFailed
            | Event::WriteFailed => Severity::Error,
            Event::SeriesStart | Event::SeriesComplete => Severity::Trace,
            _ => Severity::Info,
        }
    }

    /// Returns true if this event ends the run
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
