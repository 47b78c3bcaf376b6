//! Legacy shard migration pipeline
//!
//! ```text
//! ShardEnumerator -> ShardOpener -> DataMigrator
//!     -> (database, series) -> PassthroughEngine -> batch stream
//!     -> MigrationWriter -> ClusterWriter
//! ```

mod errors;
mod migrator;
mod series;
mod writer;

pub use errors::{DatabaseFailure, MigrationError, MigrationResult, Scope};
pub use migrator::DataMigrator;
pub use series::{full_scan_query, SeriesOutcome, StreamOptions};
pub use writer::MigrationWriter;
