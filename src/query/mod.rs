//! Query parsing and result processing
//!
//! The migration issues one full-scan query per series. The query text is
//! parsed into a `Query`, bound to an identity and database as a
//! `QuerySpec`, and executed by a shard that pushes batches into a
//! `QueryProcessor`.

mod ast;
mod engine;
mod errors;
mod parser;
mod spec;

pub use ast::{Columns, Order, Query};
pub use engine::{PassthroughEngine, QueryProcessor, DEFAULT_MAX_POINTS_PER_BATCH};
pub use errors::{QueryParseError, QueryResult};
pub use parser::parse_query;
pub use spec::QuerySpec;
