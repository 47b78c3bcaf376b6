//! Query error types

use thiserror::Error;

/// A query text that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("AERO_QUERY_PARSE_ERROR at position {position}: {message} (query: {query})")]
pub struct QueryParseError {
    /// Byte offset the parser stopped at
    pub position: usize,
    /// What was wrong
    pub message: String,
    /// The offending query text
    pub query: String,
}

impl QueryParseError {
    /// Create a parse error
    pub fn new(query: &str, position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
            query: query.to_string(),
        }
    }
}

/// Result type for query parsing
pub type QueryResult<T> = Result<T, QueryParseError>;
