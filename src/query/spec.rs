//! Query specification

use crate::cluster::ClusterAdmin;

use super::ast::Query;

/// A parsed query bound to the identity running it and its database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    identity: ClusterAdmin,
    database: String,
    query: Query,
}

impl QuerySpec {
    /// Create a query specification
    pub fn new(identity: ClusterAdmin, database: impl Into<String>, query: Query) -> Self {
        Self {
            identity,
            database: database.into(),
            query,
        }
    }

    /// Identity the query runs under
    pub fn identity(&self) -> &ClusterAdmin {
        &self.identity
    }

    /// Database the query reads
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The parsed query
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Series the query reads
    pub fn series(&self) -> &str {
        &self.query.series
    }
}
