//! Immutable cluster configuration snapshot

use serde::{Deserialize, Serialize};

use super::errors::{ClusterError, ClusterResult};

/// A privileged identity allowed to write into any database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAdmin {
    /// Admin user name
    pub name: String,
}

impl ClusterAdmin {
    /// Create an admin identity
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Cluster admins may write to every database
    pub fn is_cluster_admin(&self) -> bool {
        true
    }
}

/// Databases and administrators known to the live cluster.
///
/// Built once before a run and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfiguration {
    #[serde(default)]
    databases: Vec<String>,
    #[serde(default)]
    cluster_admins: Vec<ClusterAdmin>,
}

impl ClusterConfiguration {
    /// Create a configuration snapshot
    pub fn new(databases: Vec<String>, cluster_admins: Vec<ClusterAdmin>) -> Self {
        Self {
            databases,
            cluster_admins,
        }
    }

    /// Database names, in configuration order
    pub fn databases(&self) -> &[String] {
        &self.databases
    }

    /// Whether `name` is a configured database
    pub fn has_database(&self, name: &str) -> bool {
        self.databases.iter().any(|db| db == name)
    }

    /// Administrators, in configuration order
    pub fn cluster_admins(&self) -> &[ClusterAdmin] {
        &self.cluster_admins
    }

    /// Looks up an administrator by name
    pub fn cluster_admin(&self, name: &str) -> Option<&ClusterAdmin> {
        self.cluster_admins.iter().find(|admin| admin.name == name)
    }

    /// Resolves the identity every migration write runs under: the first
    /// configured administrator.
    pub fn migration_identity(&self) -> ClusterResult<ClusterAdmin> {
        let first = self
            .cluster_admins
            .first()
            .ok_or(ClusterError::NoClusterAdmins)?;
        self.cluster_admin(&first.name)
            .cloned()
            .ok_or_else(|| ClusterError::UnknownAdmin(first.name.clone()))
    }

    /// Checks admin presence and database name hygiene.
    pub fn validate(&self) -> ClusterResult<()> {
        if self.cluster_admins.is_empty() {
            return Err(ClusterError::NoClusterAdmins);
        }
        for (i, db) in self.databases.iter().enumerate() {
            if db.is_empty() {
                return Err(ClusterError::EmptyDatabaseName);
            }
            if self.databases[..i].contains(db) {
                return Err(ClusterError::DuplicateDatabase(db.clone()));
            }
        }
        Ok(())
    }
}
