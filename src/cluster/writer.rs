//! Cluster write path

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::protocol::Series;
use crate::shard::{LegacyShard, Shard, ShardOptions};

use super::config::{ClusterAdmin, ClusterConfiguration};
use super::errors::{WriteError, WriteResult};

/// Accepts series batches for a database under an identity.
pub trait ClusterWriter: Send + Sync {
    /// Durably applies `series` to `database`.
    fn write_series_data(
        &self,
        identity: &ClusterAdmin,
        database: &str,
        series: &[Series],
    ) -> WriteResult<()>;
}

/// Writes into one local store per database under a target directory.
pub struct LocalClusterWriter {
    target_dir: PathBuf,
    cluster: Arc<ClusterConfiguration>,
    options: ShardOptions,
    stores: Mutex<HashMap<String, Arc<LegacyShard>>>,
}

impl LocalClusterWriter {
    /// Create a writer persisting under `target_dir`
    pub fn new(
        target_dir: impl Into<PathBuf>,
        cluster: Arc<ClusterConfiguration>,
        options: ShardOptions,
    ) -> Self {
        Self {
            target_dir: target_dir.into(),
            cluster,
            options,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Root of the per-database stores
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Store for `database`, opened on first use.
    pub fn database_store(&self, database: &str) -> WriteResult<Arc<LegacyShard>> {
        let mut stores = self
            .stores
            .lock()
            .map_err(|_| WriteError::Rejected("store table lock poisoned".to_string()))?;
        if let Some(store) = stores.get(database) {
            return Ok(Arc::clone(store));
        }

        let store = LegacyShard::open(database, &self.target_dir.join(database), &self.options)
            .map_err(|source| WriteError::Store {
                database: database.to_string(),
                source,
            })?;
        let store = Arc::new(store);
        stores.insert(database.to_string(), Arc::clone(&store));
        Ok(store)
    }

    /// Closes every open database store.
    pub fn close(&self) {
        if let Ok(mut stores) = self.stores.lock() {
            for (_, store) in stores.drain() {
                store.close();
            }
        }
    }
}

impl ClusterWriter for LocalClusterWriter {
    fn write_series_data(
        &self,
        identity: &ClusterAdmin,
        database: &str,
        series: &[Series],
    ) -> WriteResult<()> {
        let known_admin = self.cluster.cluster_admin(&identity.name).is_some();
        if !known_admin || !identity.is_cluster_admin() {
            return Err(WriteError::Unauthorized {
                user: identity.name.clone(),
                database: database.to_string(),
            });
        }
        if !self.cluster.has_database(database) {
            return Err(WriteError::UnknownDatabase(database.to_string()));
        }

        let store = self.database_store(database)?;
        for batch in series {
            store
                .write_series(database, batch)
                .map_err(|source| WriteError::Store {
                    database: database.to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}

impl Drop for LocalClusterWriter {
    fn drop(&mut self) {
        self.close();
    }
}
