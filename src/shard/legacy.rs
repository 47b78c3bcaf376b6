//! Store-backed legacy shard
//!
//! Each point column is stored as its own key, so reconstructing rows means
//! merging one ordered iterator per selected field on
//! `(timestamp, sequence_number)`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, RwLock, RwLockReadGuard};

use crate::protocol::{FieldValue, Point, Series};
use crate::query::{Columns, Order, QueryProcessor, QuerySpec};
use crate::storage::{Direction, KvStore, PrefixIter, StorageError, WriteBatch};

use super::errors::{ShardError, ShardResult};
use super::keys;
use super::options::ShardOptions;
use super::traits::Shard;

/// A shard over one `KvStore` directory.
pub struct LegacyShard {
    name: String,
    store: RwLock<Option<KvStore>>,
    point_batch_size: usize,
    write_batch_size: usize,
    field_ids: Mutex<()>,
}

impl LegacyShard {
    /// Opens the store at `path` and wraps it as shard `name`.
    ///
    /// The directory is created when missing.
    pub fn open(name: &str, path: &Path, options: &ShardOptions) -> ShardResult<Self> {
        let store = KvStore::open(path, options.store_options())
            .map_err(|e| ShardError::open_failed(name, e))?;
        Ok(Self::from_store(name, store, options))
    }

    /// Wraps an already open store.
    pub fn from_store(name: &str, store: KvStore, options: &ShardOptions) -> Self {
        Self {
            name: name.to_string(),
            store: RwLock::new(Some(store)),
            point_batch_size: options.point_batch_size.max(1),
            write_batch_size: options.write_batch_size.max(1),
            field_ids: Mutex::new(()),
        }
    }

    /// Whether `close` has run
    pub fn is_closed(&self) -> bool {
        self.store.read().map(|s| s.is_none()).unwrap_or(true)
    }

    /// Stores every point of `series` under `database`.
    ///
    /// Points are appended in chunks of `write_batch_size`; missing values
    /// are not stored.
    pub fn write_series(&self, database: &str, series: &Series) -> ShardResult<()> {
        let guard = self.open_store()?;
        let store = guard
            .as_ref()
            .ok_or_else(|| ShardError::closed(&self.name))?;

        let ids = series
            .fields
            .iter()
            .map(|field| self.field_id(store, database, &series.name, field))
            .collect::<ShardResult<Vec<u64>>>()?;

        store
            .put(keys::series_key(database, &series.name), Vec::new())
            .map_err(|e| self.store_error(e))?;

        for chunk in series.points.chunks(self.write_batch_size) {
            let mut batch = WriteBatch::new();
            for point in chunk {
                for (id, value) in ids.iter().zip(&point.values) {
                    if let Some(value) = value {
                        let encoded = serde_json::to_vec(value)
                            .map_err(|e| ShardError::encoding(&self.name, e.to_string()))?;
                        batch.put(
                            keys::point_key(*id, point.timestamp, point.sequence_number),
                            encoded,
                        );
                    }
                }
            }
            store.write(batch).map_err(|e| self.store_error(e))?;
        }
        Ok(())
    }

    fn open_store(&self) -> ShardResult<RwLockReadGuard<'_, Option<KvStore>>> {
        let guard = self
            .store
            .read()
            .map_err(|_| ShardError::closed(&self.name))?;
        if guard.is_none() {
            return Err(ShardError::closed(&self.name));
        }
        Ok(guard)
    }

    fn store_error(&self, e: StorageError) -> ShardError {
        ShardError::store(&self.name, e)
    }

    /// Returns the id of `field`, allocating one if it is new.
    fn field_id(&self, store: &KvStore, database: &str, series: &str, field: &str) -> ShardResult<u64> {
        let key = keys::field_key(database, series, field);
        let _lock = self
            .field_ids
            .lock()
            .map_err(|_| ShardError::encoding(&self.name, "field id lock poisoned"))?;

        if let Some(bytes) = store.get(&key).map_err(|e| self.store_error(e))? {
            return keys::decode_id(&bytes)
                .ok_or_else(|| ShardError::encoding(&self.name, "malformed field id"));
        }

        let next = match store
            .get(keys::NEXT_FIELD_ID_KEY)
            .map_err(|e| self.store_error(e))?
        {
            Some(bytes) => keys::decode_id(&bytes)
                .ok_or_else(|| ShardError::encoding(&self.name, "malformed field id counter"))?,
            None => 1,
        };

        let mut batch = WriteBatch::new();
        batch.put(key, keys::encode_id(next));
        batch.put(keys::NEXT_FIELD_ID_KEY.to_vec(), keys::encode_id(next + 1));
        store.write(batch).map_err(|e| self.store_error(e))?;
        Ok(next)
    }

    /// Field name -> id for one series, ordered by name.
    fn fields_of(&self, store: &KvStore, database: &str, series: &str) -> ShardResult<BTreeMap<String, u64>> {
        let prefix = keys::field_prefix(database, series);
        let mut fields = BTreeMap::new();
        for entry in store.iter_prefix(&prefix, Direction::Forward) {
            let (key, value) = entry.map_err(|e| self.store_error(e))?;
            let name = keys::suffix_str(&key, &prefix)
                .ok_or_else(|| ShardError::encoding(&self.name, "field name is not UTF-8"))?;
            let id = keys::decode_id(&value)
                .ok_or_else(|| ShardError::encoding(&self.name, "malformed field id"))?;
            fields.insert(name.to_string(), id);
        }
        Ok(fields)
    }
}

/// The next stored value of one field.
struct FieldCursor<'a> {
    iter: PrefixIter<'a>,
    head: Option<(i64, u64, FieldValue)>,
}

impl<'a> FieldCursor<'a> {
    fn advance(&mut self, shard: &str) -> ShardResult<()> {
        self.head = match self.iter.next() {
            None => None,
            Some(entry) => {
                let (key, value) = entry.map_err(|e| ShardError::store(shard, e))?;
                let (timestamp, sequence) = keys::decode_point_key(&key)
                    .ok_or_else(|| ShardError::encoding(shard, "malformed point key"))?;
                let value: FieldValue = serde_json::from_slice(&value)
                    .map_err(|e| ShardError::encoding(shard, e.to_string()))?;
                Some((timestamp, sequence, value))
            }
        };
        Ok(())
    }

    fn position(&self) -> Option<(i64, u64)> {
        self.head.as_ref().map(|(ts, seq, _)| (*ts, *seq))
    }
}

impl Shard for LegacyShard {
    fn name(&self) -> &str {
        &self.name
    }

    fn series_for_database(&self, database: &str) -> ShardResult<Vec<String>> {
        let guard = self.open_store()?;
        let store = guard
            .as_ref()
            .ok_or_else(|| ShardError::closed(&self.name))?;

        let prefix = keys::series_prefix(database);
        store
            .keys_with_prefix(&prefix)
            .map_err(|e| self.store_error(e))?
            .iter()
            .map(|key| {
                keys::suffix_str(key, &prefix)
                    .map(str::to_string)
                    .ok_or_else(|| ShardError::encoding(&self.name, "series name is not UTF-8"))
            })
            .collect()
    }

    fn query(&self, spec: &QuerySpec, processor: &mut dyn QueryProcessor) -> ShardResult<()> {
        let guard = self.open_store()?;
        let store = guard
            .as_ref()
            .ok_or_else(|| ShardError::closed(&self.name))?;

        let query = spec.query();
        let fields = self.fields_of(store, spec.database(), &query.series)?;

        let selected: Vec<(String, u64)> = match &query.columns {
            Columns::All => fields.into_iter().collect(),
            Columns::Named(names) => names
                .iter()
                .map(|name| {
                    fields
                        .get(name)
                        .map(|id| (name.clone(), *id))
                        .ok_or_else(|| ShardError::unknown_column(&self.name, &query.series, name))
                })
                .collect::<ShardResult<_>>()?,
        };
        if selected.is_empty() {
            return Ok(());
        }

        let direction = match query.order {
            Order::Ascending => Direction::Forward,
            Order::Descending => Direction::Reverse,
        };
        let mut cursors = Vec::with_capacity(selected.len());
        for (_, id) in &selected {
            let mut cursor = FieldCursor {
                iter: store.iter_prefix(&keys::point_prefix(*id), direction),
                head: None,
            };
            cursor.advance(&self.name)?;
            cursors.push(cursor);
        }

        let columns: Vec<String> = selected.into_iter().map(|(name, _)| name).collect();
        let mut batch = Series::new(query.series.clone(), columns.clone());
        let mut remaining = query.limit.unwrap_or(usize::MAX);

        while remaining > 0 {
            let positions = cursors.iter().filter_map(FieldCursor::position);
            let next = match query.order {
                Order::Ascending => positions.min(),
                Order::Descending => positions.max(),
            };
            let Some(position) = next else { break };

            let mut values = Vec::with_capacity(cursors.len());
            for cursor in cursors.iter_mut() {
                if cursor.position() == Some(position) {
                    values.push(cursor.head.take().map(|(_, _, value)| value));
                    cursor.advance(&self.name)?;
                } else {
                    values.push(None);
                }
            }

            batch.points.push(Point::new(position.0, position.1, values));
            remaining -= 1;

            if batch.point_count() >= self.point_batch_size {
                let full = std::mem::replace(
                    &mut batch,
                    Series::new(query.series.clone(), columns.clone()),
                );
                if !processor.yield_series(full) {
                    return Ok(());
                }
            }
        }

        if !batch.points.is_empty() {
            processor.yield_series(batch);
        }
        Ok(())
    }

    fn close(&self) {
        if let Ok(mut guard) = self.store.write() {
            if let Some(store) = guard.take() {
                store.close();
            }
        }
    }
}
