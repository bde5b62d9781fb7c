//! redb engine.
//!
//! Every write opens its own write transaction; redb serializes writers
//! internally and lets readers proceed concurrently. Bulk writes and
//! deletes share one transaction and commit all-or-nothing. The adapter
//! needs a database file, so in-memory mode is refused with
//! [`EngineError::BackendUnavailable`]. Flush drops and recreates the table.

use ::redb::{Database, ReadableTable, TableDefinition, WriteTransaction};

use super::{ensure_key, ensure_keys, scan_limit, Durability, KvStore, Kv, StoreLocation};
use crate::error::{EngineError, Result};

const ENGINE: &str = "redb";

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("kvbench");

pub struct RedbStore {
    db: Database,
    durability: ::redb::Durability,
}

impl RedbStore {
    pub fn open(location: &StoreLocation, durability: Durability) -> Result<Self> {
        let path = location.path().ok_or_else(|| EngineError::BackendUnavailable {
            engine: ENGINE,
            reason: "a database file path is required".to_string(),
        })?;

        let db = Database::create(path).map_err(|e| EngineError::init_failed(ENGINE, e))?;

        let store = Self {
            db,
            durability: if durability.is_sync() {
                ::redb::Durability::Immediate
            } else {
                ::redb::Durability::None
            },
        };

        // Create the table up front so read transactions never miss it.
        store
            .write(|_| Ok(()))
            .map_err(|e| EngineError::init_failed(ENGINE, e))?;

        tracing::debug!(?location, durability = durability.as_str(), "opened redb store");
        Ok(store)
    }

    /// Run `f` against the table inside one write transaction and commit.
    fn write<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut ::redb::Table<'_, &'static [u8], &'static [u8]>) -> Result<()>,
    {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(TABLE)?;
            f(&mut table)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn begin_write(&self) -> Result<WriteTransaction> {
        let mut txn = self.db.begin_write()?;
        txn.set_durability(self.durability);
        Ok(txn)
    }
}

impl KvStore for RedbStore {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        ensure_key(key)?;
        self.write(|table| {
            table.insert(key, value)?;
            Ok(())
        })
    }

    fn set_bulk(&self, kvs: &[Kv]) -> Result<()> {
        ensure_keys(kvs.iter().map(|kv| kv.key.as_slice()))?;
        self.write(|table| {
            for kv in kvs {
                table.insert(kv.key.as_slice(), kv.value.as_slice())?;
            }
            Ok(())
        })
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        ensure_key(key)?;
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TABLE)?;
        let value = table.get(key)?;
        Ok(value.map(|guard| guard.value().to_vec()).unwrap_or_default())
    }

    fn get_bulk(&self, keys: &[&[u8]]) -> Result<Vec<Kv>> {
        ensure_keys(keys.iter().copied())?;
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TABLE)?;
        keys.iter()
            .map(|key| -> Result<Kv> {
                let value = table
                    .get(*key)?
                    .map(|guard| guard.value().to_vec())
                    .unwrap_or_default();
                Ok(Kv::new(*key, value))
            })
            .collect()
    }

    fn del(&self, key: &[u8]) -> Result<()> {
        ensure_key(key)?;
        self.write(|table| {
            table.remove(key)?;
            Ok(())
        })
    }

    fn del_bulk(&self, keys: &[&[u8]]) -> Result<()> {
        ensure_keys(keys.iter().copied())?;
        self.write(|table| {
            for key in keys {
                table.remove(*key)?;
            }
            Ok(())
        })
    }

    fn scan(&self, prefix: &[u8], limit: i64, with_values: bool) -> Result<Vec<Kv>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TABLE)?;
        let take = scan_limit(limit).unwrap_or(usize::MAX);

        let mut out = Vec::new();
        for item in table.range::<&[u8]>(prefix..)? {
            if out.len() >= take {
                break;
            }
            let (key, value) = item?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            let value = if with_values {
                value.value().to_vec()
            } else {
                Vec::new()
            };
            out.push(Kv::new(key, value));
        }
        Ok(out)
    }

    fn flush(&self) -> Result<()> {
        let txn = self.begin_write()?;
        txn.delete_table(TABLE)?;
        txn.open_table(TABLE)?;
        txn.commit()?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        drop(self.db);
        Ok(())
    }
}
