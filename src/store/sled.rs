//! sled engine.
//!
//! sled is internally concurrency-safe, so no extra locking is added.
//! Bulk writes and deletes go through a `sled::Batch` and are applied
//! atomically. With [`Durability::Sync`] every write is followed by a
//! `flush`, otherwise sled's background flusher decides. In-memory mode
//! opens a temporary tree that is removed on drop.

use ::sled::{Batch, Config, Db};

use super::{ensure_key, ensure_keys, scan_limit, Durability, KvStore, Kv, StoreLocation};
use crate::error::{EngineError, Result};

const ENGINE: &str = "sled";

pub struct SledStore {
    db: Db,
    sync: bool,
}

impl SledStore {
    pub fn open(location: &StoreLocation, durability: Durability) -> Result<Self> {
        let config = match location {
            StoreLocation::Path(path) => Config::new().path(path),
            StoreLocation::Memory => Config::new().temporary(true),
        };

        let db = config
            .mode(::sled::Mode::HighThroughput)
            .open()
            .map_err(|e| EngineError::init_failed(ENGINE, e))?;

        tracing::debug!(?location, durability = durability.as_str(), "opened sled store");

        Ok(Self {
            db,
            sync: durability.is_sync(),
        })
    }

    fn sync_if_needed(&self) -> Result<()> {
        if self.sync {
            self.db.flush()?;
        }
        Ok(())
    }
}

impl KvStore for SledStore {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        ensure_key(key)?;
        self.db.insert(key, value)?;
        self.sync_if_needed()
    }

    fn set_bulk(&self, kvs: &[Kv]) -> Result<()> {
        ensure_keys(kvs.iter().map(|kv| kv.key.as_slice()))?;
        let mut batch = Batch::default();
        for kv in kvs {
            batch.insert(kv.key.as_slice(), kv.value.as_slice());
        }
        self.db.apply_batch(batch)?;
        self.sync_if_needed()
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        ensure_key(key)?;
        Ok(self.db.get(key)?.map(|v| v.to_vec()).unwrap_or_default())
    }

    fn get_bulk(&self, keys: &[&[u8]]) -> Result<Vec<Kv>> {
        ensure_keys(keys.iter().copied())?;
        keys.iter()
            .map(|key| -> Result<Kv> {
                let value = self.db.get(key)?.map(|v| v.to_vec()).unwrap_or_default();
                Ok(Kv::new(*key, value))
            })
            .collect()
    }

    fn del(&self, key: &[u8]) -> Result<()> {
        ensure_key(key)?;
        self.db.remove(key)?;
        self.sync_if_needed()
    }

    fn del_bulk(&self, keys: &[&[u8]]) -> Result<()> {
        ensure_keys(keys.iter().copied())?;
        let mut batch = Batch::default();
        for key in keys {
            batch.remove(*key);
        }
        self.db.apply_batch(batch)?;
        self.sync_if_needed()
    }

    fn scan(&self, prefix: &[u8], limit: i64, with_values: bool) -> Result<Vec<Kv>> {
        let iter = self.db.scan_prefix(prefix);
        let take = scan_limit(limit).unwrap_or(usize::MAX);

        let mut out = Vec::new();
        for item in iter.take(take) {
            let (key, value) = item?;
            let value = if with_values { value.to_vec() } else { Vec::new() };
            out.push(Kv::new(key.to_vec(), value));
        }
        Ok(out)
    }

    fn flush(&self) -> Result<()> {
        self.db.clear()?;
        self.db.flush()?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.db.len())
    }
}
