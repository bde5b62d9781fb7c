//! In-memory hash map engine.
//!
//! Baseline for the disk engines: no I/O, no durability, no ordering. Bulk
//! writes and deletes hold the write lock for the whole batch, so they are
//! all-or-nothing. Prefix scans are unsupported because the hash index has
//! no key order to walk.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{ensure_key, ensure_keys, Durability, KvStore, Kv, StoreLocation};
use crate::error::{EngineError, Result};

pub struct MapStore {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MapStore {
    /// The map never touches the filesystem; a path location is accepted
    /// and ignored, and durability has nothing to act on.
    pub fn open(location: &StoreLocation, durability: Durability) -> Result<Self> {
        tracing::debug!(?location, durability = durability.as_str(), "opening map store");
        Ok(Self::new())
    }

    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MapStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MapStore {
    fn name(&self) -> &'static str {
        "map"
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        ensure_key(key)?;
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn set_bulk(&self, kvs: &[Kv]) -> Result<()> {
        ensure_keys(kvs.iter().map(|kv| kv.key.as_slice()))?;
        let mut data = self.data.write();
        for kv in kvs {
            data.insert(kv.key.clone(), kv.value.clone());
        }
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        ensure_key(key)?;
        Ok(self.data.read().get(key).cloned().unwrap_or_default())
    }

    fn get_bulk(&self, keys: &[&[u8]]) -> Result<Vec<Kv>> {
        ensure_keys(keys.iter().copied())?;
        let data = self.data.read();
        Ok(keys
            .iter()
            .map(|key| Kv::new(*key, data.get(*key).cloned().unwrap_or_default()))
            .collect())
    }

    fn del(&self, key: &[u8]) -> Result<()> {
        ensure_key(key)?;
        self.data.write().remove(key);
        Ok(())
    }

    fn del_bulk(&self, keys: &[&[u8]]) -> Result<()> {
        ensure_keys(keys.iter().copied())?;
        let mut data = self.data.write();
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }

    fn scan(&self, _prefix: &[u8], _limit: i64, _with_values: bool) -> Result<Vec<Kv>> {
        Err(EngineError::Unsupported { op: "scan" })
    }

    fn flush(&self) -> Result<()> {
        self.data.write().clear();
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.data.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let store = MapStore::new();
        store.set(b"foo", b"bar").unwrap();
        assert_eq!(store.get(b"foo").unwrap(), b"bar".to_vec());
        assert!(store.get(b"missing").unwrap().is_empty());
    }

    #[test]
    fn test_scan_unsupported() {
        let store = MapStore::new();
        let err = store.scan(b"k", -1, true).unwrap_err();
        assert!(matches!(err, EngineError::Unsupported { op: "scan" }));
    }

    #[test]
    fn test_len_without_scan() {
        let store = MapStore::new();
        store
            .set_bulk(&[Kv::new("a", "1"), Kv::new("b", "2")])
            .unwrap();
        assert_eq!(store.len().unwrap(), 2);
        store.flush().unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_bulk_with_empty_key_has_no_effect() {
        let store = MapStore::new();
        let err = store
            .set_bulk(&[Kv::new("a", "1"), Kv::new("", "2")])
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyKey));
        assert_eq!(store.len().unwrap(), 0);
    }
}
