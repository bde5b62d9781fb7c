//! Uniform storage engine contract
//!
//! Every backend is wrapped behind [`KvStore`], the narrowest surface the
//! benchmark driver needs: point and bulk get/set/delete, prefix scan, flush
//! and close. Adapters own their synchronization so a single handle can be
//! shared by every worker of a scenario.
//!
//! Not-found is never an error: `get` returns an empty value for an absent
//! key and `del` of an absent key succeeds. A zero-length key is rejected by
//! every operation with [`EngineError::EmptyKey`] before the backend is
//! touched.
//!
//! ## Implementations
//!
//! - [`MapStore`]: `HashMap` behind a `parking_lot::RwLock`, always in memory
//! - [`SqliteStore`]: rusqlite, one table, WAL journal
//! - [`SledStore`]: sled tree, optional temporary (in-memory) mode
//! - [`RedbStore`]: redb B-tree, file-backed only

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{EngineError, Result};

mod map;
mod redb;
mod sled;
mod sqlite;

pub use self::map::MapStore;
pub use self::redb::RedbStore;
pub use self::sled::SledStore;
pub use self::sqlite::SqliteStore;

/// A single key/value record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Kv {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Kv {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Where an engine keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Path(PathBuf),
    Memory,
}

impl StoreLocation {
    pub fn path(&self) -> Option<&Path> {
        match self {
            StoreLocation::Path(p) => Some(p),
            StoreLocation::Memory => None,
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, StoreLocation::Memory)
    }
}

/// Whether writes reach stable storage before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Durability {
    /// Force every write to stable storage.
    Sync,
    /// Let the engine buffer writes.
    #[default]
    Buffered,
}

impl Durability {
    pub fn from_fsync(fsync: bool) -> Self {
        if fsync {
            Durability::Sync
        } else {
            Durability::Buffered
        }
    }

    pub fn is_sync(&self) -> bool {
        matches!(self, Durability::Sync)
    }

    /// Label suffix used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Durability::Sync => "fsync",
            Durability::Buffered => "nofsync",
        }
    }
}

/// Capability interface every benchmarked backend implements.
pub trait KvStore: Send + Sync {
    /// Short engine name, e.g. `"sled"`.
    fn name(&self) -> &'static str;

    /// Upsert a single record.
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Apply a list of records. Whether a failure mid-batch leaves earlier
    /// records applied is documented per backend.
    fn set_bulk(&self, kvs: &[Kv]) -> Result<()>;

    /// Fetch a value. An absent key yields an empty value.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Fetch many values; output order and length match `keys`.
    fn get_bulk(&self, keys: &[&[u8]]) -> Result<Vec<Kv>>;

    /// Remove a key. Removing an absent key is not an error.
    fn del(&self, key: &[u8]) -> Result<()>;

    fn del_bulk(&self, keys: &[&[u8]]) -> Result<()>;

    /// Records whose keys start with `prefix`, at most `limit` of them
    /// (unbounded when negative). Values are left empty unless
    /// `with_values` is set.
    fn scan(&self, prefix: &[u8], limit: i64, with_values: bool) -> Result<Vec<Kv>>;

    /// Bring the engine to a clean baseline. What that means is backend
    /// specific; the only promise is that it is safe between scenarios.
    fn flush(&self) -> Result<()>;

    /// Release every resource held by the engine.
    fn close(self: Box<Self>) -> Result<()>;

    /// Number of stored rows, counted through a full scan.
    fn len(&self) -> Result<usize> {
        Ok(self.scan(&[], -1, false)?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Reject zero-length keys.
#[inline]
pub(crate) fn ensure_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(EngineError::EmptyKey);
    }
    Ok(())
}

/// Validate a whole key list up front so bulk operations have no side effect
/// when any key is empty.
pub(crate) fn ensure_keys<'a>(keys: impl IntoIterator<Item = &'a [u8]>) -> Result<()> {
    keys.into_iter().try_for_each(ensure_key)
}

/// Translate the signed scan limit into an optional bound.
pub(crate) fn scan_limit(limit: i64) -> Option<usize> {
    usize::try_from(limit).ok()
}

/// Smallest byte string greater than every string starting with `prefix`,
/// or `None` when no such bound exists (empty or all-`0xff` prefix).
pub(crate) fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.pop() {
        if last < u8::MAX {
            bound.push(last + 1);
            return Some(bound);
        }
    }
    None
}
