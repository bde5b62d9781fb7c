//! SQLite engine via rusqlite.
//!
//! One `WITHOUT ROWID` table keyed by blob. The connection sits behind a
//! mutex, so every operation is serialized. Bulk writes and deletes run in
//! a single transaction and are all-or-nothing. Flush deletes every row and
//! truncates the WAL.

use std::sync::Mutex;

use rusqlite::{params, Connection, TransactionBehavior};

use super::{
    ensure_key, ensure_keys, prefix_upper_bound, Durability, KvStore, Kv, StoreLocation,
};
use crate::error::{EngineError, Result};

const ENGINE: &str = "sqlite";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    k BLOB PRIMARY KEY NOT NULL,
    v BLOB NOT NULL
) WITHOUT ROWID;";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    memory: bool,
}

impl SqliteStore {
    /// Open or create a database at the given location
    pub fn open(location: &StoreLocation, durability: Durability) -> Result<Self> {
        let conn = match location {
            StoreLocation::Path(path) => Connection::open(path),
            StoreLocation::Memory => Connection::open_in_memory(),
        }
        .map_err(|e| EngineError::init_failed(ENGINE, e))?;

        let synchronous = if durability.is_sync() { "FULL" } else { "OFF" };
        let journal = if location.is_memory() { "MEMORY" } else { "WAL" };

        conn.execute_batch(&format!(
            "PRAGMA journal_mode = {journal};
             PRAGMA synchronous = {synchronous};
             PRAGMA busy_timeout = 5000;
             {SCHEMA}"
        ))
        .map_err(|e| EngineError::init_failed(ENGINE, e))?;

        tracing::debug!(?location, synchronous, journal, "opened sqlite store");

        Ok(Self {
            conn: Mutex::new(conn),
            memory: location.is_memory(),
        })
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_memory() -> Result<Self> {
        Self::open(&StoreLocation::Memory, Durability::Buffered)
    }

    fn lookup(conn: &Connection, key: &[u8]) -> Result<Vec<u8>> {
        let mut stmt = conn.prepare_cached("SELECT v FROM kv WHERE k = ?1")?;
        match stmt.query_row(params![key], |row| row.get(0)) {
            Ok(value) => Ok(value),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KvStore for SqliteStore {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        ensure_key(key)?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.prepare_cached(
            "INSERT INTO kv (k, v) VALUES (?1, ?2)
             ON CONFLICT(k) DO UPDATE SET v = excluded.v",
        )?
        .execute(params![key, value])?;
        Ok(())
    }

    fn set_bulk(&self, kvs: &[Kv]) -> Result<()> {
        ensure_keys(kvs.iter().map(|kv| kv.key.as_slice()))?;
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO kv (k, v) VALUES (?1, ?2)
                 ON CONFLICT(k) DO UPDATE SET v = excluded.v",
            )?;
            for kv in kvs {
                stmt.execute(params![kv.key, kv.value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        ensure_key(key)?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        Self::lookup(&conn, key)
    }

    fn get_bulk(&self, keys: &[&[u8]]) -> Result<Vec<Kv>> {
        ensure_keys(keys.iter().copied())?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        keys.iter()
            .map(|key| -> Result<Kv> { Ok(Kv::new(*key, Self::lookup(&conn, key)?)) })
            .collect()
    }

    fn del(&self, key: &[u8]) -> Result<()> {
        ensure_key(key)?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.prepare_cached("DELETE FROM kv WHERE k = ?1")?
            .execute(params![key])?;
        Ok(())
    }

    fn del_bulk(&self, keys: &[&[u8]]) -> Result<()> {
        ensure_keys(keys.iter().copied())?;
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM kv WHERE k = ?1")?;
            for key in keys {
                stmt.execute(params![key])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn scan(&self, prefix: &[u8], limit: i64, with_values: bool) -> Result<Vec<Kv>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        // SQLite treats a negative LIMIT as unbounded, matching the contract.
        let column = if with_values { "v" } else { "x''" };

        let rows = match prefix_upper_bound(prefix) {
            Some(upper) => {
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT k, {column} FROM kv WHERE k >= ?1 AND k < ?2 ORDER BY k LIMIT ?3"
                ))?;
                let iter = stmt.query_map(params![prefix, upper, limit], |row| {
                    Ok(Kv::new(row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?;
                iter.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT k, {column} FROM kv WHERE k >= ?1 ORDER BY k LIMIT ?2"
                ))?;
                let iter = stmt.query_map(params![prefix, limit], |row| {
                    Ok(Kv::new(row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?;
                iter.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(rows)
    }

    fn flush(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("DELETE FROM kv", [])?;
        if !self.memory {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        let conn = self.conn.into_inner().unwrap_or_else(|e| e.into_inner());
        conn.close().map_err(|(_, e)| e)?;
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn test_set_overwrite() {
        let store = SqliteStore::open_memory().unwrap();
        store.set(b"key", b"value1").unwrap();
        store.set(b"key", b"value2").unwrap();
        assert_eq!(store.get(b"key").unwrap(), b"value2".to_vec());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_scan_prefix_sorted() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .set_bulk(&[
                Kv::new("b2", "x"),
                Kv::new("a1", "x"),
                Kv::new("b1", "y"),
                Kv::new("c1", "z"),
            ])
            .unwrap();

        let found = store.scan(b"b", -1, true).unwrap();
        let keys: Vec<_> = found.iter().map(|kv| kv.key.clone()).collect();
        assert_eq!(keys, vec![b"b1".to_vec(), b"b2".to_vec()]);
        assert_eq!(found[0].value, b"y".to_vec());

        let limited = store.scan(b"", 2, false).unwrap();
        assert_eq!(limited.len(), 2);
        assert!(limited.iter().all(|kv| kv.value.is_empty()));
    }

    #[test]
    fn test_flush_clears_rows() {
        let store = SqliteStore::open_memory().unwrap();
        store.set(b"k", b"v").unwrap();
        store.flush().unwrap();
        assert!(store.get(b"k").unwrap().is_empty());
    }
}
