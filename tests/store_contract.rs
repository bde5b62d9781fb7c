//! Contract tests run against every engine in both durability modes
//!
//! Run these tests with: cargo test --test store_contract

use kvbench::keys::seq_key;
use kvbench::{Backend, Durability, EngineError, EngineSelection, Kv, KvStore};
use tempfile::TempDir;

const COUNT: u64 = 200;

/// Every engine configuration the contract must hold for.
fn configurations() -> Vec<(EngineSelection, Durability)> {
    let mut out = Vec::new();
    for backend in Backend::ALL {
        for durability in [Durability::Sync, Durability::Buffered] {
            out.push((EngineSelection::new(backend, false), durability));
            if backend.supports_memory() {
                out.push((EngineSelection::new(backend, true), durability));
            }
        }
    }
    out
}

fn for_each_store(check: impl Fn(&str, &dyn KvStore)) {
    for (selection, durability) in configurations() {
        let dir = TempDir::new().unwrap();
        let label = selection.label(durability);
        let store = selection
            .open(dir.path(), durability)
            .unwrap_or_else(|e| panic!("{}: open failed: {}", label, e));
        check(&label, store.as_ref());
        store.close().unwrap();
    }
}

#[test]
fn test_get_absent_is_empty() {
    for_each_store(|label, store| {
        let value = store.get(b"never-written").unwrap();
        assert!(value.is_empty(), "{}", label);
    });
}

#[test]
fn test_set_get_round_trip() {
    let value = vec![7u8; 256];
    for_each_store(|label, store| {
        for i in 0..COUNT {
            store.set(&seq_key(i), &value).unwrap();
        }
        for i in 0..COUNT {
            assert_eq!(store.get(&seq_key(i)).unwrap(), value, "{} key {}", label, i);
        }
    });
}

#[test]
fn test_bulk_round_trip_preserves_order() {
    for_each_store(|label, store| {
        let kvs: Vec<Kv> = (0..50u64)
            .map(|i| Kv::new(seq_key(i).to_vec(), format!("value-{}", i)))
            .collect();
        store.set_bulk(&kvs).unwrap();

        let missing = b"missing".to_vec();
        let mut keys: Vec<&[u8]> = kvs.iter().rev().map(|kv| kv.key.as_slice()).collect();
        keys.insert(10, missing.as_slice());

        let got = store.get_bulk(&keys).unwrap();
        assert_eq!(got.len(), keys.len(), "{}", label);
        for (kv, key) in got.iter().zip(&keys) {
            assert_eq!(kv.key.as_slice(), *key, "{}", label);
        }
        assert!(got[10].value.is_empty(), "{}", label);
        assert_eq!(got[0].value, b"value-49".to_vec(), "{}", label);
    });
}

#[test]
fn test_del_absent_and_del_then_get() {
    for_each_store(|label, store| {
        store.del(b"absent").unwrap();

        store.set(b"doomed", b"x").unwrap();
        store.del(b"doomed").unwrap();
        assert!(store.get(b"doomed").unwrap().is_empty(), "{}", label);

        store
            .set_bulk(&[Kv::new("a", "1"), Kv::new("b", "2")])
            .unwrap();
        store.del_bulk(&[b"a".as_slice(), b"b", b"never"]).unwrap();
        assert!(store.get(b"a").unwrap().is_empty(), "{}", label);
        assert!(store.get(b"b").unwrap().is_empty(), "{}", label);
    });
}

#[test]
fn test_empty_key_rejected_without_side_effect() {
    for_each_store(|label, store| {
        let is_empty_key = |r: Result<(), EngineError>| matches!(r, Err(EngineError::EmptyKey));

        assert!(is_empty_key(store.set(b"", b"v")), "{}", label);
        assert!(matches!(store.get(b""), Err(EngineError::EmptyKey)), "{}", label);
        assert!(is_empty_key(store.del(b"")), "{}", label);
        assert!(
            is_empty_key(store.set_bulk(&[Kv::new("ok", "v"), Kv::new("", "v")])),
            "{}",
            label
        );
        assert!(
            matches!(store.get_bulk(&[b"ok".as_slice(), b""]), Err(EngineError::EmptyKey)),
            "{}",
            label
        );
        assert!(is_empty_key(store.del_bulk(&[b"".as_slice()])), "{}", label);

        assert!(store.get(b"ok").unwrap().is_empty(), "{}: partial bulk write", label);
        assert_eq!(store.len().unwrap(), 0, "{}", label);
    });
}

#[test]
fn test_scan_prefix_or_unsupported() {
    for_each_store(|label, store| {
        store
            .set_bulk(&[
                Kv::new("user:1", "alice"),
                Kv::new("user:2", "bob"),
                Kv::new("user:3", "carol"),
                Kv::new("order:1", "book"),
            ])
            .unwrap();

        match store.scan(b"user:", -1, true) {
            Ok(found) => {
                let keys: Vec<_> = found.iter().map(|kv| kv.key.clone()).collect();
                assert_eq!(
                    keys,
                    vec![b"user:1".to_vec(), b"user:2".to_vec(), b"user:3".to_vec()],
                    "{}",
                    label
                );
                assert_eq!(found[1].value, b"bob".to_vec(), "{}", label);

                let limited = store.scan(b"user:", 2, false).unwrap();
                assert_eq!(limited.len(), 2, "{}", label);
                assert!(limited.iter().all(|kv| kv.value.is_empty()), "{}", label);

                assert!(store.scan(b"nothing", -1, true).unwrap().is_empty(), "{}", label);
            }
            Err(EngineError::Unsupported { op }) => {
                assert_eq!(op, "scan");
                assert!(label.starts_with("map"), "{} should support scan", label);
            }
            Err(e) => panic!("{}: scan failed: {}", label, e),
        }
    });
}

#[test]
fn test_flush_resets_rows() {
    for_each_store(|label, store| {
        for i in 0..10 {
            store.set(&seq_key(i), b"v").unwrap();
        }
        assert_eq!(store.len().unwrap(), 10, "{}", label);
        store.flush().unwrap();
        assert_eq!(store.len().unwrap(), 0, "{}", label);
        // Still usable afterwards.
        store.set(b"after", b"flush").unwrap();
        assert_eq!(store.get(b"after").unwrap(), b"flush".to_vec(), "{}", label);
    });
}

#[test]
fn test_reopen_keeps_data() {
    for backend in [Backend::Sqlite, Backend::Redb] {
        let dir = TempDir::new().unwrap();
        let selection = EngineSelection::new(backend, false);

        let store = selection.open(dir.path(), Durability::Sync).unwrap();
        store.set(b"persist", b"me").unwrap();
        store.close().unwrap();

        let store = selection.open(dir.path(), Durability::Sync).unwrap();
        assert_eq!(store.get(b"persist").unwrap(), b"me".to_vec(), "{}", backend);
        store.close().unwrap();
    }
}

#[test]
fn test_concurrent_use_of_one_handle() {
    for_each_store(|label, store| {
        std::thread::scope(|s| {
            for t in 0..4u64 {
                s.spawn(move || {
                    for i in 0..50u64 {
                        let key = seq_key(t * 1000 + i);
                        store.set(&key, b"v").unwrap();
                        assert_eq!(store.get(&key).unwrap(), b"v".to_vec());
                    }
                });
            }
        });
        assert_eq!(store.get(&seq_key(3049)).unwrap(), b"v".to_vec(), "{}", label);
    });
}
