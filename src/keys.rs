//! Key and value synthesis for the benchmark workloads.
//!
//! Sequential keys are a one-byte tag followed by the big-endian index, so
//! byte order equals numeric order. Workers partition the index space by
//! stride: worker `i` of `W` visits `i, i + W, i + 2W, ...`.

use rand::RngCore;

use crate::store::Kv;

/// Leading byte of every sequential key.
pub const KEY_TAG: u8 = b'k';

/// Encoded length of a sequential key.
pub const KEY_LEN: usize = 9;

/// Encode a sequential key.
pub fn seq_key(index: u64) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    key[0] = KEY_TAG;
    key[1..].copy_from_slice(&index.to_be_bytes());
    key
}

/// Decode a key produced by [`seq_key`].
pub fn seq_index(key: &[u8]) -> Option<u64> {
    if key.len() != KEY_LEN || key[0] != KEY_TAG {
        return None;
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&key[1..]);
    Some(u64::from_be_bytes(raw))
}

/// A worker's private position in the sequential key space.
#[derive(Debug, Clone)]
pub struct KeyCursor {
    start: u64,
    stride: u64,
    limit: Option<u64>,
    next: u64,
}

impl KeyCursor {
    /// Cursor for `worker` out of `workers`, optionally wrapping at `limit`.
    pub fn new(worker: usize, workers: usize, limit: Option<u64>) -> Self {
        let start = worker as u64;
        Self {
            start,
            stride: workers.max(1) as u64,
            limit,
            next: start,
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// False when the key range ends before this worker's first index, so
    /// the worker has no keys of its own.
    pub fn has_keys(&self) -> bool {
        self.limit.map_or(true, |limit| self.start < limit)
    }

    /// Index the cursor points at.
    pub fn current(&self) -> u64 {
        self.next
    }

    /// Return the current index and move one stride forward, looping back
    /// to the start once the key range is covered.
    pub fn advance(&mut self) -> u64 {
        let current = self.next;
        self.next = match current.checked_add(self.stride) {
            Some(n) if self.limit.map_or(true, |limit| n < limit) => n,
            _ => self.start,
        };
        current
    }

    /// Go back to the starting index.
    pub fn reset(&mut self) {
        self.next = self.start;
    }

    /// Current key, then advance.
    pub fn next_key(&mut self) -> [u8; KEY_LEN] {
        seq_key(self.advance())
    }
}

/// A fixed-size batch of records re-randomized before every submission.
pub struct RandomBatch {
    kvs: Vec<Kv>,
}

impl RandomBatch {
    /// Keys start out as sequential keys so their length is fixed; values
    /// are `value_size` bytes.
    pub fn new(batch_size: usize, value_size: usize) -> Self {
        let kvs = (0..batch_size as u64)
            .map(|i| Kv::new(seq_key(i).to_vec(), vec![0u8; value_size]))
            .collect();
        Self { kvs }
    }

    /// Overwrite every key and value with fresh random bytes.
    pub fn refill<R: RngCore + ?Sized>(&mut self, rng: &mut R) -> &[Kv] {
        for kv in &mut self.kvs {
            rng.fill_bytes(&mut kv.key);
            rng.fill_bytes(&mut kv.value);
        }
        &self.kvs
    }

    pub fn records(&self) -> &[Kv] {
        &self.kvs
    }

    pub fn len(&self) -> usize {
        self.kvs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kvs.is_empty()
    }
}

/// Filler value reused where payload identity does not matter.
pub fn filler_value(size: usize) -> Vec<u8> {
    vec![0u8; size]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_seq_key_layout() {
        let key = seq_key(0x0102);
        assert_eq!(key.len(), KEY_LEN);
        assert_eq!(key[0], b'k');
        assert_eq!(&key[1..], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
        assert_eq!(seq_index(&key), Some(0x0102));
        assert_eq!(seq_index(b"short"), None);
    }

    #[test]
    fn test_seq_key_order_matches_numeric() {
        let mut keys: Vec<_> = [300u64, 2, 70_000, 1, 256].iter().map(|i| seq_key(*i)).collect();
        keys.sort();
        let indices: Vec<_> = keys.iter().filter_map(|k| seq_index(k)).collect();
        assert_eq!(indices, vec![1, 2, 256, 300, 70_000]);
    }

    #[test]
    fn test_cursor_stride_and_reset() {
        let mut cursor = KeyCursor::new(1, 4, None);
        assert_eq!(cursor.advance(), 1);
        assert_eq!(cursor.advance(), 5);
        assert_eq!(cursor.current(), 9);
        cursor.reset();
        assert_eq!(cursor.advance(), 1);
    }

    #[test]
    fn test_cursor_wraps_at_limit() {
        let mut cursor = KeyCursor::new(2, 3, Some(10));
        let visited: Vec<_> = (0..5).map(|_| cursor.advance()).collect();
        assert_eq!(visited, vec![2, 5, 8, 2, 5]);
    }

    #[test]
    fn test_cursor_beyond_limit_has_no_keys() {
        assert!(KeyCursor::new(1, 4, Some(2)).has_keys());
        assert!(!KeyCursor::new(2, 4, Some(2)).has_keys());
        assert!(!KeyCursor::new(3, 4, Some(2)).has_keys());
        assert!(KeyCursor::new(3, 4, None).has_keys());
    }

    #[test]
    fn test_random_batch_refill() {
        let mut batch = RandomBatch::new(16, 32);
        let mut rng = rand::thread_rng();
        let records = batch.refill(&mut rng);
        assert_eq!(records.len(), 16);
        assert!(records.iter().all(|kv| kv.key.len() == KEY_LEN && kv.value.len() == 32));
        let distinct: BTreeSet<_> = records.iter().map(|kv| kv.key.clone()).collect();
        assert!(distinct.len() > 1);
    }

    proptest! {
        #[test]
        fn prop_stride_partition_covers_range(workers in 1usize..16, range in 0u64..500) {
            let mut seen = BTreeSet::new();
            for w in 0..workers {
                let mut cursor = KeyCursor::new(w, workers, None);
                while cursor.current() < range {
                    prop_assert!(seen.insert(cursor.advance()), "index visited twice");
                }
            }
            let expected: BTreeSet<u64> = (0..range).collect();
            prop_assert_eq!(seen, expected);
        }
    }
}
