//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{RwLock, RwLockReadGuard};

use crate::types::{Direction, Key, Record};
use crate::wal::Operation;

/// In-memory table for recent writes
pub struct MemTable {
    data: RwLock<BTreeMap<Key, Record>>,
    /// Approximate size in bytes (keys + values)
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Get the entry for a key (value or tombstone), if any
    pub fn get(&self, key: &[u8]) -> Option<Record> {
        self.data.read().get(key).cloned()
    }

    /// Put a key-value pair; returns the new approximate size
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        let mut data = self.data.write();
        self.insert_locked(&mut data, key, Record::Value(value))
    }

    /// Delete a key (inserts tombstone); returns the new approximate size
    pub fn delete(&self, key: Vec<u8>) -> usize {
        let mut data = self.data.write();
        self.insert_locked(&mut data, key, Record::Tombstone)
    }

    /// Apply operations in order under a single write lock.
    ///
    /// Readers observe either none or all of them. Returns the new
    /// approximate size.
    pub fn apply(&self, operations: &[Operation]) -> usize {
        let mut data = self.data.write();
        let mut size = self.size.load(Ordering::Acquire);
        for op in operations {
            size = match op {
                Operation::Put { key, value } => {
                    self.insert_locked(&mut data, key.clone(), Record::Value(value.clone()))
                }
                Operation::Delete { key } => {
                    self.insert_locked(&mut data, key.clone(), Record::Tombstone)
                }
            };
        }
        size
    }

    /// Insert under an already-held write lock. A key counts once toward
    /// the size; a tombstone counts only its key.
    fn insert_locked(&self, data: &mut BTreeMap<Key, Record>, key: Key, record: Record) -> usize {
        let key_len = key.len();
        let value_len = record.payload_len();
        let current = self.size.load(Ordering::Acquire);
        let next = match data.insert(key, record) {
            Some(old) => current - old.payload_len() + value_len,
            None => current + key_len + value_len,
        };
        self.size.store(next, Ordering::Release);
        next
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Get entry count (tombstones included)
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Check if should flush (size >= limit)
    pub fn should_flush(&self, size_limit: usize) -> bool {
        self.size() >= size_limit
    }

    /// Snapshot all entries in sorted key order (for flush)
    pub fn iter(&self) -> Vec<(Key, Record)> {
        let data = self.data.read();
        data.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Hold the read lock for a consistent multi-key or range read
    pub fn view(&self) -> MemTableView<'_> {
        MemTableView {
            data: self.data.read(),
        }
    }

    /// Clear all entries (after successful flush)
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.clear();
        self.size.store(0, Ordering::Release);
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A read-locked view of the memtable
pub struct MemTableView<'a> {
    data: RwLockReadGuard<'a, BTreeMap<Key, Record>>,
}

impl<'a> MemTableView<'a> {
    /// Look up one key
    pub fn get(&self, key: &[u8]) -> Option<&Record> {
        self.data.get(key)
    }

    /// Entries from `start` onward in `direction`.
    ///
    /// Forward ranges cover keys `>= start` (or `> start` when excluded);
    /// reverse ranges cover keys `<= start`, walked from the top down.
    pub fn range<'s>(
        &'s self,
        start: Bound<&[u8]>,
        direction: Direction,
    ) -> Box<dyn Iterator<Item = (&'s [u8], &'s Record)> + 's> {
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = match direction {
            Direction::Forward => (start, Bound::Unbounded),
            Direction::Reverse => (Bound::Unbounded, start),
        };
        let iter = self
            .data
            .range::<[u8], _>(bounds)
            .map(|(k, v)| (k.as_slice(), v));
        match direction {
            Direction::Forward => Box::new(iter),
            Direction::Reverse => Box::new(iter.rev()),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
