//! MemTableView Tests
//!
//! Tests verify:
//! - Range scans from a start bound, forward and reverse
//! - Tombstones are visible to the view (callers filter them)

use std::ops::Bound;

use ordkv::memtable::{MemTable, MemTableEntry};
use ordkv::Direction;

fn keys(memtable: &MemTable, start: Bound<&[u8]>, direction: Direction) -> Vec<Vec<u8>> {
    let view = memtable.view();
    let out = view.range(start, direction).map(|(k, _)| k.to_vec()).collect();
    out
}

fn sample() -> MemTable {
    let memtable = MemTable::new();
    for key in ["b", "d", "f"] {
        memtable.put(key.as_bytes().to_vec(), b"x".to_vec());
    }
    memtable
}

#[test]
fn test_forward_from_unbounded() {
    let memtable = sample();
    assert_eq!(
        keys(&memtable, Bound::Unbounded, Direction::Forward),
        vec![b"b".to_vec(), b"d".to_vec(), b"f".to_vec()]
    );
}

#[test]
fn test_reverse_from_unbounded() {
    let memtable = sample();
    assert_eq!(
        keys(&memtable, Bound::Unbounded, Direction::Reverse),
        vec![b"f".to_vec(), b"d".to_vec(), b"b".to_vec()]
    );
}

#[test]
fn test_forward_from_missing_key() {
    let memtable = sample();
    assert_eq!(
        keys(&memtable, Bound::Included(b"c".as_slice()), Direction::Forward),
        vec![b"d".to_vec(), b"f".to_vec()]
    );
}

#[test]
fn test_reverse_from_missing_key() {
    let memtable = sample();
    assert_eq!(
        keys(&memtable, Bound::Included(b"e".as_slice()), Direction::Reverse),
        vec![b"d".to_vec(), b"b".to_vec()]
    );
}

#[test]
fn test_excluded_bound_skips_start() {
    let memtable = sample();
    assert_eq!(
        keys(&memtable, Bound::Excluded(b"d".as_slice()), Direction::Forward),
        vec![b"f".to_vec()]
    );
    assert_eq!(
        keys(&memtable, Bound::Excluded(b"d".as_slice()), Direction::Reverse),
        vec![b"b".to_vec()]
    );
}

#[test]
fn test_view_sees_tombstones() {
    let memtable = sample();
    memtable.delete(b"d".to_vec());

    let view = memtable.view();
    assert_eq!(view.len(), 3);
    assert_eq!(view.get(b"d"), Some(&MemTableEntry::Tombstone));
}
