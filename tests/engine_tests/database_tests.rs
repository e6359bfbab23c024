//! Tests for Database
//!
//! These tests verify:
//! - Point reads and writes (empty keys and values included)
//! - Multi-key reads
//! - Write batches: ordering, atomicity, reuse
//! - Handle lifecycle: open errors, AlreadyOpen, InvalidState after close
//! - Persistence across close/reopen, flush and compaction

use std::fs;

use ordkv::{Config, Database, Direction, ErrorKind, WriteBatch};
use tempfile::TempDir;

use crate::common::{all_keys, keys, setup_temp_db, test_config};

// =============================================================================
// Point Operation Tests
// =============================================================================

#[test]
fn test_put_get_round_trip() {
    let (_temp, db) = setup_temp_db();

    db.put(b"alpha", b"1").unwrap();
    db.put(b"", b"empty key").unwrap();
    db.put(b"empty value", b"").unwrap();

    assert_eq!(db.get(b"alpha").unwrap(), Some(b"1".to_vec()));
    assert_eq!(db.get(b"").unwrap(), Some(b"empty key".to_vec()));
    assert_eq!(db.get(b"empty value").unwrap(), Some(Vec::new()));
    assert_eq!(db.get(b"missing").unwrap(), None);
}

#[test]
fn test_binary_keys_and_values() {
    let (_temp, db) = setup_temp_db();
    let key = vec![0x00, 0xFF, 0x10, 0x00];
    let value: Vec<u8> = (0..=255).collect();

    db.put(&key, &value).unwrap();

    assert_eq!(db.get(&key).unwrap(), Some(value));
}

#[test]
fn test_put_overwrites() {
    let (_temp, db) = setup_temp_db();

    db.put(b"k", b"v1").unwrap();
    db.put(b"k", b"v2").unwrap();

    assert_eq!(db.get(b"k").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn test_delete_and_idempotent_delete() {
    let (_temp, db) = setup_temp_db();

    db.put(b"k", b"v").unwrap();
    db.delete(b"k").unwrap();
    assert_eq!(db.get(b"k").unwrap(), None);

    db.delete(b"k").unwrap();
    db.delete(b"never-existed").unwrap();
    assert_eq!(db.get(b"k").unwrap(), None);
}

#[test]
fn test_delete_shadows_flushed_value() {
    let (_temp, db) = setup_temp_db();

    db.put(b"k", b"v").unwrap();
    db.flush().unwrap();
    db.delete(b"k").unwrap();

    assert_eq!(db.get(b"k").unwrap(), None);
    db.flush().unwrap();
    assert_eq!(db.get(b"k").unwrap(), None);
}

// =============================================================================
// Multi-Get Tests
// =============================================================================

#[test]
fn test_multi_get_order_and_absence() {
    let (_temp, db) = setup_temp_db();
    db.put(b"a", b"1").unwrap();
    db.put(b"c", b"3").unwrap();
    db.flush().unwrap();
    db.put(b"b", b"2").unwrap();

    let values = db.multi_get([b"c".as_slice(), b"x", b"a", b"b", b"c"]).unwrap();

    assert_eq!(
        values,
        vec![
            Some(b"3".to_vec()),
            None,
            Some(b"1".to_vec()),
            Some(b"2".to_vec()),
            Some(b"3".to_vec()),
        ]
    );
}

#[test]
fn test_multi_get_empty() {
    let (_temp, db) = setup_temp_db();
    let none: Vec<Vec<u8>> = Vec::new();

    assert!(db.multi_get(none).unwrap().is_empty());
}

// =============================================================================
// Write Batch Tests
// =============================================================================

#[test]
fn test_batch_applies_all() {
    let (_temp, db) = setup_temp_db();
    db.put(b"old", b"x").unwrap();

    let mut batch = WriteBatch::new();
    batch.put(b"a", b"1").put(b"b", b"2").delete(b"old");
    db.write(&batch).unwrap();

    assert_eq!(all_keys(&db, Direction::Forward), keys(&["a", "b"]));
}

#[test]
fn test_batch_same_key_last_wins() {
    let (_temp, db) = setup_temp_db();

    let mut batch = WriteBatch::new();
    batch.put(b"k1", b"v").delete(b"k1");
    batch.delete(b"k2").put(b"k2", b"v2");
    batch.put(b"k3", b"first").put(b"k3", b"second");
    db.write(&batch).unwrap();

    assert_eq!(db.get(b"k1").unwrap(), None);
    assert_eq!(db.get(b"k2").unwrap(), Some(b"v2".to_vec()));
    assert_eq!(db.get(b"k3").unwrap(), Some(b"second".to_vec()));
}

#[test]
fn test_empty_batch_is_noop() {
    let (_temp, db) = setup_temp_db();
    db.put(b"k", b"v").unwrap();
    let before = db.stats().unwrap().next_lsn;

    db.write(&WriteBatch::new()).unwrap();

    assert_eq!(db.stats().unwrap().next_lsn, before);
    assert_eq!(all_keys(&db, Direction::Forward), keys(&["k"]));
}

#[test]
fn test_batch_is_reusable_across_databases() {
    let (_temp_a, a) = setup_temp_db();
    let (_temp_b, b) = setup_temp_db();

    let mut batch = WriteBatch::new();
    batch.put(b"x", b"1").put(b"y", b"2");

    a.write(&batch).unwrap();
    a.write(&batch).unwrap();
    b.write(&batch).unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(all_keys(&a, Direction::Forward), keys(&["x", "y"]));
    assert_eq!(all_keys(&b, Direction::Forward), keys(&["x", "y"]));
}

#[test]
fn test_large_batch_persists() {
    let temp = TempDir::new().unwrap();
    {
        let db = Database::open_with_config(test_config(&temp)).unwrap();
        let mut batch = WriteBatch::new();
        for i in 0..100 {
            batch.put(format!("k{:03}", i), b"v");
        }
        db.write(&batch).unwrap();
    }

    let db = Database::open(temp.path(), false).unwrap();
    assert_eq!(all_keys(&db, Direction::Forward).len(), 100);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_open_missing_path_without_create() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing");

    let err = Database::open(&missing, false).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PathError);
    assert!(!missing.exists());
}

#[test]
fn test_open_creates_fresh_path() {
    let temp = TempDir::new().unwrap();
    let fresh = temp.path().join("a").join("b");

    let db = Database::open(&fresh, true).unwrap();

    assert!(fresh.is_dir());
    assert!(all_keys(&db, Direction::Forward).is_empty());
    assert_eq!(db.path(), fresh.canonicalize().unwrap());
}

#[test]
fn test_open_file_path_rejected() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("file");
    fs::write(&file, b"not a db").unwrap();

    let err = Database::open(&file, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathError);
}

#[test]
fn test_double_open_rejected() {
    let (temp, db) = setup_temp_db();

    let err = Database::open(temp.path(), false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyOpen);

    // Through a different spelling of the same directory
    let dotted = temp.path().join(".");
    let err = Database::open(&dotted, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyOpen);

    db.close().unwrap();
    Database::open(temp.path(), false).unwrap();
}

#[test]
fn test_operations_after_close_fail() {
    let (_temp, db) = setup_temp_db();
    db.put(b"k", b"v").unwrap();
    db.close().unwrap();

    let kind = ErrorKind::InvalidState;
    assert_eq!(db.get(b"k").unwrap_err().kind(), kind);
    assert_eq!(db.put(b"k", b"v").unwrap_err().kind(), kind);
    assert_eq!(db.delete(b"k").unwrap_err().kind(), kind);
    assert_eq!(db.multi_get([b"k"]).unwrap_err().kind(), kind);
    assert_eq!(db.write(&WriteBatch::new()).unwrap_err().kind(), kind);
    assert_eq!(db.iterator(Direction::Forward).unwrap_err().kind(), kind);
    assert_eq!(db.iterate_from(b"k", Direction::Reverse).unwrap_err().kind(), kind);
    assert_eq!(db.flush().unwrap_err().kind(), kind);
    assert_eq!(db.compact().unwrap_err().kind(), kind);
    assert_eq!(db.stats().unwrap_err().kind(), kind);

    // Closing again is fine
    db.close().unwrap();
    assert!(!db.is_open());
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_data_survives_close_and_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let db = Database::open(temp.path(), false).unwrap();
        db.put(b"a", b"1").unwrap();
        db.put(b"b", b"2").unwrap();
        db.delete(b"a").unwrap();
        db.close().unwrap();
    }

    let db = Database::open(temp.path(), false).unwrap();
    assert_eq!(db.get(b"a").unwrap(), None);
    assert_eq!(db.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_data_survives_flush_and_compaction() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .memtable_size_limit(256)
        .compaction_trigger(Some(4))
        .build();
    {
        let db = Database::open_with_config(config.clone()).unwrap();
        for i in 0..200 {
            db.put(format!("key{:03}", i), format!("value{}", i)).unwrap();
        }
        for i in (0..200).step_by(2) {
            db.delete(format!("key{:03}", i)).unwrap();
        }
        db.compact().unwrap();
    }

    let db = Database::open_with_config(config).unwrap();
    let remaining = all_keys(&db, Direction::Forward);
    assert_eq!(remaining.len(), 100);
    assert_eq!(remaining[0], b"key001".to_vec());
    assert_eq!(db.get(b"key199").unwrap(), Some(b"value199".to_vec()));
    assert_eq!(db.get(b"key198").unwrap(), None);
    assert_eq!(db.stats().unwrap().sstable_count, 1);
}

#[test]
fn test_fully_emptied_table_iterates_empty() {
    let (_temp, db) = setup_temp_db();
    for key in ["a", "b", "c"] {
        db.put(key, "v").unwrap();
    }
    db.flush().unwrap();
    for key in ["a", "b", "c"] {
        db.delete(key).unwrap();
    }

    assert!(all_keys(&db, Direction::Forward).is_empty());
    assert!(all_keys(&db, Direction::Reverse).is_empty());

    db.compact().unwrap();
    assert!(all_keys(&db, Direction::Forward).is_empty());
}
