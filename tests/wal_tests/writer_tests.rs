//! Tests for WAL Writer
//!
//! These tests verify:
//! - LSN generation and sequencing
//! - Sync strategies (EveryWrite, EveryNEntries)
//! - Truncation keeps LSNs increasing
//! - Reopening appends after existing content
//! - Failed appends leave the log and the LSN untouched

use std::path::PathBuf;

use ordkv::config::WalSyncStrategy;
use ordkv::wal::{Operation, WalReader, WalWriter, MAX_PAYLOAD_SIZE};
use ordkv::{ErrorKind, KvError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn put(i: usize) -> Vec<Operation> {
    vec![Operation::Put {
        key: format!("key{}", i).into_bytes(),
        value: format!("val{}", i).into_bytes(),
    }]
}

fn read_all(path: &PathBuf) -> Vec<u64> {
    WalReader::open(path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap().lsn)
        .collect()
}

// =============================================================================
// Basic Writing Tests
// =============================================================================

#[test]
fn test_lsn_sequential() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, 1).unwrap();

    for i in 0..50 {
        assert_eq!(writer.append(&put(i)).unwrap(), (i + 1) as u64);
    }
    assert_eq!(writer.current_lsn(), 51);
}

#[test]
fn test_starting_lsn_honoured() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, 42).unwrap();
    assert_eq!(writer.append(&put(0)).unwrap(), 42);
}

#[test]
fn test_batch_is_one_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, 1).unwrap();

    let ops = vec![
        Operation::Put { key: b"a".to_vec(), value: b"1".to_vec() },
        Operation::Put { key: b"b".to_vec(), value: b"2".to_vec() },
        Operation::Delete { key: b"a".to_vec() },
    ];
    writer.append(&ops).unwrap();

    let entries: Vec<_> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap())
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operations, ops);
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_every_n_entries_data_readable() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer =
            WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 10 }, 1).unwrap();
        for i in 0..25 {
            writer.append(&put(i)).unwrap();
        }
        writer.sync().unwrap();
    }
    assert_eq!(read_all(&wal_path).len(), 25);
}

// =============================================================================
// Length / Truncation Tests
// =============================================================================

#[test]
fn test_len_tracks_file_size() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, 1).unwrap();
    assert!(writer.is_empty());

    writer.append(&put(0)).unwrap();
    writer.append(&put(1)).unwrap();

    let on_disk = std::fs::metadata(&wal_path).unwrap().len();
    assert_eq!(writer.len(), on_disk);
}

#[test]
fn test_truncate_keeps_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, 1).unwrap();
    writer.append(&put(0)).unwrap();
    writer.append(&put(1)).unwrap();

    writer.truncate().unwrap();
    assert!(writer.is_empty());
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), 0);

    assert_eq!(writer.append(&put(2)).unwrap(), 3);
    assert_eq!(read_all(&wal_path), vec![3]);
}

#[test]
fn test_reopen_appends() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, 1).unwrap();
        writer.append(&put(0)).unwrap();
        writer.append(&put(1)).unwrap();
    }
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, 3).unwrap();
        writer.append(&put(2)).unwrap();
    }
    assert_eq!(read_all(&wal_path), vec![1, 2, 3]);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_oversized_append_rejected_cleanly() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, 1).unwrap();
    writer.append(&put(0)).unwrap();
    let len_before = writer.len();

    let huge = vec![Operation::Put {
        key: b"big".to_vec(),
        value: vec![0u8; MAX_PAYLOAD_SIZE as usize],
    }];
    let err = writer.append(&huge).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StorageFailure);
    assert_eq!(writer.len(), len_before);
    assert_eq!(writer.current_lsn(), 2);

    // The writer stays usable and the LSN is not burned
    assert_eq!(writer.append(&put(1)).unwrap(), 2);
    assert_eq!(read_all(&wal_path), vec![1, 2]);
}

/// `/dev/full` rejects every write with ENOSPC and cannot be truncated, so
/// both the append and its rollback fail.
#[cfg(target_os = "linux")]
#[test]
fn test_failed_rollback_poisons_writer() {
    let path = std::path::Path::new("/dev/full");
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite, 1).unwrap();

    let first = writer.append(&put(0)).unwrap_err();
    assert!(matches!(first, KvError::Io(_)), "{}", first);
    assert_eq!(first.kind(), ErrorKind::StorageFailure);

    let second = writer.append(&put(1)).unwrap_err();
    assert!(matches!(second, KvError::Storage(_)), "{}", second);
    assert!(second.to_string().contains("unusable"), "{}", second);
    assert_eq!(second.kind(), ErrorKind::StorageFailure);

    assert_eq!(writer.current_lsn(), 1);
}
