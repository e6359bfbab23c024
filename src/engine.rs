//! Engine Module
//!
//! The storage table: coordinates WAL, MemTable and SSTables behind one
//! mutation entry point and a consistent read path.
//!
//! ## Responsibilities
//! - Log every mutation (single op or whole batch) as one WAL entry
//! - Apply mutations to the MemTable atomically
//! - Flush the MemTable when full and compact SSTables when there are many
//! - Serve point, multi-key and range reads
//! - Crash recovery on startup

use std::ops::Bound;
use std::path::Path;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dir::DataDir;
use crate::error::Result;
use crate::memtable::{MemTable, MemTableView};
use crate::storage::{
    CompactionStats, MergeIterator, MergeSource, Pending, StorageManager, StorageView,
};
use crate::types::{Direction, KvPair, Record};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// Point-in-time counters for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    /// Entries in the memtable (tombstones included)
    pub memtable_entries: usize,
    /// Approximate memtable size in bytes
    pub memtable_bytes: usize,
    /// Number of SSTables on disk
    pub sstable_count: usize,
    /// Total SSTable bytes on disk
    pub sstable_bytes: u64,
    /// LSN the next mutation will receive
    pub next_lsn: u64,
}

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader
///
/// - **Writes** (put/delete/batch/flush/compact): serialized by the `wal`
///   mutex. Each mutation is one WAL append followed by one memtable apply,
///   so mutations are linearizable.
/// - **Reads** (get/multi_get/scan): lock the memtable, then the SSTable
///   list, both shared. A flush publishes its SSTable before clearing the
///   memtable, so a reader holding both views never misses flushed data.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Write-ahead log; holding this lock serializes every mutation
    wal: Mutex<WalWriter>,

    /// In-memory table for recent writes (internal RwLock)
    memtable: MemTable,

    /// Persistent storage manager (internal RwLock on sstables vec)
    storage: StorageManager,

    /// Owned data directory (registry entry + LOCK). Must stay the last
    /// field: it is released only after the file handles above are closed.
    dir: DataDir,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate and lock the data directory
    /// 2. Load existing SSTables
    /// 3. Recover from WAL if it exists, replaying into the memtable
    /// 4. Flush recovered data and truncate the WAL
    pub fn open(config: Config) -> Result<Self> {
        let dir = DataDir::open(&config.data_dir, config.create_if_missing)?;
        let storage = StorageManager::open(&dir.sstable_dir())?;
        let memtable = MemTable::new();

        let wal_path = dir.wal_path();
        let mut next_lsn = 1;

        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;

            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                info!(
                    recovered = recovery.entries_recovered,
                    corrupted = recovery.entries_corrupted,
                    last_lsn = recovery.last_lsn,
                    truncated = recovery.was_truncated,
                    "WAL recovery"
                );
            }

            for entry in &entries {
                memtable.apply(&entry.operations);
            }
            next_lsn = recovery.last_lsn + 1;

            // Make recovered data durable in an SSTable before the WAL is reset
            if !memtable.is_empty() {
                info!(entries = memtable.entry_count(), "Flushing recovered entries");
                storage.flush(&memtable)?;
                memtable.clear();
            }
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy, next_lsn)?;
        if !wal.is_empty() {
            wal.truncate()?;
        }

        info!(
            path = %dir.path().display(),
            sstables = storage.sstable_count(),
            "Engine opened"
        );

        Ok(Self {
            config,
            wal: Mutex::new(wal),
            memtable,
            storage,
            dir,
        })
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. SSTables (newest to oldest)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mem = self.memtable.view();
        let disk = self.storage.view();
        Self::lookup(&mem, &disk, key)
    }

    /// Get several keys against one consistent view
    ///
    /// Results are in input order; duplicates are preserved.
    pub fn multi_get<I, K>(&self, keys: I) -> Result<Vec<Option<Vec<u8>>>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let mem = self.memtable.view();
        let disk = self.storage.view();
        keys.into_iter()
            .map(|key| Self::lookup(&mem, &disk, key.as_ref()))
            .collect()
    }

    fn lookup(mem: &MemTableView<'_>, disk: &StorageView<'_>, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(record) = mem.get(key) {
            return Ok(record.clone().into_value());
        }
        Ok(disk.get(key)?.and_then(Record::into_value))
    }

    /// Put a key-value pair
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write(&[Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        }])
    }

    /// Delete a key (absent keys are fine)
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.write(&[Operation::Delete { key: key.to_vec() }])
    }

    /// Apply operations atomically, in order
    ///
    /// Steps:
    /// 1. Acquire the writer lock
    /// 2. Append all operations to the WAL as one entry
    /// 3. Apply all operations to the MemTable under one lock
    /// 4. Flush if the MemTable is full
    ///
    /// If step 2 fails nothing is visible. Once step 2 succeeds the mutation
    /// is committed; a failed flush in step 4 is logged and retried on the
    /// next write rather than reported.
    pub fn write(&self, operations: &[Operation]) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }

        let mut wal = self.wal.lock();
        let lsn = wal.append(operations)?;
        let size = self.memtable.apply(operations);
        debug!(lsn, ops = operations.len(), memtable_bytes = size, "Committed");

        if self.memtable.should_flush(self.config.memtable_size_limit) {
            if let Err(e) = self.flush_locked(&mut wal) {
                warn!(error = %e, "Flush after commit failed; will retry on next write");
            }
        }
        Ok(())
    }

    /// Read up to `limit` live entries from `start` in `direction`
    ///
    /// `start` is inclusive or exclusive per its `Bound`; `Unbounded` starts
    /// at the first (forward) or last (reverse) key.
    pub fn scan(&self, start: Bound<&[u8]>, direction: Direction, limit: usize) -> Result<Vec<KvPair>> {
        let mem = self.memtable.view();
        let disk = self.storage.view();

        let memory: MergeSource<'_> = Box::new(
            mem.range(start, direction)
                .map(|(key, record)| (key, Pending::Memory(record))),
        );
        let mut sources = Vec::with_capacity(disk.tables().len() + 1);
        sources.push(memory);
        sources.extend(disk.sources(start, direction));

        let mut out = Vec::with_capacity(limit.min(1024));
        for (key, pending) in MergeIterator::new(sources, direction) {
            if out.len() >= limit {
                break;
            }
            if let Record::Value(value) = pending.resolve()? {
                out.push((key.to_vec(), value));
            }
        }
        Ok(out)
    }

    /// Flush memtable to disk (public API)
    ///
    /// Forces a flush regardless of memtable size
    pub fn flush(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        self.flush_locked(&mut wal)
    }

    /// Internal flush implementation (called with writer lock held)
    fn flush_locked(&self, wal: &mut WalWriter) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        // Publish the SSTable before clearing: readers must always find the
        // data in one place or the other.
        self.storage.flush(&self.memtable)?;
        self.memtable.clear();

        // Entries are now durable in the SSTable
        wal.truncate()?;

        if let Some(trigger) = self.config.compaction_trigger {
            if self.storage.sstable_count() >= trigger.max(2) {
                if let Err(e) = self.storage.compact() {
                    warn!(error = %e, "Automatic compaction failed");
                }
            }
        }

        Ok(())
    }

    /// Flush the memtable, then merge every SSTable into one
    pub fn compact(&self) -> Result<Option<CompactionStats>> {
        let mut wal = self.wal.lock();
        self.flush_locked(&mut wal)?;
        self.storage.compact()
    }

    /// Close the engine gracefully
    ///
    /// Syncs the WAL, flushes any pending data and releases SSTable handles.
    /// The WAL is synced first so acknowledged writes stay recoverable even
    /// when the flush fails. The data directory lock is released when the
    /// engine is dropped.
    pub fn close(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        wal.sync()?;
        self.flush_locked(&mut wal)?;
        self.storage.close();
        info!(path = %self.dir.path().display(), "Engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the canonical data directory path
    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Current counters
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            memtable_entries: self.memtable.entry_count(),
            memtable_bytes: self.memtable.size(),
            sstable_count: self.storage.sstable_count(),
            sstable_bytes: self.storage.total_size(),
            next_lsn: self.wal.lock().current_lsn(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
