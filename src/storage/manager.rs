//! Storage Manager
//!
//! Manages multiple SSTables and coordinates reads/writes.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup (and sweep unfinished `.tmp` files)
//! - Search SSTables newest → oldest for reads
//! - Create new SSTables from MemTable flushes
//! - Full compaction into a single SSTable

use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::error::{KvError, Result};
use crate::memtable::MemTable;
use crate::types::{Direction, Record};

use super::merge::{MergeIterator, MergeSource, Pending};
use super::sstable::TMP_EXTENSION;
use super::{SSTable, SSTableBuilder, SSTableReader};

/// Outcome of a full compaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionStats {
    /// Tables merged
    pub input_tables: usize,
    /// Live entries written to the output table
    pub output_entries: u64,
    /// Tombstones and shadowed versions dropped
    pub dropped_entries: u64,
}

/// Manages the storage layer
///
/// ## Concurrency:
/// - `sstables`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - `next_sstable_id`: Atomic counter (lock-free)
/// - Flush and compaction must be serialized by the caller (the engine's
///   writer lock); reads may run alongside them.
pub struct StorageManager {
    /// Directory where SSTables are stored
    data_dir: PathBuf,

    /// Open SSTable readers, ordered newest → oldest
    sstables: RwLock<Vec<SSTableReader>>,

    /// Next ID for creating new SSTables (atomic, lock-free)
    next_sstable_id: AtomicU64,
}

/// A read-locked view of the SSTable list
pub struct StorageView<'a> {
    tables: RwLockReadGuard<'a, Vec<SSTableReader>>,
}

impl StorageView<'_> {
    /// Look up a key newest → oldest; first value or tombstone wins
    pub fn get(&self, key: &[u8]) -> Result<Option<Record>> {
        for reader in self.tables.iter() {
            // Skip SSTable if key is outside its range (O(1) check)
            if !reader.might_contain(key) {
                continue;
            }
            if let Some(record) = reader.get(key)? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Tables ordered newest → oldest
    pub fn tables(&self) -> &[SSTableReader] {
        &self.tables
    }

    /// One merge source per table, newest first
    pub fn sources<'s>(&'s self, start: Bound<&[u8]>, direction: Direction) -> Vec<MergeSource<'s>> {
        self.tables
            .iter()
            .map(|table| -> MergeSource<'s> {
                Box::new(
                    table
                        .range(start, direction)
                        .map(move |(key, offset)| (key, Pending::Disk { table, offset })),
                )
            })
            .collect()
    }
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Remove leftover `.tmp` files from interrupted flushes/compactions
    /// 3. Discover existing SSTable files
    /// 4. Open readers for each (validates checksums, loads indexes into RAM)
    /// 5. Order by ID descending (newest first)
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut sstable_ids: Vec<u64> = Vec::new();

        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_path = entry.path();

            if !file_path.is_file() {
                continue;
            }
            if file_path.extension().is_some_and(|ext| ext == TMP_EXTENSION) {
                warn!(path = %file_path.display(), "Removing unfinished SSTable");
                fs::remove_file(&file_path)?;
                continue;
            }
            if let Some(id) = Self::parse_sstable_id(&file_path) {
                sstable_ids.push(id);
            }
        }

        // Sort newest first (highest ID first)
        sstable_ids.sort_unstable_by(|a, b| b.cmp(a));

        let mut sstables = Vec::with_capacity(sstable_ids.len());
        for id in &sstable_ids {
            let reader = SSTableReader::open(&Self::sstable_path_with_dir(path, *id))?;
            sstables.push(reader);
        }

        // Next ID = max + 1, or 1 if no SSTables exist
        let next_id = sstable_ids.first().map(|&id| id + 1).unwrap_or(1);

        debug!(dir = %path.display(), tables = sstables.len(), next_id, "Storage opened");

        Ok(Self {
            data_dir: path.to_path_buf(),
            sstables: RwLock::new(sstables),
            next_sstable_id: AtomicU64::new(next_id),
        })
    }

    /// Take a read lock over the table list for consistent reads
    pub fn view(&self) -> StorageView<'_> {
        StorageView {
            tables: self.sstables.read(),
        }
    }

    /// Get a value by key (searches all SSTables newest → oldest)
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found with value
    /// - `Ok(None)`: key not found, or found tombstone (deleted)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.view().get(key)?.and_then(Record::into_value))
    }

    /// Flush a MemTable to a new SSTable
    ///
    /// Creates a new SSTable file from the MemTable's sorted entries
    /// (tombstones included, they must shadow older tables), opens a reader
    /// for it, and adds it to the front of the list.
    pub fn flush(&self, memtable: &MemTable) -> Result<SSTable> {
        let entries = memtable.iter();
        if entries.is_empty() {
            return Err(KvError::Storage("Cannot flush empty MemTable".to_string()));
        }

        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);

        let metadata = Self::build(&path, |builder| {
            for (key, record) in &entries {
                match record {
                    Record::Value(v) => builder.add(key, v)?,
                    Record::Tombstone => builder.add_tombstone(key)?,
                }
            }
            Ok(())
        })?;

        let reader = SSTableReader::open(&path)?;
        self.sstables.write().insert(0, reader);

        info!(
            path = %metadata.path.display(),
            entries = metadata.entry_count,
            bytes = metadata.file_size,
            "Flushed memtable to SSTable"
        );
        Ok(metadata)
    }

    /// Merge every SSTable into one, dropping tombstones and shadowed
    /// versions. Returns `None` when there is nothing to compact.
    ///
    /// Inputs are deleted oldest first: if the process dies part-way, every
    /// surviving newer table still carries its tombstones, so no deleted key
    /// can resurface.
    pub fn compact(&self) -> Result<Option<CompactionStats>> {
        let id = self.next_sstable_id.load(Ordering::SeqCst);
        let path = self.sstable_path(id);

        let (stats, output) = {
            let view = self.view();
            let tables = view.tables();
            if tables.is_empty() {
                return Ok(None);
            }

            let total: u64 = tables.iter().map(|t| t.entry_count()).sum();
            let merged = MergeIterator::new(
                view.sources(Bound::Unbounded, Direction::Forward),
                Direction::Forward,
            );

            let mut builder = SSTableBuilder::new(&path)?;
            let filled: Result<u64> = (|| {
                let mut live = 0u64;
                for (key, pending) in merged {
                    if let Record::Value(v) = pending.resolve()? {
                        builder.add(key, &v)?;
                        live += 1;
                    }
                }
                Ok(live)
            })();
            let live = match filled {
                Ok(live) => live,
                Err(e) => {
                    drop(builder);
                    Self::discard_tmp(&path);
                    return Err(e);
                }
            };

            let output = if live > 0 {
                match builder.finish() {
                    Ok(table) => Some(table),
                    Err(e) => {
                        Self::discard_tmp(&path);
                        return Err(e);
                    }
                }
            } else {
                drop(builder);
                Self::discard_tmp(&path);
                None
            };

            let stats = CompactionStats {
                input_tables: tables.len(),
                output_entries: live,
                dropped_entries: total - live,
            };
            (stats, output)
        };

        let reader = match &output {
            Some(_) => {
                self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
                Some(SSTableReader::open(&path)?)
            }
            None => None,
        };

        let retired: Vec<SSTableReader> = {
            let mut sstables = self.sstables.write();
            let old = std::mem::take(&mut *sstables);
            sstables.extend(reader);
            old
        };

        // `retired` is newest → oldest; delete from the back
        for table in retired.into_iter().rev() {
            let old_path = table.path().to_path_buf();
            drop(table);
            if let Err(e) = fs::remove_file(&old_path) {
                warn!(path = %old_path.display(), error = %e, "Failed to remove compacted SSTable");
            }
        }

        info!(
            inputs = stats.input_tables,
            live = stats.output_entries,
            dropped = stats.dropped_entries,
            "Compaction finished"
        );
        Ok(Some(stats))
    }

    /// Drop all open readers (releases file handles)
    pub fn close(&self) {
        self.sstables.write().clear();
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.sstables.read().len()
    }

    /// Total bytes across all SSTables
    pub fn total_size(&self) -> u64 {
        self.sstables.read().iter().map(|t| t.file_size()).sum()
    }

    /// Get the next SSTable ID (for testing/debugging)
    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Run `fill` against a fresh builder and finish it; on any failure the
    /// partial `.tmp` file is removed.
    fn build<F>(path: &Path, fill: F) -> Result<SSTable>
    where
        F: FnOnce(&mut SSTableBuilder) -> Result<()>,
    {
        let mut builder = SSTableBuilder::new(path)?;
        let result = fill(&mut builder).and_then(|_| builder.finish());
        if result.is_err() {
            Self::discard_tmp(path);
        }
        result
    }

    fn discard_tmp(path: &Path) {
        let tmp = path.with_extension(format!("sst.{}", TMP_EXTENSION));
        if tmp.exists() {
            if let Err(e) = fs::remove_file(&tmp) {
                warn!(path = %tmp.display(), error = %e, "Failed to remove partial SSTable");
            }
        }
    }

    /// Generate the file path for an SSTable with given ID
    fn sstable_path(&self, id: u64) -> PathBuf {
        Self::sstable_path_with_dir(&self.data_dir, id)
    }

    /// Generate SSTable path given a directory and ID
    fn sstable_path_with_dir(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("sstable_{:06}.sst", id))
    }

    /// Parse SSTable ID from filename
    /// "sstable_000042.sst" → Some(42)
    fn parse_sstable_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        let id_str = name.strip_prefix("sstable_")?;
        id_str.parse().ok()
    }
}
