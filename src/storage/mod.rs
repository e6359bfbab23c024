//! Storage Module
//!
//! Persistent storage layer using SSTables.
//!
//! ## Responsibilities
//! - Persist data to disk in sorted format
//! - Point lookups and bidirectional range scans
//! - Merge memtable and SSTable ranges into one ordered view
//! - Full compaction (drops tombstones and shadowed versions)
//!
//! See [`sstable`] for the on-disk format.

pub mod merge;
pub mod sstable;

mod manager;

pub use manager::{CompactionStats, StorageManager, StorageView};
pub use merge::{MergeIterator, MergeSource, Pending};
pub use sstable::{SSTable, SSTableBuilder, SSTableReader};
