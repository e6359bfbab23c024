//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Single-writer/multi-reader access pattern
//! - Apply a whole batch under one write lock so readers never see half of it
//! - Track size for flush triggers
//! - Ordered iteration in both directions for cursors and SSTable creation
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock:
//! - Ordered keys (required for SSTable generation and range scans)
//! - `range` gives double-ended iteration for reverse cursors

mod table;

pub use table::{MemTable, MemTableView};

pub use crate::types::Record as MemTableEntry;
