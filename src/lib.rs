//! # ordkv
//!
//! An embedded, persistent, ordered key-value store with:
//! - Byte-string keys kept in lexicographic order
//! - Point reads, multi-key reads and atomic write batches
//! - Forward and reverse cursors from any start key
//! - Write-Ahead Logging (WAL) for durability and crash recovery
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Database (handle lifecycle)                  │
//! │        get · put · delete · multi_get · write · cursor       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Engine (storage table)                      │
//! │            (Single Writer / Multi Reader)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append)   │          │  (RwLock)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ flush
//!                                   ▼
//!                           ┌─────────────┐
//!                           │   Storage   │
//!                           │  (SSTable)  │
//!                           └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use ordkv::{Database, Direction, WriteBatch};
//!
//! # fn main() -> ordkv::Result<()> {
//! let db = Database::open("/tmp/ordkv-demo", true)?;
//! db.put(b"b", b"2")?;
//!
//! let mut batch = WriteBatch::new();
//! batch.put(b"a", b"1").delete(b"b");
//! db.write(&batch)?;
//!
//! for entry in db.iterator(Direction::Forward)? {
//!     let (key, value) = entry?;
//!     println!("{:?} = {:?}", key, value);
//! }
//! db.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod types;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod engine;

pub mod batch;
pub mod cursor;
pub mod db;
pub mod dir;
pub mod rlimit;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use batch::WriteBatch;
pub use config::{Config, WalSyncStrategy};
pub use cursor::Cursor;
pub use db::Database;
pub use engine::{Engine, EngineStats};
pub use error::{ErrorKind, KvError, Result};
pub use rlimit::raise_fd_limit;
pub use types::{Direction, KvPair, ParseDirectionError};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ordkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
