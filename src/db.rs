//! Database handle
//!
//! [`Database`] is the public entry point. It owns an [`Engine`] while open
//! and nothing once closed:
//!
//! ```text
//! open() ──► Open ──close()──► Closed
//!             │                  │
//!        all operations     every operation → InvalidState
//! ```
//!
//! Handles are cheap to clone and share one underlying engine, so a database
//! can be used from many threads at once. Closing through any clone closes
//! it for all of them, including live cursors.

use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::batch::WriteBatch;
use crate::config::Config;
use crate::cursor::Cursor;
use crate::engine::{Engine, EngineStats};
use crate::error::{KvError, Result};
use crate::storage::CompactionStats;
use crate::types::Direction;

/// State shared between a database handle, its clones and its cursors
pub(crate) struct Shared {
    path: PathBuf,
    prefetch: usize,
    /// `Some` while open
    engine: RwLock<Option<Engine>>,
}

impl Shared {
    /// Run `f` against the engine, or fail if closed.
    ///
    /// The read guard is held for the whole call, so `close` waits for
    /// in-flight operations to finish.
    pub(crate) fn with_engine<T>(&self, f: impl FnOnce(&Engine) -> Result<T>) -> Result<T> {
        let guard = self.engine.read();
        match guard.as_ref() {
            Some(engine) => f(engine),
            None => Err(KvError::closed()),
        }
    }

    pub(crate) fn prefetch(&self) -> usize {
        self.prefetch
    }

    pub(crate) fn is_open(&self) -> bool {
        self.engine.read().is_some()
    }

    fn close(&self) -> Result<()> {
        let engine = self.engine.write().take();
        match engine {
            Some(engine) => {
                let result = engine.close();
                drop(engine);
                info!(path = %self.path.display(), "Database closed");
                result
            }
            None => Ok(()),
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "Error closing database on drop");
        }
    }
}

/// A persistent, ordered key-value database
#[derive(Clone)]
pub struct Database {
    shared: Arc<Shared>,
}

impl Database {
    /// Open the database at `path` with default settings.
    ///
    /// # Errors
    ///
    /// - `PathError` if `path` is missing (and `create_if_missing` is false),
    ///   not a directory, or inaccessible
    /// - `AlreadyOpen` if another live handle owns `path`
    /// - `StorageFailure` if existing data cannot be read
    pub fn open(path: impl AsRef<Path>, create_if_missing: bool) -> Result<Self> {
        let config = Config::builder()
            .data_dir(path.as_ref())
            .create_if_missing(create_if_missing)
            .build();
        Self::open_with_config(config)
    }

    /// Open the database described by `config`
    pub fn open_with_config(config: Config) -> Result<Self> {
        let prefetch = config.cursor_prefetch.max(1);
        let engine = Engine::open(config)?;
        let path = engine.data_dir().to_path_buf();

        info!(path = %path.display(), "Database opened");

        Ok(Self {
            shared: Arc::new(Shared {
                path,
                prefetch,
                engine: RwLock::new(Some(engine)),
            }),
        })
    }

    /// Value stored under `key`, or `None`
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        self.shared.with_engine(|engine| engine.get(key.as_ref()))
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn put(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        self.shared
            .with_engine(|engine| engine.put(key.as_ref(), value.as_ref()))
    }

    /// Remove `key`. Removing an absent key succeeds.
    pub fn delete(&self, key: impl AsRef<[u8]>) -> Result<()> {
        self.shared.with_engine(|engine| engine.delete(key.as_ref()))
    }

    /// Look up several keys at once.
    ///
    /// The result has one slot per input key, in input order. All keys are
    /// resolved against the same snapshot.
    pub fn multi_get<I, K>(&self, keys: I) -> Result<Vec<Option<Vec<u8>>>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        self.shared.with_engine(|engine| engine.multi_get(keys))
    }

    /// Apply every operation in `batch` atomically, in order.
    ///
    /// Readers observe either none or all of the batch. The batch itself is
    /// left untouched and may be applied again.
    pub fn write(&self, batch: &WriteBatch) -> Result<()> {
        self.shared
            .with_engine(|engine| engine.write(batch.operations()))
    }

    /// Cursor over every entry in `direction`
    pub fn iterator(&self, direction: Direction) -> Result<Cursor> {
        self.cursor(Bound::Unbounded, direction)
    }

    /// Cursor starting at `key` in `direction`.
    ///
    /// Forward cursors begin at the first key `>= key`; reverse cursors begin
    /// at the last key `<= key`. `key` itself need not exist.
    pub fn iterate_from(&self, key: impl AsRef<[u8]>, direction: Direction) -> Result<Cursor> {
        self.cursor(Bound::Included(key.as_ref().to_vec()), direction)
    }

    fn cursor(&self, start: Bound<Vec<u8>>, direction: Direction) -> Result<Cursor> {
        // Fail now rather than on the first `next()`
        self.shared.with_engine(|_| Ok(()))?;
        Ok(Cursor::new(Arc::clone(&self.shared), start, direction))
    }

    /// Write the memtable out to an SSTable
    pub fn flush(&self) -> Result<()> {
        self.shared.with_engine(Engine::flush)
    }

    /// Flush, then merge all SSTables into one
    pub fn compact(&self) -> Result<Option<CompactionStats>> {
        self.shared.with_engine(Engine::compact)
    }

    /// Flush pending data and release the directory.
    ///
    /// Closing an already closed database is a no-op. Afterwards every
    /// operation on this handle, its clones and its cursors fails with
    /// `InvalidState`, and the path may be opened again.
    pub fn close(&self) -> Result<()> {
        self.shared.close()
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    /// Canonical path of the database directory
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn stats(&self) -> Result<EngineStats> {
        self.shared.with_engine(|engine| Ok(engine.stats()))
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.shared.path)
            .field("open", &self.is_open())
            .finish()
    }
}
