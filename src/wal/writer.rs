//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::WalSyncStrategy;
use crate::error::{KvError, Result};

use super::{Operation, WalEntry};

/// Writes entries to the WAL file
///
/// Each `append` writes one complete frame. A failed append is rolled back to
/// the previous file length so the log never carries a torn frame in front of
/// later good ones. If the rollback itself fails the writer is poisoned and
/// rejects further appends.
pub struct WalWriter {
    path: PathBuf,
    file: File,
    /// LSN handed to the next append
    next_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Appends since the last fsync
    unsynced: usize,
    /// Current file length (end of the last complete frame)
    len: u64,
    poisoned: bool,
}

impl WalWriter {
    /// Open or create a WAL file, appending after any existing content.
    ///
    /// `next_lsn` is the LSN the first append will receive; callers pass one
    /// past the last LSN found by recovery.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy, next_lsn: u64) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        let len = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_lsn: next_lsn.max(1),
            sync_strategy,
            unsynced: 0,
            len,
            poisoned: false,
        })
    }

    /// Append the operations as one entry; returns the LSN assigned
    pub fn append(&mut self, operations: &[Operation]) -> Result<u64> {
        if self.poisoned {
            return Err(KvError::Storage(format!(
                "WAL {} is unusable after a failed rollback; reopen the database",
                self.path.display()
            )));
        }

        let lsn = self.next_lsn;
        let frame = WalEntry::encode(lsn, operations)?;

        let synced = match self.write_frame(&frame) {
            Ok(synced) => synced,
            Err(e) => {
                self.rollback();
                return Err(e);
            }
        };

        self.len += frame.len() as u64;
        self.next_lsn += 1;
        self.unsynced = if synced { 0 } else { self.unsynced + 1 };
        Ok(lsn)
    }

    /// Write one frame, syncing if the strategy asks for it. Returns whether
    /// the file was synced.
    fn write_frame(&mut self, frame: &[u8]) -> Result<bool> {
        self.file.write_all(frame)?;
        let must_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced + 1 >= count.max(1),
        };
        if must_sync {
            self.file.sync_data()?;
        }
        Ok(must_sync)
    }

    fn rollback(&mut self) {
        let restored = self
            .file
            .set_len(self.len)
            .and_then(|_| self.file.seek(SeekFrom::Start(self.len)).map(|_| ()));
        if let Err(e) = restored {
            warn!(path = %self.path.display(), error = %e, "WAL rollback failed, poisoning writer");
            self.poisoned = true;
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop all entries (they are durable elsewhere). LSNs keep increasing.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.sync_all()?;
        self.len = 0;
        self.unsynced = 0;
        debug!(path = %self.path.display(), next_lsn = self.next_lsn, "WAL truncated");
        Ok(())
    }

    /// Get the LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Length of the log in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
