//! Database directory management.
//!
//! ```text
//! <path>/
//! ├─ LOCK          # Advisory lock, one process at a time
//! ├─ wal.log       # Write-ahead log
//! └─ sstables/     # SSTable files
//! ```
//!
//! Two guards keep a directory single-owner: an in-process registry of
//! canonical paths (so a second `open` in the same process fails fast even
//! on platforms where advisory locks are per-process), and an exclusive
//! `fs2` lock on `LOCK` for other processes.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use fs2::FileExt;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{KvError, Result};

const LOCK_FILE: &str = "LOCK";
const WAL_FILE: &str = "wal.log";
const SSTABLE_DIR: &str = "sstables";

/// Canonical paths of every directory currently open in this process
fn registry() -> &'static Mutex<HashSet<PathBuf>> {
    static OPEN_PATHS: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    OPEN_PATHS.get_or_init(|| Mutex::new(HashSet::new()))
}

/// An exclusively owned database directory.
///
/// Holding a `DataDir` means this handle owns the path: it is registered in
/// the process-wide registry and `LOCK` is held. Both are released on drop.
#[derive(Debug)]
pub struct DataDir {
    path: PathBuf,
    lock_file: Option<File>,
}

impl DataDir {
    /// Validate, optionally create, and lock a database directory.
    ///
    /// # Errors
    ///
    /// - `Path` if the directory is missing and `create_if_missing` is false,
    ///   if the path is not a directory, or if it cannot be created/accessed
    /// - `AlreadyOpen` if this process or another one already owns it
    /// - `Io` for other I/O failures (e.g. descriptor exhaustion)
    pub fn open(path: &Path, create_if_missing: bool) -> Result<Self> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(KvError::path(path, "not a directory")),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                if !create_if_missing {
                    return Err(KvError::path(
                        path,
                        "does not exist and create_if_missing is false",
                    ));
                }
                fs::create_dir_all(path)
                    .map_err(|e| KvError::path(path, format!("cannot create directory: {}", e)))?;
                debug!(path = %path.display(), "Created database directory");
            }
            Err(e) => return Err(KvError::path(path, format!("inaccessible: {}", e))),
        }

        let canonical = path
            .canonicalize()
            .map_err(|e| KvError::path(path, format!("cannot resolve path: {}", e)))?;

        if !registry().lock().insert(canonical.clone()) {
            return Err(KvError::AlreadyOpen {
                path: canonical,
                reason: "another handle in this process owns it".to_string(),
            });
        }

        // From here on, failures must unregister; `Drop` does that.
        let mut dir = Self {
            path: canonical,
            lock_file: None,
        };

        let lock_path = dir.path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| match e.kind() {
                IoErrorKind::PermissionDenied => {
                    KvError::path(&lock_path, format!("cannot open lock file: {}", e))
                }
                _ => KvError::Io(e),
            })?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(KvError::AlreadyOpen {
                path: dir.path.clone(),
                reason: "LOCK is held by another process".to_string(),
            });
        }
        dir.lock_file = Some(lock_file);

        Ok(dir)
    }

    /// Canonical path of the directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the write-ahead log
    pub fn wal_path(&self) -> PathBuf {
        self.path.join(WAL_FILE)
    }

    /// Directory holding SSTable files
    pub fn sstable_dir(&self) -> PathBuf {
        self.path.join(SSTABLE_DIR)
    }
}

impl Drop for DataDir {
    fn drop(&mut self) {
        if let Some(file) = self.lock_file.take() {
            if let Err(e) = FileExt::unlock(&file) {
                warn!(path = %self.path.display(), error = %e, "Failed to release LOCK");
            }
        }
        registry().lock().remove(&self.path);
    }
}
