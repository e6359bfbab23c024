//! Open-file limit helper
//!
//! A process with many SSTables can run out of file descriptors long before
//! it runs out of anything else. [`raise_fd_limit`] lifts the soft
//! `RLIMIT_NOFILE` up to the hard limit. Nothing calls it implicitly; the
//! CLI calls it at startup unless `--skip-rlimit` is given.

/// Soft and hard `RLIMIT_NOFILE` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NofileLimit {
    pub soft: u64,
    pub hard: u64,
}

/// Raise the soft open-file limit to the hard limit.
///
/// Returns the limits in effect afterwards, or `None` on platforms without
/// rlimits. Calling it again is a no-op.
#[cfg(unix)]
pub fn raise_fd_limit() -> std::io::Result<Option<NofileLimit>> {
    use std::io;
    use tracing::debug;

    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    // SAFETY: `limit` is a valid, exclusively borrowed rlimit struct.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } != 0 {
        return Err(io::Error::last_os_error());
    }

    if limit.rlim_cur < limit.rlim_max {
        let previous = limit.rlim_cur;
        limit.rlim_cur = limit.rlim_max;
        // SAFETY: `limit` is a valid rlimit struct with soft <= hard.
        if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &limit) } != 0 {
            return Err(io::Error::last_os_error());
        }
        debug!(from = previous as u64, to = limit.rlim_cur as u64, "Raised open-file limit");
    }

    Ok(Some(NofileLimit {
        soft: limit.rlim_cur as u64,
        hard: limit.rlim_max as u64,
    }))
}

/// Raise the soft open-file limit to the hard limit.
///
/// Rlimits do not exist on this platform; always `Ok(None)`.
#[cfg(not(unix))]
pub fn raise_fd_limit() -> std::io::Result<Option<NofileLimit>> {
    Ok(None)
}
