//! Session locking for concurrent safety.
//!
//! Uses advisory file locks (`flock(2)` on Unix) via the `fs2` crate.
//! The OS automatically releases locks when a process crashes, so no
//! PID tracking or stale lock detection is needed.
//!
//! A planting session takes this lock around each add-evidence sequence:
//! two sessions against the same local clone would otherwise race on a
//! category index file and on the git index.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{PlantError, PlantResult};

/// Name of the lock file, kept inside the clone's git directory.
const LOCK_FILE: &str = "plant.lock";

/// An exclusive lock over one local locker clone.
///
/// Held for the lifetime of the value. When dropped, the lock is
/// released automatically (both the `flock` and the `File` handle).
pub struct SessionLock {
    _file: File,
}

impl SessionLock {
    /// Acquire an exclusive lock in the given directory.
    ///
    /// Polls with a short sleep interval until the lock is acquired or
    /// the timeout expires. Returns `PlantError::LockTimeout` on failure.
    pub fn acquire(dir: &Path, timeout: Duration) -> PlantResult<Self> {
        let lock_path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;

        let start = Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(SessionLock { _file: file }),
                Err(_) if start.elapsed() >= timeout => {
                    return Err(PlantError::LockTimeout);
                }
                Err(_) => std::thread::sleep(poll_interval),
            }
        }
    }
}
