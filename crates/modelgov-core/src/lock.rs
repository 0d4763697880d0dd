//! Advisory lock for the evaluate/rollback critical section
//!
//! Two concurrent invocations interleaving between "copy active to previous"
//! and "copy candidate to active" could corrupt the previous-active lineage,
//! so mutating operations hold an exclusive POSIX `flock` on a lock file in
//! the models directory for their whole critical section. The serving
//! collaborator never takes this lock; it only ever reads the active
//! manifest, which each write replaces atomically.

use crate::error::Result;
use std::fs::OpenOptions;
use std::path::Path;

/// Exclusive advisory lock, released on drop
#[derive(Debug)]
pub struct GovernanceLock {
    #[allow(dead_code)] // held for the flock lifetime
    file: std::fs::File,
}

impl GovernanceLock {
    /// Block until the exclusive lock is acquired.
    #[cfg(unix)]
    pub fn acquire(path: &Path) -> Result<Self> {
        use std::os::unix::io::AsRawFd;

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(Self { file })
    }

    /// Non-Unix builds carry no lock; single-flight scheduling is the
    /// deployment constraint there.
    #[cfg(not(unix))]
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        Ok(Self { file })
    }
}

#[cfg(unix)]
impl Drop for GovernanceLock {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;
        // Explicit unlock; closing the fd would release it anyway.
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_acquire_release_reacquire() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".governance.lock");

        let lock = GovernanceLock::acquire(&path).unwrap();
        drop(lock);
        let _lock = GovernanceLock::acquire(&path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_exclusive_within_process_via_trylock() {
        use std::os::unix::io::AsRawFd;

        let dir = tempdir().unwrap();
        let path = dir.path().join(".governance.lock");
        let _held = GovernanceLock::acquire(&path).unwrap();

        // flock is per open-file-description, so a second descriptor in the
        // same process still contends.
        let probe = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .unwrap();
        let rc = unsafe { libc::flock(probe.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        assert_eq!(rc, -1, "second descriptor should not acquire while held");
    }
}
