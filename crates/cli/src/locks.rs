//! Lock file management for daemon exclusivity
//!
//! sled refuses a second opener, so the lock exists to give a clear
//! "already running" message and a PID for `vigil stop` instead of a
//! database error.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Daemon lock file handle
pub struct DaemonLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Lock file content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockContent {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

impl DaemonLock {
    /// Acquire exclusive daemon lock
    ///
    /// Returns error if:
    /// - Lock is already held by a running process
    /// - Permission denied
    pub fn acquire(data_dir: &Path) -> Result<Self> {
        let lock_path = lock_file_path(data_dir);

        // Ensure locks directory exists
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create locks directory")?;
        }

        // Try to open/create lock file
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&lock_path)
            .context("Failed to open lock file")?;

        // Try to acquire exclusive lock (non-blocking)
        if !try_flock_exclusive(&file)? {
            // Lock held - check if stale
            if Self::is_stale_lock(&mut file)? {
                // Force remove stale lock and retry
                tracing::warn!("Removing stale daemon lock");
                drop(file);
                std::fs::remove_file(&lock_path)?;
                return Self::acquire(data_dir); // Retry
            } else {
                anyhow::bail!("Daemon already running (lock file held by active process)");
            }
        }

        // Write PID to lock file
        Self::write_lock_content(&mut file)?;

        Ok(Self {
            path: lock_path,
            file,
        })
    }

    /// Release the daemon lock
    pub fn release(self) -> Result<()> {
        // File lock is automatically released when file is dropped
        // But explicitly remove the file
        std::fs::remove_file(&self.path).context("Failed to remove lock file")?;
        Ok(())
    }

    /// Check if lock file represents a stale lock
    fn is_stale_lock(file: &mut File) -> Result<bool> {
        // Read lock content
        match Self::read_lock_content(file) {
            Ok(content) => {
                // Check if process is alive
                Ok(!is_process_alive(content.pid))
            }
            Err(_) => {
                // If we can't read lock content, assume it's stale
                Ok(true)
            }
        }
    }

    /// Write lock content (PID + timestamp)
    fn write_lock_content(file: &mut File) -> Result<()> {
        let content = LockContent {
            pid: std::process::id(),
            started_at: Utc::now(),
        };

        let serialized =
            serde_json::to_string(&content).context("Failed to serialize lock content")?;

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Read lock content from file
    fn read_lock_content(file: &mut File) -> Result<LockContent> {
        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let content: LockContent =
            serde_json::from_str(&contents).context("Failed to deserialize lock content")?;
        Ok(content)
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        // Ensure lock file is removed on drop
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Where the daemon lock lives inside a data directory
pub fn lock_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join("locks/daemon.lock")
}

/// Read the lock of a live daemon, if there is one
///
/// Returns `None` when no lock exists, the content is unreadable, or
/// the recorded process is gone.
pub fn read_daemon_lock(data_dir: &Path) -> Option<LockContent> {
    let contents = std::fs::read_to_string(lock_file_path(data_dir)).ok()?;
    let content: LockContent = serde_json::from_str(&contents).ok()?;
    if is_process_alive(content.pid) {
        Some(content)
    } else {
        None
    }
}

/// Try to acquire exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Check if process is alive
#[cfg(target_os = "macos")]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Null signal checks existence without delivering anything
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false, // No such process
        Err(_) => true,                         // Permission denied or other - assume alive
    }
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    // Check /proc/<pid> directory exists
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn is_process_alive(_pid: u32) -> bool {
    // Conservative: assume process is alive on unknown platforms
    true
}
