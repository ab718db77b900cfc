/*!
 * File Descriptor Guards
 *
 * RAII guards for open files with automatic close
 */

use super::traits::{Guard, GuardDrop};
use super::{GuardError, GuardMetadata, GuardResult};
use crate::core::types::Fd;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

type CloseFn = Box<dyn Fn(Fd, &Path) + Send + Sync>;

/// Open file guard with automatic close
///
/// # Example
///
/// ```ignore
/// let mut fd_guard = file_manager.open(path, OpenMode::Truncate)?;
/// fd_guard.file_mut()?.write_all(b"data")?;
/// // Flushed and closed on drop
/// ```
pub struct FdGuard {
    fd: Fd,
    path: PathBuf,
    file: Option<File>,
    close_fn: CloseFn,
    metadata: GuardMetadata,
}

impl FdGuard {
    /// Create a new file guard
    ///
    /// `close_fn` runs exactly once, after the file has been closed.
    pub fn new<F>(fd: Fd, path: PathBuf, file: File, close_fn: F) -> Self
    where
        F: Fn(Fd, &Path) + Send + Sync + 'static,
    {
        Self {
            fd,
            path,
            file: Some(file),
            close_fn: Box::new(close_fn),
            metadata: GuardMetadata::new("fd"),
        }
    }

    /// Get the file descriptor
    #[inline]
    pub fn fd(&self) -> Fd {
        self.fd
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the open file for writing
    pub fn file_mut(&mut self) -> GuardResult<&mut File> {
        self.file.as_mut().ok_or(GuardError::AlreadyReleased)
    }

    /// Manually close the file early
    pub fn close_early(mut self) -> GuardResult<()> {
        self.release()
    }
}

impl Guard for FdGuard {
    fn resource_type(&self) -> &'static str {
        "fd"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.file.is_some()
    }

    fn release(&mut self) -> GuardResult<()> {
        let mut file = self.file.take().ok_or(GuardError::AlreadyReleased)?;

        let flushed = file.flush();
        drop(file);
        (self.close_fn)(self.fd, &self.path);

        log::trace!(
            "FD guard closed fd {} ({}) after {}us",
            self.fd,
            self.path.display(),
            self.metadata.lifetime_micros()
        );

        flushed.map_err(|e| GuardError::OperationFailed(format!("flush {}: {}", self.path.display(), e)))
    }
}

impl GuardDrop for FdGuard {
    fn on_drop(&mut self) {
        if self.is_active() {
            if let Err(e) = self.release() {
                log::error!("FD guard drop failed for fd {}: {}", self.fd, e);
            }
        }
    }
}

impl Drop for FdGuard {
    fn drop(&mut self) {
        self.on_drop();
    }
}

impl std::fmt::Debug for FdGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FdGuard")
            .field("fd", &self.fd)
            .field("path", &self.path)
            .field("active", &self.is_active())
            .finish()
    }
}
