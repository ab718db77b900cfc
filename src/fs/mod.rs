/*!
 * File Manager
 *
 * Opens write targets on the local filesystem and keeps a table of live
 * handles, so that every open can be matched against a close.
 */

use crate::core::errors::ResourceError;
use crate::core::guard::FdGuard;
use crate::core::types::{Fd, ResourceResult};
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// First descriptor number handed out (0-2 are left to stdio)
const FIRST_FD: Fd = 3;

/// How a write target is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Create or truncate
    #[default]
    Truncate,
    /// Create or append
    Append,
}

/// Handle table statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HandleStats {
    pub open_handles: usize,
    pub total_opened: u64,
    pub total_closed: u64,
}

impl HandleStats {
    /// True when every opened handle has been closed
    pub fn is_balanced(&self) -> bool {
        self.open_handles == 0 && self.total_opened == self.total_closed
    }
}

/// File manager
///
/// Cheap to clone; all clones share the same handle table.
#[derive(Clone)]
pub struct FileManager {
    open: Arc<DashMap<Fd, PathBuf, RandomState>>,
    next_fd: Arc<AtomicU32>,
    total_opened: Arc<AtomicU64>,
    total_closed: Arc<AtomicU64>,
}

impl FileManager {
    pub fn new() -> Self {
        Self {
            open: Arc::new(DashMap::with_hasher(RandomState::new())),
            next_fd: Arc::new(AtomicU32::new(FIRST_FD)),
            total_opened: Arc::new(AtomicU64::new(0)),
            total_closed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open `path` for writing and return an owning guard
    pub fn open(&self, path: impl AsRef<Path>, mode: OpenMode) -> ResourceResult<FdGuard> {
        let path = path.as_ref().to_path_buf();

        let mut options = OpenOptions::new();
        options.write(true).create(true);
        match mode {
            OpenMode::Truncate => options.truncate(true),
            OpenMode::Append => options.append(true),
        };

        let file = options
            .open(&path)
            .map_err(|e| ResourceError::io(path.display().to_string(), e))?;

        let fd = self.next_fd.fetch_add(1, Ordering::Relaxed);
        self.open.insert(fd, path.clone());
        self.total_opened.fetch_add(1, Ordering::Relaxed);
        debug!(fd, path = %path.display(), ?mode, "opened write target");

        let open = Arc::clone(&self.open);
        let closed = Arc::clone(&self.total_closed);
        Ok(FdGuard::new(fd, path, file, move |fd, path| {
            if open.remove(&fd).is_some() {
                closed.fetch_add(1, Ordering::Relaxed);
                debug!(fd, path = %path.display(), "closed write target");
            }
        }))
    }

    /// Number of handles currently open
    #[inline]
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Check whether a descriptor is still open
    pub fn is_open(&self, fd: Fd) -> bool {
        self.open.contains_key(&fd)
    }

    pub fn stats(&self) -> HandleStats {
        HandleStats {
            open_handles: self.open_count(),
            total_opened: self.total_opened.load(Ordering::Relaxed),
            total_closed: self.total_closed.load(Ordering::Relaxed),
        }
    }
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new()
    }
}
