/*!
 * RAII Resource Guards
 *
 * Owning handles with automatic cleanup.
 *
 * ## Guard Types
 *
 * - **MemoryGuard**: Accounted memory block, returned to its manager on drop
 * - **FdGuard**: Open file, flushed and closed on drop
 *
 * ## Example
 *
 * ```ignore
 * let guard = memory_manager.allocate_guard(1024, AllocatorFamily::Array, "buffer")?;
 * // Use memory
 * // Automatically freed on drop
 * ```
 */

mod fd;
mod memory;
mod traits;

pub use fd::FdGuard;
pub use memory::{MemoryGuard, MemoryGuardExt};
pub use traits::{release_all, Guard, GuardDrop};

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("Resource already released")]
    AlreadyReleased,

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
    pub size_bytes: usize,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
            size_bytes: 0,
        }
    }

    #[inline]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size_bytes = size;
        self
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}
