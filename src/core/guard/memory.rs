/*!
 * Memory Guards
 *
 * RAII guards for accounted memory blocks with automatic cleanup
 */

use super::traits::{Guard, GuardDrop};
use super::{GuardError, GuardMetadata, GuardResult};
use crate::core::types::{Address, Size};
use crate::memory::{Allocation, AllocatorFamily, MemoryManager, MemoryResult};

/// Scoped memory guard with automatic deallocation
///
/// # Example
///
/// ```ignore
/// let mut guard = memory_manager.allocate_guard(1024, AllocatorFamily::Array, "buffer")?;
/// guard.bytes_mut()?.fill(7);
/// // Automatically freed on drop
/// ```
pub struct MemoryGuard {
    allocation: Option<Allocation>,
    address: Address,
    size: Size,
    family: AllocatorFamily,
    manager: MemoryManager,
    metadata: GuardMetadata,
}

impl MemoryGuard {
    /// Wrap an allocation obtained from `manager`
    pub fn new(allocation: Allocation, manager: MemoryManager) -> Self {
        let address = allocation.address();
        let size = allocation.len();
        let family = allocation.family();

        Self {
            allocation: Some(allocation),
            address,
            size,
            family,
            manager,
            metadata: GuardMetadata::new("memory").with_size(size),
        }
    }

    /// Get memory address
    #[inline]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get allocation size
    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Allocator family the block came from
    #[inline]
    pub fn family(&self) -> AllocatorFamily {
        self.family
    }

    /// The manager that owns the accounting for this block
    #[inline]
    pub fn manager(&self) -> &MemoryManager {
        &self.manager
    }

    /// Read access to the guarded bytes
    pub fn bytes(&self) -> GuardResult<&[u8]> {
        self.allocation
            .as_ref()
            .map(Allocation::as_slice)
            .ok_or(GuardError::AlreadyReleased)
    }

    /// Write access to the guarded bytes
    pub fn bytes_mut(&mut self) -> GuardResult<&mut [u8]> {
        self.allocation
            .as_mut()
            .map(Allocation::as_mut_slice)
            .ok_or(GuardError::AlreadyReleased)
    }

    /// Manually release without waiting for Drop
    pub fn release_early(mut self) -> GuardResult<()> {
        self.release()
    }
}

impl Guard for MemoryGuard {
    fn resource_type(&self) -> &'static str {
        "memory"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.allocation.is_some()
    }

    fn release(&mut self) -> GuardResult<()> {
        let allocation = self.allocation.take().ok_or(GuardError::AlreadyReleased)?;

        self.manager
            .deallocate(allocation)
            .map_err(|e| GuardError::OperationFailed(e.to_string()))?;

        log::trace!(
            "Memory guard released {} bytes at 0x{:x} after {}us",
            self.size,
            self.address,
            self.metadata.lifetime_micros()
        );
        Ok(())
    }
}

impl GuardDrop for MemoryGuard {
    fn on_drop(&mut self) {
        if self.is_active() {
            if let Err(e) = self.release() {
                log::error!(
                    "Memory guard drop failed for address 0x{:x} ({} bytes): {}",
                    self.address,
                    self.size,
                    e
                );
            }
        }
    }
}

impl Drop for MemoryGuard {
    #[inline]
    fn drop(&mut self) {
        self.on_drop();
    }
}

impl std::fmt::Debug for MemoryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGuard")
            .field("address", &self.address)
            .field("size", &self.size)
            .field("family", &self.family)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Extension trait for MemoryManager to create guards
pub trait MemoryGuardExt {
    /// Allocate memory with a guard
    fn allocate_guard(
        &self,
        size: Size,
        family: AllocatorFamily,
        label: &'static str,
    ) -> MemoryResult<MemoryGuard>;
}

impl MemoryGuardExt for MemoryManager {
    fn allocate_guard(
        &self,
        size: Size,
        family: AllocatorFamily,
        label: &'static str,
    ) -> MemoryResult<MemoryGuard> {
        let allocation = self.allocate(size, family, label)?;
        Ok(MemoryGuard::new(allocation, self.clone()))
    }
}
