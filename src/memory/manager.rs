/*!
 * Memory Manager
 *
 * Accounted allocation across two allocator families.
 *
 * Every block handed out is recorded by address so that tests and the
 * binary can verify that all memory was returned. Capacity is reserved
 * with a CAS loop before the real allocation happens, so concurrent callers
 * can never over-commit the pool.
 */

use super::types::{AllocatorFamily, MemoryBlock, MemoryError, MemoryResult, MemoryStats};
use crate::core::limits::DEFAULT_MEMORY_POOL;
use crate::core::types::{Address, Size};
use ahash::RandomState;
use dashmap::DashMap;
use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Raw region obtained from `std::alloc`
///
/// Owns its bytes exclusively; freed with the same layout it was created with.
struct RawRegion {
    ptr: NonNull<u8>,
    layout: Layout,
}

// SAFETY: the region is uniquely owned and never aliased; access goes
// through &self / &mut self borrows of the owning Allocation.
unsafe impl Send for RawRegion {}
unsafe impl Sync for RawRegion {}

impl RawRegion {
    fn zeroed(size: Size) -> MemoryResult<Self> {
        let layout = Layout::array::<u8>(size).map_err(|e| MemoryError::LayoutError {
            size,
            reason: e.to_string(),
        })?;

        // SAFETY: layout has non-zero size (zero sizes are rejected by the manager)
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(MemoryError::AllocatorRefused(size))?;

        Ok(Self { ptr, layout })
    }

    fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for layout.size() initialized (zeroed) bytes
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: unique borrow of an exclusively owned region
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for RawRegion {
    fn drop(&mut self) {
        // SAFETY: ptr came from alloc_zeroed with this exact layout
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

enum Storage {
    Array(Box<[u8]>),
    Raw(RawRegion),
}

/// An owned, accounted block of memory
///
/// Not `Clone`: the only way to get a second block with the same bytes is to
/// allocate one through the manager.
pub struct Allocation {
    address: Address,
    family: AllocatorFamily,
    storage: Storage,
}

impl Allocation {
    #[inline]
    pub fn address(&self) -> Address {
        self.address
    }

    #[inline]
    pub fn family(&self) -> AllocatorFamily {
        self.family
    }

    #[inline]
    pub fn len(&self) -> Size {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.storage {
            Storage::Array(bytes) => &bytes[..],
            Storage::Raw(region) => region.as_slice(),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.storage {
            Storage::Array(bytes) => &mut bytes[..],
            Storage::Raw(region) => region.as_mut_slice(),
        }
    }
}

impl std::fmt::Debug for Allocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Allocation")
            .field("address", &self.address)
            .field("family", &self.family)
            .field("len", &self.len())
            .finish()
    }
}

/// Memory manager
///
/// Cheap to clone; all clones share the same pool and accounting.
#[derive(Clone)]
pub struct MemoryManager {
    blocks: Arc<DashMap<Address, MemoryBlock, RandomState>>,
    next_address: Arc<AtomicUsize>,
    total_memory: Size,
    used_memory: Arc<AtomicUsize>,
    total_allocations: Arc<AtomicU64>,
    total_deallocations: Arc<AtomicU64>,
}

impl MemoryManager {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_POOL)
    }

    /// Create memory manager with custom capacity (useful for testing)
    pub fn with_capacity(total: Size) -> Self {
        debug!(total_bytes = total, "memory manager initialized");
        Self {
            blocks: Arc::new(DashMap::with_hasher(RandomState::new())),
            // Start above zero so a zero address is never handed out
            next_address: Arc::new(AtomicUsize::new(0x1000)),
            total_memory: total,
            used_memory: Arc::new(AtomicUsize::new(0)),
            total_allocations: Arc::new(AtomicU64::new(0)),
            total_deallocations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Allocate a zero-initialized block from the given family
    pub fn allocate(
        &self,
        size: Size,
        family: AllocatorFamily,
        label: &'static str,
    ) -> MemoryResult<Allocation> {
        if size == 0 {
            return Err(MemoryError::ZeroSized);
        }

        self.reserve(size)?;

        let storage = match Self::obtain(size, family) {
            Ok(storage) => storage,
            Err(e) => {
                self.used_memory.fetch_sub(size, Ordering::AcqRel);
                warn!(size, %family, error = %e, "allocation failed after reservation");
                return Err(e);
            }
        };

        let address = self.next_address.fetch_add(size, Ordering::Relaxed);
        self.blocks.insert(
            address,
            MemoryBlock {
                address,
                size,
                family,
                label,
            },
        );
        self.total_allocations.fetch_add(1, Ordering::Relaxed);

        debug!(address, size, %family, label, "allocated block");
        Ok(Allocation {
            address,
            family,
            storage,
        })
    }

    /// Return a block to the pool
    ///
    /// Takes the allocation by value, so a block can only be released once.
    pub fn deallocate(&self, allocation: Allocation) -> MemoryResult<()> {
        let (_, block) = self
            .blocks
            .remove(&allocation.address)
            .ok_or(MemoryError::InvalidAddress(allocation.address))?;

        debug_assert_eq!(block.family, allocation.family);
        drop(allocation);

        self.used_memory.fetch_sub(block.size, Ordering::AcqRel);
        self.total_deallocations.fetch_add(1, Ordering::Relaxed);

        debug!(
            address = block.address,
            size = block.size,
            family = %block.family,
            label = block.label,
            "deallocated block"
        );
        Ok(())
    }

    /// Returns (total, used, available)
    pub fn info(&self) -> (Size, Size, Size) {
        let used = self.used_memory.load(Ordering::Acquire);
        (self.total_memory, used, self.total_memory.saturating_sub(used))
    }

    #[inline]
    pub fn used_memory(&self) -> Size {
        self.used_memory.load(Ordering::Acquire)
    }

    #[inline]
    pub fn live_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Check whether an address belongs to a live block
    pub fn is_valid(&self, address: Address) -> bool {
        self.blocks.contains_key(&address)
    }

    /// Number of live blocks from one family
    pub fn live_blocks_in(&self, family: AllocatorFamily) -> usize {
        self.blocks
            .iter()
            .filter(|entry| entry.value().family == family)
            .count()
    }

    pub fn stats(&self) -> MemoryStats {
        let (total, used, available) = self.info();
        MemoryStats {
            total_memory: total,
            used_memory: used,
            available_memory: available,
            live_blocks: self.live_blocks(),
            array_blocks: self.live_blocks_in(AllocatorFamily::Array),
            raw_blocks: self.live_blocks_in(AllocatorFamily::Raw),
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
            total_deallocations: self.total_deallocations.load(Ordering::Relaxed),
        }
    }

    fn reserve(&self, size: Size) -> MemoryResult<()> {
        let total = self.total_memory;
        self.used_memory
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(size).filter(|&next| next <= total)
            })
            .map(|_| ())
            .map_err(|used| MemoryError::OutOfMemory {
                requested: size,
                available: total.saturating_sub(used),
                used,
                total,
            })
    }

    fn obtain(size: Size, family: AllocatorFamily) -> MemoryResult<Storage> {
        match family {
            AllocatorFamily::Array => {
                let mut bytes = Vec::new();
                bytes
                    .try_reserve_exact(size)
                    .map_err(|_| MemoryError::AllocatorRefused(size))?;
                bytes.resize(size, 0);
                Ok(Storage::Array(bytes.into_boxed_slice()))
            }
            AllocatorFamily::Raw => RawRegion::zeroed(size).map(Storage::Raw),
        }
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new()
    }
}
